//! Taper windows.
use std::f64::consts::PI;

/// Periodic Hann window of length `n`.
///
/// Matches `scipy.signal.get_window('hann', n)` (`fftbins=True`), the window
/// `scipy.signal.welch` uses by default:
///
/// ```text
/// w[i] = 0.5 − 0.5 · cos(2π i / n)
/// ```
///
/// A length-1 window is `[1.0]`, as in SciPy.
pub fn hann(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Sum of squared window coefficients (`Σ w²`), the PSD density normaliser.
pub fn power_sum(w: &[f64]) -> f64 {
    w.iter().map(|v| v * v).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_periodic() {
        let w = hann(8);
        approx::assert_abs_diff_eq!(w[0], 0.0);
        approx::assert_abs_diff_eq!(w[4], 1.0, epsilon = 1e-12);
        // Periodic: w[i] == w[n - i] for 0 < i < n.
        for i in 1..8 {
            approx::assert_abs_diff_eq!(w[i], w[8 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn hann_power_sum_is_three_eighths_n() {
        // Σ w² = 3n/8 for the periodic Hann window.
        let w = hann(256);
        approx::assert_abs_diff_eq!(power_sum(&w), 96.0, epsilon = 1e-9);
    }

    #[test]
    fn length_one_window_is_unit() {
        assert_eq!(hann(1), vec![1.0]);
        assert!(hann(0).is_empty());
    }
}
