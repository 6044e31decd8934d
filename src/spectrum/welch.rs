//! Welch power spectral density, per epoch and channel.
//!
//! Matches `scipy.signal.welch(x, fs, window='hann', nperseg=n,
//! noverlap=n // 2, detrend='constant', scaling='density')`:
//!
//!   1. Cut the epoch into segments of `n_per_seg` samples, hop
//!      `n_per_seg − n_overlap`; trailing samples that do not fill a segment
//!      are ignored.
//!   2. Remove each segment's mean, multiply by the Hann window.
//!   3. `P[k] = |FFT(seg)[k]|² / (sfreq · Σw²)` for `k = 0..=n/2`.
//!   4. One-sided: double every bin except DC and (for even `n`) Nyquist.
//!   5. Average the segment periodograms.
//!
//! Epochs are never concatenated: each epoch gets its own PSD, and the
//! caller decides how to combine them (the band-power path averages them).
use std::sync::Arc;

use ndarray::{s, Array1, Array3, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::window::{hann, power_sum};
use crate::error::{invalid, Result};

/// Output of [`welch_epochs`].
#[derive(Debug, Clone)]
pub struct WelchPsd {
    /// Frequency of each bin in Hz, length `n_per_seg / 2 + 1`.
    pub freqs: Vec<f64>,
    /// `[E, C, F]` power spectral density.
    pub psd: Array3<f64>,
}

impl WelchPsd {
    /// Mean over epochs → `[C, F]`.
    pub fn epoch_mean(&self) -> ndarray::Array2<f64> {
        // E ≥ 1 is guaranteed by `welch_epochs`, so `mean_axis` is `Some`.
        self.psd
            .mean_axis(ndarray::Axis(0))
            .unwrap_or_else(|| ndarray::Array2::zeros((self.psd.dim().1, self.psd.dim().2)))
    }
}

/// Frequencies of a one-sided `n`-point spectrum: `k · sfreq / n`, `k = 0..=n/2`.
pub fn rfft_freqs(n: usize, sfreq: f64) -> Vec<f64> {
    (0..=n / 2).map(|k| k as f64 * sfreq / n as f64).collect()
}

/// Welch PSD of every epoch and channel of `data` (`[E, C, T]`).
///
/// # Errors
///
/// * `n_per_seg == 0`, or longer than an epoch;
/// * `n_overlap >= n_per_seg`;
/// * `data` has no epochs or channels.
pub fn welch_epochs(
    data: &Array3<f64>,
    sfreq: f64,
    n_per_seg: usize,
    n_overlap: usize,
) -> Result<WelchPsd> {
    let (n_e, n_c, n_t) = data.dim();
    if n_e == 0 || n_c == 0 {
        return invalid(format!("welch: empty input [E={n_e}, C={n_c}]"));
    }
    if n_per_seg == 0 {
        return invalid("welch: window length is zero samples");
    }
    if n_per_seg > n_t {
        return invalid(format!(
            "welch: window of {n_per_seg} samples exceeds the epoch length of {n_t} samples"
        ));
    }
    if n_overlap >= n_per_seg {
        return invalid(format!("welch: overlap {n_overlap} >= window {n_per_seg}"));
    }

    let freqs = rfft_freqs(n_per_seg, sfreq);
    let n_f = freqs.len();
    let win = hann(n_per_seg);
    let scale = 1.0 / (sfreq * power_sum(&win));
    let step = n_per_seg - n_overlap;

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_per_seg);

    let mut psd = Array3::<f64>::zeros((n_e, n_c, n_f));
    for e in 0..n_e {
        for c in 0..n_c {
            let p = welch_1d(data.slice(s![e, c, ..]), &win, step, scale, &fft);
            psd.slice_mut(s![e, c, ..]).assign(&p);
        }
    }

    Ok(WelchPsd { freqs, psd })
}

/// Welch PSD of one signal with a pre-built window and FFT plan.
///
/// `x.len() >= win.len()` is the caller's responsibility.
pub fn welch_1d(
    x: ArrayView1<'_, f64>,
    win: &[f64],
    step: usize,
    scale: f64,
    fft: &Arc<dyn Fft<f64>>,
) -> Array1<f64> {
    let n = win.len();
    let n_f = n / 2 + 1;
    let n_seg = (x.len() - n) / step + 1;

    let mut acc = Array1::<f64>::zeros(n_f);
    let mut buf = vec![Complex::<f64>::default(); n];

    for seg in 0..n_seg {
        let start = seg * step;
        let chunk = x.slice(s![start..start + n]);
        let mean = chunk.sum() / n as f64;

        for ((b, &v), &w) in buf.iter_mut().zip(chunk.iter()).zip(win) {
            *b = Complex { re: (v - mean) * w, im: 0.0 };
        }
        fft.process(&mut buf);

        for (a, b) in acc.iter_mut().zip(&buf[..n_f]) {
            *a += b.norm_sqr();
        }
    }

    acc *= scale / n_seg as f64;

    // One-sided spectrum: DC and (even n) Nyquist appear once.
    let last = if n % 2 == 0 { n_f - 1 } else { n_f };
    acc.slice_mut(s![1..last]).mapv_inplace(|v| v * 2.0);
    acc
}
