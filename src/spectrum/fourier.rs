//! Per-epoch complex spectra for cross-spectral estimators.
//!
//! Each epoch of each channel is demeaned, Hann-tapered and transformed over
//! its full length.  The result keeps the phase, so the connectivity
//! estimators can form `X_i · conj(X_j)` per epoch.  Only the one-sided half
//! (`k = 0..=T/2`) is kept.
//!
//! Amplitude scaling is irrelevant here: every estimator in
//! [`crate::connectivity`] is invariant to a common scale factor.
use ndarray::{s, Array3};
use rustfft::{num_complex::Complex, FftPlanner};

use super::welch::rfft_freqs;
use super::window::hann;
use crate::error::{invalid, Result};

/// Complex spectra `[E, C, F]` plus the frequency of each bin.
#[derive(Debug, Clone)]
pub struct EpochSpectra {
    pub freqs: Vec<f64>,
    pub coefs: Array3<Complex<f64>>,
}

/// Tapered FFT of every epoch and channel of `data` (`[E, C, T]`).
pub fn epoch_spectra(data: &Array3<f64>, sfreq: f64) -> Result<EpochSpectra> {
    let (n_e, n_c, n_t) = data.dim();
    if n_e == 0 || n_c == 0 || n_t == 0 {
        return invalid(format!("fourier: empty input [E={n_e}, C={n_c}, T={n_t}]"));
    }

    let freqs = rfft_freqs(n_t, sfreq);
    let n_f = freqs.len();
    let win = hann(n_t);

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_t);

    let mut coefs = Array3::<Complex<f64>>::zeros((n_e, n_c, n_f));
    let mut buf = vec![Complex::<f64>::default(); n_t];

    for e in 0..n_e {
        for c in 0..n_c {
            let x = data.slice(s![e, c, ..]);
            let mean = x.sum() / n_t as f64;
            for ((b, &v), &w) in buf.iter_mut().zip(x.iter()).zip(&win) {
                *b = Complex { re: (v - mean) * w, im: 0.0 };
            }
            fft.process(&mut buf);
            for (k, z) in buf[..n_f].iter().enumerate() {
                coefs[[e, c, k]] = *z;
            }
        }
    }

    Ok(EpochSpectra { freqs, coefs })
}
