//! Spectral estimation.
//!
//! - [`welch`]: Welch PSD per epoch and channel, matching
//!   `scipy.signal.welch` with a Hann window and 50 % overlap.
//! - [`fourier`]: phase-preserving per-epoch spectra for the connectivity
//!   estimators.
//! - [`window`]: taper windows.

pub mod fourier;
pub mod welch;
pub mod window;

pub use fourier::{epoch_spectra, EpochSpectra};
pub use welch::{rfft_freqs, welch_1d, welch_epochs, WelchPsd};
pub use window::{hann, power_sum};
