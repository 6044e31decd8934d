//! Pairwise functional connectivity across epochs.
//!
//! ```text
//! [E, C, T] signal
//!   │
//!   ├─ epoch_spectra()       Hann-tapered FFT per epoch → X[e, c, f]
//!   ├─ per method, per ordered pair (i, j), per bin in some band:
//!   │      estimate over epochs from X[·, i, f] · conj(X[·, j, f])
//!   ├─ mean over each band's bins (low < f <= high)
//!   ├─ ConnMatrix::validate  pair symmetry + self-pair value
//!   └─→ EdgeRow              N × N rows per method, chan1 outer
//! ```
//!
//! Each epoch is one observation; nothing is estimated across time within an
//! epoch.  A failing method is reported as a [`MethodFailure`] and the other
//! methods still run.
pub mod matrix;
pub mod method;

pub use matrix::{enumerate_pairs, ConnMatrix};
pub use method::{ConnMethod, PairSymmetry};

use log::{debug, warn};
use ndarray::s;

use crate::bands::BandSet;
use crate::error::{invalid, PipelineError, Result};
use crate::recording::Recording;
use crate::spectrum::{epoch_spectra, EpochSpectra};

/// One row of the connectivity edge table; `values` follow band order.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    pub eegid: String,
    pub method: ConnMethod,
    pub chan1: String,
    pub chan2: String,
    pub values: Vec<f64>,
}

/// A (subject, method) estimate that did not produce rows.
#[derive(Debug)]
pub struct MethodFailure {
    pub eegid: String,
    pub method: ConnMethod,
    pub error: PipelineError,
}

/// Rows of the methods that succeeded plus the failures of the rest.
#[derive(Debug, Default)]
pub struct ConnectivityOutcome {
    pub rows: Vec<EdgeRow>,
    pub failures: Vec<MethodFailure>,
}

/// Compute the edge table of `rec` for every method in `methods`.
///
/// # Errors
///
/// Subject-level problems that would fail every method: an empty method
/// list or band set, or a band with no FFT bin at the epoch's frequency
/// resolution.  Per-method problems go to [`ConnectivityOutcome::failures`].
pub fn connectivity(rec: &Recording, methods: &[ConnMethod], bands: &BandSet) -> Result<ConnectivityOutcome> {
    if methods.is_empty() {
        return invalid("no connectivity methods requested");
    }
    if bands.is_empty() {
        return invalid("band definition is empty");
    }

    let spectra = epoch_spectra(rec.data(), rec.sfreq())?;
    let bins = bands.bins_per_band(&spectra.freqs);
    if let Some((band, _)) = bands.iter().zip(&bins).find(|(_, b)| b.is_empty()) {
        return invalid(format!(
            "{}: band '{}' ({}, {}] contains no frequency bin at {:.4} Hz resolution",
            rec.eegid(),
            band.name,
            band.low,
            band.high,
            rec.sfreq() / rec.n_times() as f64
        ));
    }
    let active = active_epochs(&spectra, &bins);

    let n = rec.n_channels();
    let mut out = ConnectivityOutcome {
        rows: Vec::with_capacity(methods.len() * n * n),
        failures: Vec::new(),
    };

    for &method in methods {
        let result = method_matrix(rec, &spectra, &bins, method)
            .and_then(|m| m.validate(&active).map(|_| m));
        match result {
            Ok(m) => {
                debug!("{}: {method} [{n}×{n}×{}] ok", rec.eegid(), bands.len());
                out.rows.extend(edge_rows(rec, &m));
            }
            Err(error) => {
                warn!("{}: {method} failed: {error}", rec.eegid());
                out.failures.push(MethodFailure { eegid: rec.eegid().to_string(), method, error });
            }
        }
    }

    Ok(out)
}

/// Band-averaged matrix of one method.
pub fn method_matrix(
    rec: &Recording,
    spectra: &EpochSpectra,
    bins: &[Vec<usize>],
    method: ConnMethod,
) -> Result<ConnMatrix> {
    let n_epochs = spectra.coefs.dim().0;
    if n_epochs < method.min_epochs() {
        return Err(PipelineError::Estimator {
            eegid: rec.eegid().to_string(),
            method: method.name().to_string(),
            reason: format!("needs at least {} epochs, got {n_epochs}", method.min_epochs()),
        });
    }

    ConnMatrix::build(method, rec.n_channels(), bins.len(), |i, j| {
        let mut vals = Vec::with_capacity(bins.len());
        for band_bins in bins {
            let sum: f64 = band_bins
                .iter()
                .map(|&k| {
                    method.estimate(
                        spectra.coefs.slice(s![.., i, k]),
                        spectra.coefs.slice(s![.., j, k]),
                    )
                })
                .sum();
            let v = sum / band_bins.len() as f64;
            if !v.is_finite() {
                return Err(PipelineError::Estimator {
                    eegid: rec.eegid().to_string(),
                    method: method.name().to_string(),
                    reason: format!(
                        "non-finite value for pair ({}, {})",
                        rec.ch_names()[i],
                        rec.ch_names()[j]
                    ),
                });
            }
            vals.push(v);
        }
        Ok(vals)
    })
}

/// Long-format rows of a validated matrix, in enumeration order.
pub fn edge_rows(rec: &Recording, m: &ConnMatrix) -> Vec<EdgeRow> {
    let names = rec.ch_names();
    enumerate_pairs(m.n_channels())
        .enumerate()
        .map(|(idx, (i, j))| EdgeRow {
            eegid: rec.eegid().to_string(),
            method: m.method,
            chan1: names[i].clone(),
            chan2: names[j].clone(),
            values: m.pair_values(idx).to_vec(),
        })
        .collect()
}

/// Per channel, the fewest epochs with a non-zero coefficient at any band
/// bin.  0 marks a silent channel.
fn active_epochs(spectra: &EpochSpectra, bins: &[Vec<usize>]) -> Vec<usize> {
    let n_c = spectra.coefs.dim().1;
    (0..n_c)
        .map(|c| {
            bins.iter()
                .flatten()
                .map(|&k| spectra.coefs.slice(s![.., c, k]).iter().filter(|z| z.norm_sqr() > 0.0).count())
                .min()
                .unwrap_or(0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::SubjectMeta;
    use ndarray::Array3;
    use std::f64::consts::PI;

    fn lagged(n_e: usize, sfreq: f64, n_t: usize) -> Recording {
        // ch0 leads ch1 by a quarter cycle at 10 Hz; ch2 is unrelated.
        let data = Array3::from_shape_fn((n_e, 3, n_t), |(e, c, t)| {
            let ph = 2.0 * PI * 10.0 * t as f64 / sfreq + 0.9 * e as f64;
            match c {
                0 => ph.sin(),
                1 => (ph - PI / 2.0).sin(),
                _ => (2.0 * PI * 23.0 * t as f64 / sfreq + 1.7 * (e * e) as f64).sin(),
            }
        });
        Recording::new(
            data,
            sfreq,
            vec!["a".into(), "b".into(), "c".into()],
            SubjectMeta::new("s1", "wt", "s1.safetensors"),
        )
        .unwrap()
    }

    #[test]
    fn rows_follow_row_major_enumeration() {
        let rec = lagged(4, 100.0, 100);
        let bands = BandSet::from_triples(&[("alpha", 8.0, 12.0)]).unwrap();
        let out = connectivity(&rec, &[ConnMethod::Coh], &bands).unwrap();
        assert!(out.failures.is_empty());
        assert_eq!(out.rows.len(), 9);
        let labels: Vec<_> = out.rows.iter().map(|r| (r.chan1.as_str(), r.chan2.as_str())).collect();
        assert_eq!(labels[0], ("a", "a"));
        assert_eq!(labels[1], ("a", "b"));
        assert_eq!(labels[3], ("b", "a"));
        assert_eq!(labels[8], ("c", "c"));
    }

    #[test]
    fn quarter_cycle_lead_is_directed() {
        let rec = lagged(5, 100.0, 100);
        let bands = BandSet::from_triples(&[("ten", 9.5, 10.5)]).unwrap();
        let out = connectivity(&rec, &[ConnMethod::Dpli, ConnMethod::Wpli], &bands).unwrap();
        assert!(out.failures.is_empty());
        let get = |m: ConnMethod, a: &str, b: &str| {
            out.rows
                .iter()
                .find(|r| r.method == m && r.chan1 == a && r.chan2 == b)
                .map(|r| r.values[0])
                .unwrap()
        };
        approx::assert_abs_diff_eq!(get(ConnMethod::Wpli, "a", "b"), 1.0, epsilon = 1e-9);
        let ab = get(ConnMethod::Dpli, "a", "b");
        let ba = get(ConnMethod::Dpli, "b", "a");
        approx::assert_abs_diff_eq!(ab + ba, 1.0, epsilon = 1e-12);
        assert!((ab - 0.5).abs() > 0.4, "dpli(a, b) = {ab}");
    }

    #[test]
    fn ppc_with_one_epoch_is_isolated() {
        let rec = lagged(1, 100.0, 100);
        let bands = BandSet::from_triples(&[("alpha", 8.0, 12.0)]).unwrap();
        let out = connectivity(&rec, &[ConnMethod::Ppc, ConnMethod::Coh], &bands).unwrap();
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].method, ConnMethod::Ppc);
        assert_eq!(out.rows.len(), 9);
        assert!(out.rows.iter().all(|r| r.method == ConnMethod::Coh));
    }

    #[test]
    fn band_without_bins_fails_fast() {
        // 1 s epochs → 1 Hz bins; (10.2, 10.8] holds none.
        let rec = lagged(2, 100.0, 100);
        let bands = BandSet::from_triples(&[("gap", 10.2, 10.8)]).unwrap();
        assert!(connectivity(&rec, &[ConnMethod::Coh], &bands).is_err());
    }
}
