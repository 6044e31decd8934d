//! Connectivity estimators over epochs.
//!
//! For channels `x`, `y` at one frequency, epoch `e` contributes the
//! cross-spectrum `S_e = X_e · conj(Y_e)`.  With `n` epochs (definitions as in
//! MNE-Connectivity):
//!
//! ```text
//! coh             |Σ S| / sqrt(Σ|X|² · Σ|Y|²)
//! imcoh           Im Σ S / sqrt(Σ|X|² · Σ|Y|²)
//! plv             |Σ S/|S|| / m
//! ppc             (|Σ S/|S||² − m) / (m (m − 1))
//! pli             |Σ sign(Im S)| / n
//! wpli            |Σ Im S| / Σ |Im S|
//! wpli2_debiased  ((Σ Im S)² − Σ (Im S)²) / ((Σ |Im S|)² − Σ (Im S)²)
//! dpli            Σ H(Im S) / n,   H(0) = 0.5
//! ```
//!
//! `m` counts the epochs with `S ≠ 0`; a zero cross-spectrum carries no
//! phase and is left out.  A zero denominator yields 0.
use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView1;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnMethod {
    #[serde(rename = "coh")]
    Coh,
    #[serde(rename = "imcoh")]
    ImCoh,
    #[serde(rename = "plv")]
    Plv,
    #[serde(rename = "ppc")]
    Ppc,
    #[serde(rename = "pli")]
    Pli,
    #[serde(rename = "wpli")]
    Wpli,
    #[serde(rename = "wpli2_debiased")]
    Wpli2Debiased,
    #[serde(rename = "dpli")]
    Dpli,
}

/// How `M[j][i]` relates to `M[i][j]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSymmetry {
    /// `M[j][i] == M[i][j]`
    Symmetric,
    /// `M[j][i] == −M[i][j]`
    Antisymmetric,
    /// `M[j][i] == 1 − M[i][j]`
    Complementary,
}

impl ConnMethod {
    pub const ALL: [ConnMethod; 8] = [
        ConnMethod::Coh,
        ConnMethod::ImCoh,
        ConnMethod::Plv,
        ConnMethod::Ppc,
        ConnMethod::Pli,
        ConnMethod::Wpli,
        ConnMethod::Wpli2Debiased,
        ConnMethod::Dpli,
    ];

    /// Name used in configuration and in the `method` column.
    pub fn name(self) -> &'static str {
        match self {
            ConnMethod::Coh => "coh",
            ConnMethod::ImCoh => "imcoh",
            ConnMethod::Plv => "plv",
            ConnMethod::Ppc => "ppc",
            ConnMethod::Pli => "pli",
            ConnMethod::Wpli => "wpli",
            ConnMethod::Wpli2Debiased => "wpli2_debiased",
            ConnMethod::Dpli => "dpli",
        }
    }

    pub fn symmetry(self) -> PairSymmetry {
        match self {
            ConnMethod::ImCoh => PairSymmetry::Antisymmetric,
            ConnMethod::Dpli => PairSymmetry::Complementary,
            _ => PairSymmetry::Symmetric,
        }
    }

    /// Value of a channel paired with itself, for a channel with signal.
    ///
    /// `S = |X|²` is real and positive, so phase-consistency measures are 1,
    /// imaginary-part measures are 0 and `dpli` sits at `H(0) = 0.5`.
    pub fn self_value(self) -> f64 {
        match self {
            ConnMethod::Coh | ConnMethod::Plv | ConnMethod::Ppc => 1.0,
            ConnMethod::ImCoh | ConnMethod::Pli | ConnMethod::Wpli | ConnMethod::Wpli2Debiased => 0.0,
            ConnMethod::Dpli => 0.5,
        }
    }

    /// Fewest epochs the estimator is defined for.
    pub fn min_epochs(self) -> usize {
        match self {
            ConnMethod::Ppc => 2,
            _ => 1,
        }
    }

    /// Estimate connectivity at one frequency from the per-epoch
    /// coefficients of two channels (`x.len() == y.len() == n_epochs`).
    pub fn estimate(self, x: ArrayView1<'_, Complex<f64>>, y: ArrayView1<'_, Complex<f64>>) -> f64 {
        let n = x.len() as f64;
        let cross = x.iter().zip(y.iter()).map(|(a, b)| a * b.conj());

        match self {
            ConnMethod::Coh | ConnMethod::ImCoh => {
                let sxy: Complex<f64> = cross.sum();
                let sxx: f64 = x.iter().map(|a| a.norm_sqr()).sum();
                let syy: f64 = y.iter().map(|b| b.norm_sqr()).sum();
                let den = (sxx * syy).sqrt();
                let num = if self == ConnMethod::Coh { sxy.norm() } else { sxy.im };
                ratio(num, den)
            }
            ConnMethod::Plv | ConnMethod::Ppc => {
                // Epochs with a zero cross-spectrum have no phase; `m` counts the rest.
                let mut sum = Complex::<f64>::default();
                let mut m = 0.0;
                for s in cross {
                    let mag = s.norm();
                    if mag > 0.0 {
                        sum += s / mag;
                        m += 1.0;
                    }
                }
                if self == ConnMethod::Plv {
                    ratio(sum.norm(), m)
                } else {
                    ratio(sum.norm_sqr() - m, m * (m - 1.0))
                }
            }
            ConnMethod::Pli => {
                let s: f64 = cross.map(|s| sign(s.im)).sum();
                s.abs() / n
            }
            ConnMethod::Wpli => {
                let (sum_im, sum_abs) = cross.fold((0.0, 0.0), |(a, b), s| (a + s.im, b + s.im.abs()));
                ratio(sum_im.abs(), sum_abs)
            }
            ConnMethod::Wpli2Debiased => {
                let (sum_im, sum_abs, sum_sq) = cross.fold((0.0, 0.0, 0.0), |(a, b, c), s| {
                    (a + s.im, b + s.im.abs(), c + s.im * s.im)
                });
                ratio(sum_im * sum_im - sum_sq, sum_abs * sum_abs - sum_sq)
            }
            ConnMethod::Dpli => {
                let s: f64 = cross.map(|s| heaviside(s.im)).sum();
                s / n
            }
        }
    }
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[inline]
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline]
fn heaviside(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        0.0
    } else {
        0.5
    }
}

impl fmt::Display for ConnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConnMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        ConnMethod::ALL
            .iter()
            .copied()
            .find(|m| m.name() == key)
            .ok_or_else(|| {
                let known: Vec<&str> = ConnMethod::ALL.iter().map(|m| m.name()).collect();
                PipelineError::InvalidInput(format!(
                    "unknown connectivity method '{s}' (known: {})",
                    known.join(", ")
                ))
            })
    }
}
