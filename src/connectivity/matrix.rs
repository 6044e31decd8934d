//! Channel × channel connectivity matrices and their long-format rows.
//!
//! Values are stored raveled in the same order the edge table is written:
//!
//! ```text
//! for i in 0..N        (chan1, outer)
//!     for j in 0..N    (chan2, inner)
//!         values[(i·N + j)·B .. (i·N + j)·B + B]   one value per band
//! ```
//!
//! `N` always comes from the recording's channel list.  [`ConnMatrix::validate`]
//! reads the raveled buffer back through the 2-D index and checks the
//! estimator's pair symmetry and self-pair value, which catches any
//! disagreement between the fill order and the enumeration.
use crate::connectivity::method::{ConnMethod, PairSymmetry};
use crate::error::{PipelineError, Result};

const TOL: f64 = 1e-9;

/// Ordered channel pairs `(chan1, chan2)`, row-major, self-pairs included.
pub fn enumerate_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (0..n).map(move |j| (i, j)))
}

/// Connectivity of one method for every ordered pair and band.
#[derive(Debug, Clone)]
pub struct ConnMatrix {
    pub method: ConnMethod,
    n_channels: usize,
    n_bands: usize,
    values: Vec<f64>,
}

impl ConnMatrix {
    /// Fill a matrix by calling `f(i, j)` for each pair in
    /// [`enumerate_pairs`] order.  `f` returns one value per band.
    pub fn build<F>(method: ConnMethod, n_channels: usize, n_bands: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> Result<Vec<f64>>,
    {
        let mut values = Vec::with_capacity(n_channels * n_channels * n_bands);
        for (i, j) in enumerate_pairs(n_channels) {
            let v = f(i, j)?;
            if v.len() != n_bands {
                return Err(PipelineError::Enumeration {
                    method: method.name().to_string(),
                    reason: format!("pair ({i}, {j}) produced {} values for {n_bands} bands", v.len()),
                });
            }
            values.extend(v);
        }
        Ok(Self { method, n_channels, n_bands, values })
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    #[inline]
    pub fn n_bands(&self) -> usize {
        self.n_bands
    }

    /// Value for pair `(i, j)` in band `b`.
    #[inline]
    pub fn get(&self, i: usize, j: usize, b: usize) -> f64 {
        self.values[(i * self.n_channels + j) * self.n_bands + b]
    }

    /// Band values of the `idx`-th pair in enumeration order.
    #[inline]
    pub fn pair_values(&self, idx: usize) -> &[f64] {
        &self.values[idx * self.n_bands..(idx + 1) * self.n_bands]
    }

    /// Check the structural properties of the estimator.
    ///
    /// `active_epochs[c]` is the number of epochs in which channel `c` has a
    /// non-zero coefficient at every band bin (its minimum over bins).  The
    /// self-pair check needs at least `method.min_epochs()` of them; below
    /// that the estimate degenerates to 0.
    pub fn validate(&self, active_epochs: &[usize]) -> Result<()> {
        let fail = |reason: String| {
            Err(PipelineError::Enumeration { method: self.method.name().to_string(), reason })
        };
        if self.values.len() != self.n_channels * self.n_channels * self.n_bands {
            return fail(format!(
                "{} values for {}×{} pairs × {} bands",
                self.values.len(),
                self.n_channels,
                self.n_channels,
                self.n_bands
            ));
        }

        let symmetry = self.method.symmetry();
        let self_value = self.method.self_value();
        let needed = self.method.min_epochs().max(1);

        for b in 0..self.n_bands {
            for i in 0..self.n_channels {
                if active_epochs.get(i).map_or(true, |&a| a >= needed) {
                    let d = self.get(i, i, b);
                    if (d - self_value).abs() > TOL {
                        return fail(format!("self-pair ({i}, {i}) band {b} is {d}, expected {self_value}"));
                    }
                }
                for j in (i + 1)..self.n_channels {
                    let (a, t) = (self.get(i, j, b), self.get(j, i, b));
                    let expected = match symmetry {
                        PairSymmetry::Symmetric => a,
                        PairSymmetry::Antisymmetric => -a,
                        PairSymmetry::Complementary => 1.0 - a,
                    };
                    if (t - expected).abs() > TOL {
                        return fail(format!(
                            "pair ({i}, {j}) = {a} but ({j}, {i}) = {t} in band {b} ({symmetry:?})"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
