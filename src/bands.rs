//! Frequency band definitions.
//!
//! A [`BandSet`] is an **ordered** sequence of named intervals.  Membership is
//! half-open on the low end and closed on the high end:
//!
//! ```text
//! freq ∈ band  ⇔  low < freq <= high
//! ```
//!
//! Bands may overlap.  When a frequency falls in more than one band, the
//! [`OverlapPolicy`] decides which one wins; iteration order is always the
//! order in which the bands were defined.
use serde::{Deserialize, Serialize};

use crate::error::{invalid, PipelineError, Result};

/// One named frequency interval `(low, high]` in Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreqBand {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

impl FreqBand {
    pub fn new(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self { name: name.into(), low, high }
    }

    #[inline]
    pub fn contains(&self, freq: f64) -> bool {
        self.low < freq && freq <= self.high
    }
}

/// Tie-break for a frequency that lies in several overlapping bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The first matching band in definition order wins.
    FirstMatch,
    /// The last matching band in definition order wins.
    #[default]
    LastMatch,
}

/// Ordered, non-empty set of uniquely named bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FreqBand>", into = "Vec<FreqBand>")]
pub struct BandSet {
    bands: Vec<FreqBand>,
}

impl BandSet {
    /// Validate and wrap `bands`.
    ///
    /// Rejects an empty list, duplicate names, and intervals that are not
    /// finite with `low < high`.
    pub fn new(bands: Vec<FreqBand>) -> Result<Self> {
        if bands.is_empty() {
            return invalid("band definition is empty");
        }
        for (i, b) in bands.iter().enumerate() {
            if b.name.is_empty() {
                return invalid(format!("band #{i} has an empty name"));
            }
            if !(b.low.is_finite() && b.high.is_finite()) || b.low >= b.high {
                return invalid(format!(
                    "band '{}' has an invalid interval ({}, {}]",
                    b.name, b.low, b.high
                ));
            }
            if bands[..i].iter().any(|o| o.name == b.name) {
                return invalid(format!("duplicate band name '{}'", b.name));
            }
        }
        Ok(Self { bands })
    }

    /// Build from `(name, low, high)` triples.
    pub fn from_triples(triples: &[(&str, f64, f64)]) -> Result<Self> {
        Self::new(
            triples
                .iter()
                .map(|&(n, lo, hi)| FreqBand::new(n, lo, hi))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FreqBand> {
        self.bands.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// Index of the band `freq` is assigned to, if any.
    pub fn assign(&self, freq: f64, policy: OverlapPolicy) -> Option<usize> {
        let mut hits = self
            .bands
            .iter()
            .enumerate()
            .filter(|(_, b)| b.contains(freq))
            .map(|(i, _)| i);
        match policy {
            OverlapPolicy::FirstMatch => hits.next(),
            OverlapPolicy::LastMatch => hits.last(),
        }
    }

    /// Band assignment for every bin of a frequency axis.
    pub fn assign_axis(&self, freqs: &[f64], policy: OverlapPolicy) -> Vec<Option<usize>> {
        freqs.iter().map(|&f| self.assign(f, policy)).collect()
    }

    /// Indices of `freqs` inside each band, independently of overlap.
    ///
    /// Used where every band is its own output column (connectivity), so a
    /// bin may count towards several bands.
    pub fn bins_per_band(&self, freqs: &[f64]) -> Vec<Vec<usize>> {
        self.bands
            .iter()
            .map(|b| {
                freqs
                    .iter()
                    .enumerate()
                    .filter(|(_, &f)| b.contains(f))
                    .map(|(k, _)| k)
                    .collect()
            })
            .collect()
    }
}

impl TryFrom<Vec<FreqBand>> for BandSet {
    type Error = PipelineError;

    fn try_from(bands: Vec<FreqBand>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<BandSet> for Vec<FreqBand> {
    fn from(set: BandSet) -> Self {
        set.bands
    }
}

impl<'a> IntoIterator for &'a BandSet {
    type Item = &'a FreqBand;
    type IntoIter = std::slice::Iter<'a, FreqBand>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.iter()
    }
}

impl Default for BandSet {
    /// Rodent resting-state bands: delta, theta, alpha, beta, gamma.
    fn default() -> Self {
        Self {
            bands: vec![
                FreqBand::new("delta", 1.0, 4.0),
                FreqBand::new("theta", 4.0, 8.0),
                FreqBand::new("alpha", 8.0, 13.0),
                FreqBand::new("beta", 13.0, 30.0),
                FreqBand::new("gamma", 30.0, 80.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_open_low_closed_high() {
        let b = FreqBand::new("theta", 4.0, 8.0);
        assert!(!b.contains(4.0));
        assert!(b.contains(4.0001));
        assert!(b.contains(8.0));
        assert!(!b.contains(8.0001));
    }

    #[test]
    fn adjacent_bands_share_no_bin() {
        let set = BandSet::default();
        // 4 Hz is the top of delta, not the bottom of theta.
        assert_eq!(set.assign(4.0, OverlapPolicy::LastMatch), Some(0));
        assert_eq!(set.assign(4.5, OverlapPolicy::LastMatch), Some(1));
        assert_eq!(set.assign(0.5, OverlapPolicy::LastMatch), None);
        assert_eq!(set.assign(100.0, OverlapPolicy::LastMatch), None);
    }

    #[test]
    fn overlap_policy_picks_first_or_last() {
        let set = BandSet::from_triples(&[("wide", 1.0, 20.0), ("narrow", 5.0, 10.0)]).unwrap();
        assert_eq!(set.assign(7.0, OverlapPolicy::FirstMatch), Some(0));
        assert_eq!(set.assign(7.0, OverlapPolicy::LastMatch), Some(1));
        assert_eq!(set.assign(15.0, OverlapPolicy::LastMatch), Some(0));
    }

    #[test]
    fn rejects_degenerate_definitions() {
        assert!(BandSet::new(vec![]).is_err());
        assert!(BandSet::from_triples(&[("a", 4.0, 4.0)]).is_err());
        assert!(BandSet::from_triples(&[("a", 8.0, 4.0)]).is_err());
        assert!(BandSet::from_triples(&[("a", 1.0, 4.0), ("a", 4.0, 8.0)]).is_err());
        assert!(BandSet::from_triples(&[("", 1.0, 4.0)]).is_err());
        assert!(BandSet::from_triples(&[("a", f64::NAN, 4.0)]).is_err());
    }

    #[test]
    fn bins_per_band_counts_overlap_twice() {
        let set = BandSet::from_triples(&[("a", 0.0, 2.0), ("b", 1.0, 3.0)]).unwrap();
        let freqs = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(set.bins_per_band(&freqs), vec![vec![1, 2], vec![2, 3]]);
    }

    #[test]
    fn deserializes_in_order_and_validates() {
        let json = r#"[{"name":"z","low":10,"high":20},{"name":"a","low":1,"high":4}]"#;
        let set: BandSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.names(), vec!["z", "a"]);

        let dup = r#"[{"name":"a","low":1,"high":4},{"name":"a","low":4,"high":8}]"#;
        assert!(serde_json::from_str::<BandSet>(dup).is_err());
    }
}
