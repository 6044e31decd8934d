//! Analysis configuration.
//!
//! [`AnalysisConfig`] holds every externally supplied parameter: band
//! boundaries, Welch window length, connectivity methods and the overlap
//! tie-break.  Nothing about the dataset is hard-coded in the algorithms.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bands::{BandSet, OverlapPolicy};
use crate::connectivity::ConnMethod;
use crate::error::invalid;

/// Configuration for one pipeline run.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use eegrest::AnalysisConfig;
///
/// let cfg = AnalysisConfig {
///     window_seconds: 1.0,   // 1 Hz resolution instead of 0.5 Hz
///     parallel:       true,
///     ..AnalysisConfig::default()
/// };
/// ```
///
/// Or load it from JSON with [`AnalysisConfig::from_json_file`]; missing keys
/// fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Welch segment length in seconds.
    ///
    /// The segment has `floor(window_seconds × sfreq)` samples and
    /// consecutive segments overlap by half.  Must fit inside one epoch.
    ///
    /// Default: `2.0` s.
    pub window_seconds: f64,

    /// Epoch length in seconds, used only when a recording is stored as
    /// continuous `[C, T]` data and must be cut into epochs on load.
    ///
    /// Default: `2.0` s.
    pub epoch_seconds: f64,

    /// Ordered frequency band definitions, `(low, high]` in Hz.
    ///
    /// Default: delta (1, 4], theta (4, 8], alpha (8, 13], beta (13, 30],
    /// gamma (30, 80].
    pub bands: BandSet,

    /// Connectivity estimators to run, in output order.
    ///
    /// Default: `coh`, `wpli2_debiased`, `dpli`.
    pub methods: Vec<ConnMethod>,

    /// Which band wins when a Welch bin lies in several bands.
    ///
    /// Default: [`OverlapPolicy::LastMatch`].
    pub overlap_policy: OverlapPolicy,

    /// Analyse subjects on the rayon thread pool instead of sequentially.
    /// Output order is the same either way.
    ///
    /// Default: `false`.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_seconds: 2.0,
            epoch_seconds: 2.0,
            bands: BandSet::default(),
            methods: vec![ConnMethod::Coh, ConnMethod::Wpli2Debiased, ConnMethod::Dpli],
            overlap_policy: OverlapPolicy::LastMatch,
            parallel: false,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that can never produce output.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(self.window_seconds.is_finite() && self.window_seconds > 0.0) {
            return invalid(format!("window_seconds must be > 0, got {}", self.window_seconds));
        }
        if !(self.epoch_seconds.is_finite() && self.epoch_seconds > 0.0) {
            return invalid(format!("epoch_seconds must be > 0, got {}", self.epoch_seconds));
        }
        if self.methods.is_empty() {
            return invalid("no connectivity methods configured");
        }
        Ok(())
    }

    /// Number of samples per Welch segment at `sfreq`.
    ///
    /// Computed as `floor(window_seconds × sfreq)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eegrest::AnalysisConfig;
    /// let cfg = AnalysisConfig::default();
    /// assert_eq!(cfg.window_samples(250.0), 500);
    /// ```
    pub fn window_samples(&self, sfreq: f64) -> usize {
        seconds_to_samples(self.window_seconds, sfreq)
    }
}

/// `floor(seconds × sfreq)`, clamped at zero for non-positive products.
pub fn seconds_to_samples(seconds: f64, sfreq: f64) -> usize {
    let n = seconds * sfreq;
    if n.is_finite() && n > 0.0 {
        n.floor() as usize
    } else {
        0
    }
}
