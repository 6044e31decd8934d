//! One subject's epoched signal plus its typed metadata.
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{invalid, Result};

/// Subject metadata joined from the subject log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMeta {
    /// Subject identifier (`eegid` column of every output table).
    pub eegid: String,
    /// Genotype group label.
    pub group: String,
    /// File name of the recording the data was loaded from.
    pub filename: String,
}

impl SubjectMeta {
    pub fn new(eegid: impl Into<String>, group: impl Into<String>, filename: impl Into<String>) -> Self {
        Self { eegid: eegid.into(), group: group.into(), filename: filename.into() }
    }
}

/// Epoched recording, `data` is `[E, C, T]`.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Array3<f64>,
    sfreq: f64,
    ch_names: Vec<String>,
    pub meta: SubjectMeta,
}

impl Recording {
    /// Wrap `data` after checking the shape invariants.
    ///
    /// # Errors
    ///
    /// * no epochs, channels or samples;
    /// * `ch_names.len()` differs from the channel dimension;
    /// * duplicate channel names;
    /// * `sfreq` not finite and positive.
    pub fn new(data: Array3<f64>, sfreq: f64, ch_names: Vec<String>, meta: SubjectMeta) -> Result<Self> {
        let (n_e, n_c, n_t) = data.dim();
        if n_e == 0 || n_c == 0 || n_t == 0 {
            return invalid(format!(
                "{}: degenerate recording shape [E={n_e}, C={n_c}, T={n_t}]",
                meta.filename
            ));
        }
        if ch_names.len() != n_c {
            return invalid(format!(
                "{}: {} channel names for {} channels",
                meta.filename,
                ch_names.len(),
                n_c
            ));
        }
        if let Some(dup) = ch_names
            .iter()
            .enumerate()
            .find(|(i, n)| ch_names[..*i].contains(n))
            .map(|(_, n)| n)
        {
            return invalid(format!("{}: duplicate channel name '{dup}'", meta.filename));
        }
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return invalid(format!("{}: invalid sampling rate {sfreq}", meta.filename));
        }
        Ok(Self { data, sfreq, ch_names, meta })
    }

    #[inline]
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    #[inline]
    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    #[inline]
    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    #[inline]
    pub fn eegid(&self) -> &str {
        &self.meta.eegid
    }

    #[inline]
    pub fn n_epochs(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    /// Epoch duration in seconds.
    #[inline]
    pub fn epoch_secs(&self) -> f64 {
        self.n_times() as f64 / self.sfreq
    }
}
