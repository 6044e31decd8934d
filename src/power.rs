//! Band power aggregation.
//!
//! Turns one recording into two long-format tables:
//!
//! ```text
//! [E, C, T] signal
//!   │
//!   ├─ welch_epochs()        Hann, n = floor(window_s · sfreq), overlap n/2
//!   ├─ mean over epochs      → power_abs [C, F]
//!   ├─ band assignment       low < f <= high, overlap policy; drop the rest
//!   ├─ power_rel             power_abs / Σ retained power_abs  (per channel)
//!   ├─ power_db              10 · log10(power_abs)
//!   │
//!   ├─→ PowerRow       one per (channel, retained bin)
//!   └─→ BandPowerRow   one per (channel, band): arithmetic mean of the three
//! ```
//!
//! Spectra are averaged across epochs after per-epoch Welch estimation, so
//! the frequency resolution is `1 / window_seconds` regardless of how many
//! epochs a subject has.
use log::{debug, warn};
use serde::Serialize;

use crate::bands::{BandSet, OverlapPolicy};
use crate::config::seconds_to_samples;
use crate::error::{invalid, Result};
use crate::recording::Recording;
use crate::spectrum::welch_epochs;

/// One row of the frequency-resolved power table.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerRow {
    pub eegid: String,
    pub chan: String,
    pub freq_band: String,
    pub freq: f64,
    pub power_abs: f64,
    pub power_rel: f64,
    pub power_db: f64,
}

/// One row of the band-averaged power table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandPowerRow {
    pub eegid: String,
    pub chan: String,
    pub freq_band: String,
    pub power_abs: f64,
    pub power_rel: f64,
    pub power_db: f64,
}

/// Both power tables for one subject.
#[derive(Debug, Clone, Default)]
pub struct BandPower {
    pub by_freq: Vec<PowerRow>,
    pub by_band: Vec<BandPowerRow>,
}

/// Compute the band power tables of `rec`.
///
/// # Errors
///
/// * the window is zero samples or longer than an epoch;
/// * `bands` is empty;
/// * no Welch bin falls inside any band.
pub fn band_power(
    rec: &Recording,
    window_seconds: f64,
    bands: &BandSet,
    policy: OverlapPolicy,
) -> Result<BandPower> {
    if bands.is_empty() {
        return invalid("band definition is empty");
    }
    let n_per_seg = seconds_to_samples(window_seconds, rec.sfreq());
    if n_per_seg == 0 {
        return invalid(format!(
            "{}: window of {window_seconds} s at {} Hz is zero samples",
            rec.eegid(),
            rec.sfreq()
        ));
    }

    // 1–2. Welch per epoch, then mean over epochs.
    let welch = welch_epochs(rec.data(), rec.sfreq(), n_per_seg, n_per_seg / 2)?;
    let power_abs = welch.epoch_mean();
    let freqs = &welch.freqs;
    debug!(
        "{}: PSD [C={}, F={}] from {} epochs, window {n_per_seg} samples",
        rec.eegid(),
        power_abs.nrows(),
        freqs.len(),
        rec.n_epochs()
    );

    // 6. Band of every bin; `None` bins are dropped.
    let assignment = bands.assign_axis(freqs, policy);
    let retained: Vec<(usize, usize)> = assignment
        .iter()
        .enumerate()
        .filter_map(|(k, b)| b.map(|b| (k, b)))
        .collect();
    if retained.is_empty() {
        return invalid(format!(
            "{}: no Welch bin (resolution {:.4} Hz, max {:.2} Hz) falls inside any band",
            rec.eegid(),
            freqs.get(1).copied().unwrap_or(0.0),
            freqs.last().copied().unwrap_or(0.0)
        ));
    }

    let n_bands = bands.len();
    let band_names = bands.names();
    let mut by_freq = Vec::with_capacity(rec.n_channels() * retained.len());
    let mut by_band = Vec::with_capacity(rec.n_channels() * n_bands);

    for (c, chan) in rec.ch_names().iter().enumerate() {
        let row = power_abs.row(c);

        // 4. Relative power over the retained bins only.
        let total: f64 = retained.iter().map(|&(k, _)| row[k]).sum();
        if total <= 0.0 {
            warn!("{}: channel {chan} has no power in any band; power_rel set to 0", rec.eegid());
        }
        let inv_total = if total > 0.0 { 1.0 / total } else { 0.0 };

        // 7. Per-band accumulators: (abs, rel, db, count).
        let mut acc = vec![(0.0_f64, 0.0_f64, 0.0_f64, 0_usize); n_bands];

        for &(k, b) in &retained {
            let abs = row[k];
            let rel = abs * inv_total;
            let db = 10.0 * abs.log10();

            let a = &mut acc[b];
            a.0 += abs;
            a.1 += rel;
            a.2 += db;
            a.3 += 1;

            by_freq.push(PowerRow {
                eegid: rec.eegid().to_string(),
                chan: chan.clone(),
                freq_band: band_names[b].to_string(),
                freq: freqs[k],
                power_abs: abs,
                power_rel: rel,
                power_db: db,
            });
        }

        for (b, &(abs, rel, db, n)) in acc.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let inv_n = 1.0 / n as f64;
            by_band.push(BandPowerRow {
                eegid: rec.eegid().to_string(),
                chan: chan.clone(),
                freq_band: band_names[b].to_string(),
                power_abs: abs * inv_n,
                power_rel: rel * inv_n,
                power_db: db * inv_n,
            });
        }
    }

    Ok(BandPower { by_freq, by_band })
}
