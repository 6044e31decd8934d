//! Per-subject analysis and the batch loop over subjects.
//!
//! ```text
//! subject log + recordings
//!   │
//!   ├─ lookup every file in the log     any miss → abort (group is mandatory)
//!   ├─ per subject (sequential or rayon):
//!   │     load_recording                 malformed file → abort
//!   │     band_power                     failure → SubjectFailure, continue
//!   │     connectivity                   per-method failures → SubjectFailure
//!   ├─ merge per-subject tables once, in input order
//!   └─ region power (if an atlas is given)
//! ```
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;

use crate::atlas::{region_power, Atlas, RegionPowerRow};
use crate::config::AnalysisConfig;
use crate::connectivity::{connectivity, EdgeRow};
use crate::error::PipelineError;
use crate::io::load_recording;
use crate::power::{band_power, BandPower, BandPowerRow, PowerRow};
use crate::recording::{Recording, SubjectMeta};
use crate::subjects::SubjectLog;

/// Something that failed for one subject without stopping the batch.
#[derive(Debug)]
pub struct SubjectFailure {
    pub eegid: String,
    /// `power`, `connectivity` or `connectivity:<method>`.
    pub stage: String,
    pub error: PipelineError,
}

/// Everything computed for one subject.
#[derive(Debug)]
pub struct SubjectResult {
    pub meta: SubjectMeta,
    pub power: Option<BandPower>,
    pub edges: Vec<EdgeRow>,
    pub failures: Vec<SubjectFailure>,
}

/// Tables of a whole batch, concatenated in subject order.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub subjects: Vec<SubjectMeta>,
    pub power_by_freq: Vec<PowerRow>,
    pub power_by_band: Vec<BandPowerRow>,
    pub power_by_region: Vec<RegionPowerRow>,
    pub connectivity: Vec<EdgeRow>,
    pub failures: Vec<SubjectFailure>,
}

/// Run both analyses on one recording.
///
/// Never fails as a whole: each failing stage is reported in
/// [`SubjectResult::failures`].
pub fn analyze_subject(rec: &Recording, cfg: &AnalysisConfig) -> SubjectResult {
    let eegid = rec.eegid().to_string();
    let mut failures = Vec::new();

    let power = match band_power(rec, cfg.window_seconds, &cfg.bands, cfg.overlap_policy) {
        Ok(p) => Some(p),
        Err(error) => {
            warn!("{eegid}: band power failed: {error}");
            failures.push(SubjectFailure { eegid: eegid.clone(), stage: "power".into(), error });
            None
        }
    };

    let edges = match connectivity(rec, &cfg.methods, &cfg.bands) {
        Ok(out) => {
            failures.extend(out.failures.into_iter().map(|f| SubjectFailure {
                eegid: f.eegid,
                stage: format!("connectivity:{}", f.method),
                error: f.error,
            }));
            out.rows
        }
        Err(error) => {
            warn!("{eegid}: connectivity failed: {error}");
            failures.push(SubjectFailure { eegid: eegid.clone(), stage: "connectivity".into(), error });
            Vec::new()
        }
    };

    SubjectResult { meta: rec.meta.clone(), power, edges, failures }
}

/// Sorted `*.safetensors` files directly inside `dir`.
pub fn find_recordings(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == "safetensors"))
        .collect();
    files.sort();
    Ok(files)
}

/// Analyse every recording in `files`.
///
/// # Errors
///
/// Aborts before any computation if a file does not match exactly one
/// subject-log entry, and aborts if a recording cannot be loaded.
pub fn run_batch(
    log: &SubjectLog,
    files: &[PathBuf],
    cfg: &AnalysisConfig,
    atlas: Option<&Atlas>,
) -> Result<BatchResult> {
    cfg.validate()?;

    let metas: Vec<SubjectMeta> = files
        .iter()
        .map(|f| log.lookup(f).with_context(|| format!("validating {}", f.display())))
        .collect::<Result<_>>()?;

    let total = files.len();
    let process = |(i, (path, meta)): (usize, (&PathBuf, &SubjectMeta))| -> Result<SubjectResult> {
        let rec = load_recording(path, meta.clone(), cfg.epoch_seconds)?;
        info!(
            "[{}/{total}] {} ({}): {} epochs × {} ch @ {} Hz",
            i + 1,
            rec.eegid(),
            rec.meta.group,
            rec.n_epochs(),
            rec.n_channels(),
            rec.sfreq()
        );
        Ok(analyze_subject(&rec, cfg))
    };

    let jobs: Vec<(usize, (&PathBuf, &SubjectMeta))> = files.iter().zip(&metas).enumerate().collect();
    let results: Vec<SubjectResult> = if cfg.parallel {
        jobs.into_par_iter().map(process).collect::<Result<_>>()?
    } else {
        jobs.into_iter().map(process).collect::<Result<_>>()?
    };

    let mut batch = merge(results);
    if let Some(atlas) = atlas {
        batch.power_by_region = region_power(&batch.power_by_band, atlas);
    }

    info!(
        "{} subjects: {} freq rows, {} band rows, {} edge rows, {} failure(s)",
        batch.subjects.len(),
        batch.power_by_freq.len(),
        batch.power_by_band.len(),
        batch.connectivity.len(),
        batch.failures.len()
    );
    Ok(batch)
}

/// Concatenate per-subject results once, with pre-sized vectors.
pub fn merge(results: Vec<SubjectResult>) -> BatchResult {
    let n_freq = results.iter().filter_map(|r| r.power.as_ref()).map(|p| p.by_freq.len()).sum();
    let n_band = results.iter().filter_map(|r| r.power.as_ref()).map(|p| p.by_band.len()).sum();
    let n_edge = results.iter().map(|r| r.edges.len()).sum();

    let mut batch = BatchResult {
        subjects: Vec::with_capacity(results.len()),
        power_by_freq: Vec::with_capacity(n_freq),
        power_by_band: Vec::with_capacity(n_band),
        power_by_region: Vec::new(),
        connectivity: Vec::with_capacity(n_edge),
        failures: Vec::new(),
    };
    for r in results {
        batch.subjects.push(r.meta);
        if let Some(p) = r.power {
            batch.power_by_freq.extend(p.by_freq);
            batch.power_by_band.extend(p.by_band);
        }
        batch.connectivity.extend(r.edges);
        batch.failures.extend(r.failures);
    }
    batch
}
