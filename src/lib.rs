//! # eegrest — resting-state band power and connectivity in pure Rust
//!
//! `eegrest` turns per-subject epoched MEA/EEG recordings into the
//! long-format tables used for group statistics: Welch band power and
//! pairwise functional connectivity.  The spectral estimators follow
//! SciPy's `welch` and MNE-Python's `spectral_connectivity_epochs`.
//!
//! _No Python, no BLAS, no C libraries. Pure Rust + [RustFFT](https://crates.io/crates/rustfft)._
//!
//! ## Pipeline overview
//!
//! ```text
//! subjects.csv + *.safetensors
//!   │
//!   ├─ subjects::SubjectLog   file → (eegid, group), exactly one match each
//!   ├─ io::load_recording     [E, C, T] (or [C, T] cut into epochs)
//!   ├─ power::band_power      Welch PSD per epoch → mean → band tables
//!   │     power_abs, power_rel (over retained bins), power_db
//!   ├─ connectivity           per method: N × N edges, one value per band
//!   ├─ atlas::region_power    optional channel → region averages
//!   └─ output::write_all      power_by_freq.csv, power_by_band.csv,
//!                             connectivity.csv, …
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegrest::{run_batch, AnalysisConfig, SubjectLog};
//! use eegrest::pipeline::find_recordings;
//! use std::path::Path;
//!
//! let log   = SubjectLog::load(Path::new("data/subjects.csv")).unwrap();
//! let files = find_recordings(Path::new("data")).unwrap();
//! let cfg   = AnalysisConfig::default();
//!
//! let batch = run_batch(&log, &files, &cfg, None).unwrap();
//! eegrest::output::write_all(Path::new("out"), &cfg.bands, &batch).unwrap();
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use eegrest::{band_power, connectivity, BandSet, ConnMethod, OverlapPolicy, Recording, SubjectMeta};
//! use ndarray::Array3;
//!
//! let data = Array3::<f64>::zeros((10, 4, 500)); // [E, C, T]
//! let names = (1..=4).map(|i| i.to_string()).collect();
//! let rec = Recording::new(data, 250.0, names, SubjectMeta::new("s01", "wt", "s01.safetensors")).unwrap();
//!
//! let bands = BandSet::default();
//! let power = band_power(&rec, 2.0, &bands, OverlapPolicy::LastMatch).unwrap();
//! let conn  = connectivity(&rec, &[ConnMethod::Coh, ConnMethod::Dpli], &bands).unwrap();
//! println!("{} power rows, {} edge rows", power.by_freq.len(), conn.rows.len());
//! ```

pub mod atlas;
pub mod bands;
pub mod config;
pub mod connectivity;
pub mod epoch;
pub mod error;
pub mod io;
pub mod output;
pub mod pipeline;
pub mod power;
pub mod recording;
pub mod spectrum;
pub mod subjects;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use atlas::{region_power, Atlas, AtlasEntry, RegionPowerRow};
pub use bands::{BandSet, FreqBand, OverlapPolicy};
pub use config::AnalysisConfig;
pub use connectivity::{connectivity, ConnMatrix, ConnMethod, ConnectivityOutcome, EdgeRow, MethodFailure};
pub use epoch::epoch;
pub use error::PipelineError;
pub use io::{load_recording, write_recording, StWriter};
pub use pipeline::{analyze_subject, run_batch, BatchResult, SubjectFailure, SubjectResult};
pub use power::{band_power, BandPower, BandPowerRow, PowerRow};
pub use recording::{Recording, SubjectMeta};
pub use spectrum::{epoch_spectra, welch_epochs, EpochSpectra, WelchPsd};
pub use subjects::{SubjectEntry, SubjectLog};
