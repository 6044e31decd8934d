/// subject_steps: load one recording, run each analysis step, write every
/// intermediate array to a safetensors file for comparison against
/// SciPy/MNE.
///
/// Output keys:
///   data          [E, C, T]     f64  epoched input
///   freqs         [F]           f64  Welch bin frequencies
///   psd           [E, C, F]     f64  Welch PSD per epoch
///   psd_mean      [C, F]        f64  mean over epochs
///   conn_freqs    [K]           f64  FFT bin frequencies of the epoch spectra
///   conn_<method> [C, C, B]     f64  band-averaged connectivity, (chan1, chan2, band)
///   n_epochs      [1]           i32
///   ch_names      U8                 newline-separated
use anyhow::Result;
use clap::Parser;
use ndarray::Array3;
use std::path::PathBuf;

use eegrest::{
    connectivity::method_matrix,
    io::{load_recording, StWriter},
    spectrum::{epoch_spectra, welch_epochs},
    AnalysisConfig, ConnMethod, SubjectMeta,
};

#[derive(Parser, Debug)]
#[command(name = "subject_steps")]
struct Args {
    /// Input recording (.safetensors).
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Welch window (s).
    #[arg(long, default_value_t = 2.0)]
    window: f64,

    /// Epoch duration (s), continuous inputs only.
    #[arg(long, default_value_t = 2.0)]
    epoch_dur: f64,

    /// Connectivity methods, comma-separated; all methods when omitted.
    #[arg(long)]
    methods: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let methods: Vec<ConnMethod> = match &args.methods {
        Some(list) => list.split(',').map(str::parse::<ConnMethod>).collect::<Result<_, _>>()?,
        None => ConnMethod::ALL.to_vec(),
    };
    let cfg = AnalysisConfig {
        window_seconds: args.window,
        epoch_seconds: args.epoch_dur,
        ..AnalysisConfig::default()
    };
    cfg.validate()?;
    let bands = &cfg.bands;

    // ── 1. Load ────────────────────────────────────────────────────────────
    let t_load = now();
    let file_name = args
        .input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let meta = SubjectMeta::new(file_name.clone(), "", file_name);
    let rec = load_recording(&args.input, meta, cfg.epoch_seconds)?;
    let ms_load = t_load.elapsed().as_secs_f64() * 1000.0;

    // ── 2. Welch PSD ───────────────────────────────────────────────────────
    let t_psd = now();
    let n_per_seg = cfg.window_samples(rec.sfreq());
    let psd = welch_epochs(rec.data(), rec.sfreq(), n_per_seg, n_per_seg / 2)?;
    let psd_mean = psd.epoch_mean();
    let ms_psd = t_psd.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Connectivity ────────────────────────────────────────────────────
    let t_conn = now();
    let spectra = epoch_spectra(rec.data(), rec.sfreq())?;
    let bins = bands.bins_per_band(&spectra.freqs);
    let mut matrices = Vec::with_capacity(methods.len());
    for &m in &methods {
        match method_matrix(&rec, &spectra, &bins, m) {
            Ok(mat) => matrices.push(mat),
            Err(e) => log::warn!("{m}: {e}"),
        }
    }
    let ms_conn = t_conn.elapsed().as_secs_f64() * 1000.0;

    eprintln!("TIMING load={ms_load:.4}ms psd={ms_psd:.4}ms conn={ms_conn:.4}ms");
    eprintln!(
        "  {} epochs  {} ch  sfreq={} Hz  {} freqs",
        rec.n_epochs(),
        rec.n_channels(),
        rec.sfreq(),
        psd.freqs.len()
    );

    // ── 4. Write output ────────────────────────────────────────────────────
    eprintln!("Writing → {}", args.output.display());
    let mut w = StWriter::new();
    w.add_f64_arr3("data", rec.data());
    w.add_f64("freqs", &psd.freqs, &[psd.freqs.len()]);
    w.add_f64_arr3("psd", &psd.psd);
    w.add_f64_arr2("psd_mean", &psd_mean);
    w.add_f64("conn_freqs", &spectra.freqs, &[spectra.freqs.len()]);
    for mat in &matrices {
        let n = mat.n_channels();
        let arr = Array3::from_shape_fn((n, n, mat.n_bands()), |(i, j, b)| mat.get(i, j, b));
        w.add_f64_arr3(&format!("conn_{}", mat.method), &arr);
    }
    w.add_i32("n_epochs", &[rec.n_epochs() as i32], &[1]);
    w.add_names("ch_names", rec.ch_names());
    w.write(&args.output)?;

    eprintln!("Done.");
    Ok(())
}

#[inline(always)]
fn now() -> std::time::Instant {
    std::time::Instant::now()
}
