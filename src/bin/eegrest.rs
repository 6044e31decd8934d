use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use eegrest::{
    output::write_all,
    pipeline::{find_recordings, run_batch},
    AnalysisConfig, Atlas, ConnMethod, SubjectLog,
};

#[derive(Parser)]
#[command(name = "eegrest", about = "Resting-state band power and connectivity tables")]
struct Args {
    /// Subject log CSV with filename,eegid,group columns
    #[arg(long)]
    subjects: PathBuf,

    /// Directory holding one .safetensors recording per subject
    #[arg(long)]
    data_dir: PathBuf,

    /// Directory the CSV tables are written to
    #[arg(long)]
    out_dir: PathBuf,

    /// JSON analysis config (missing keys use the defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Channel atlas CSV (chan,region,hemisphere) for region power
    #[arg(long)]
    atlas: Option<PathBuf>,

    /// Welch window in seconds, overrides the config
    #[arg(long)]
    window: Option<f64>,

    /// Connectivity methods, comma-separated (e.g. coh,wpli2_debiased,dpli)
    #[arg(long)]
    methods: Option<String>,

    /// Analyse subjects in parallel
    #[arg(long)]
    parallel: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let mut cfg = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(w) = args.window {
        cfg.window_seconds = w;
    }
    if let Some(list) = &args.methods {
        cfg.methods = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<ConnMethod>)
            .collect::<Result<_, _>>()
            .context("parsing --methods")?;
    }
    cfg.parallel |= args.parallel;
    cfg.validate()?;

    let log = SubjectLog::load(&args.subjects)?;
    let atlas = args.atlas.as_deref().map(Atlas::load).transpose()?;
    let files = find_recordings(&args.data_dir)?;
    if files.is_empty() {
        anyhow::bail!("no .safetensors recordings in {}", args.data_dir.display());
    }
    log::info!(
        "{} recordings, window {} s, methods [{}]",
        files.len(),
        cfg.window_seconds,
        cfg.methods.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    );

    let batch = run_batch(&log, &files, &cfg, atlas.as_ref())?;
    write_all(&args.out_dir, &cfg.bands, &batch)?;
    log::info!("Written → {}", args.out_dir.display());

    Ok(())
}
