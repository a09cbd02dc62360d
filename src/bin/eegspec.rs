//! eegspec: per-epoch MF / SEF95 / band powers for one column of a CSV file.
//!
//! Writes one CSV row per epoch (stdout unless `--output` is given) and,
//! with `--psd-json`, every epoch's PSD curve for plotting.
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use eegspec::{
    io::{delimiter_byte, read_column, write_curves_json_path, write_records_csv, write_records_csv_path},
    Analysis, ChannelSelector, PipelineConfig, PipelineOutput,
};

#[derive(Parser, Debug)]
#[command(name = "eegspec", about = "Per-epoch EEG spectral features (PSD, MF, SEF95)")]
struct Args {
    /// Delimited text file with a header row.
    #[arg(long)]
    input: PathBuf,

    /// Feature CSV output path (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write every epoch's PSD curve to this JSON file.
    #[arg(long)]
    psd_json: Option<PathBuf>,

    /// JSON config file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column to analyse: zero-based index or header name.
    #[arg(long)]
    column: Option<ChannelSelector>,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Sampling rate (Hz).
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Highpass cutoff (Hz).
    #[arg(long)]
    hp: Option<f64>,

    /// Highpass Butterworth order.
    #[arg(long)]
    order: Option<usize>,

    /// Epoch duration (s).
    #[arg(long)]
    epoch_dur: Option<f64>,

    /// Lower band-power bound (Hz).
    #[arg(long)]
    lower: Option<f64>,

    /// Upper band-power bound (Hz).
    #[arg(long)]
    upper: Option<f64>,

    /// Stop after this many epochs.
    #[arg(long)]
    max_epochs: Option<usize>,

    /// Stop the per-epoch stage after this many milliseconds.
    #[arg(long)]
    time_budget_ms: Option<u64>,
}

impl Args {
    fn config(&self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(c) = &self.column { cfg.channel = c.clone(); }
        if let Some(v) = self.sample_rate { cfg.sample_rate = v; }
        if let Some(v) = self.hp { cfg.filter.cutoff_hz = v; }
        if let Some(v) = self.order { cfg.filter.order = v; }
        if let Some(v) = self.epoch_dur { cfg.epoch_dur = v; }
        if let Some(v) = self.lower { cfg.lower_bound = v; }
        if let Some(v) = self.upper { cfg.upper_bound = v; }
        if self.max_epochs.is_some() { cfg.limits.max_epochs = self.max_epochs; }
        if self.time_budget_ms.is_some() { cfg.limits.time_budget_ms = self.time_budget_ms; }
        cfg.retain_psd |= self.psd_json.is_some();
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = args.config()?;

    let delimiter = delimiter_byte(args.delimiter)?;
    let col = read_column(&args.input, &cfg.channel, delimiter)?;
    info!(
        "Loaded column '{}' ({} rows, {} malformed) @ {} Hz",
        col.name, col.rows, col.malformed_rows, cfg.sample_rate
    );

    let analysis = Analysis::prepare(col.name.clone(), &col.cells, &cfg)?;
    let report = analysis.report();
    if report.dropped() > 0 {
        info!(
            "Dropped {} cells ({} non-numeric, {} non-finite), {} valid",
            report.dropped(), report.non_numeric, report.non_finite, report.valid
        );
    }

    let mut next_report = 0;
    let out = analysis.run_with_progress(|done, total| {
        let pct = done * 100 / total.max(1);
        if pct >= next_report {
            info!("{pct:>3}% ({done}/{total} epochs)");
            next_report = pct - pct % 10 + 10;
        }
    })?;
    log_summary(&out);

    match &args.output {
        Some(path) => {
            write_records_csv_path(path, &out.records)?;
            info!("Written → {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_records_csv(&mut lock, &out.records)?;
            lock.flush()?;
        }
    }

    if let Some(path) = &args.psd_json {
        write_curves_json_path(path, &out)?;
        info!("PSD curves → {}", path.display());
    }
    Ok(())
}

/// First few epochs as a fixed-width table.
fn log_summary(out: &PipelineOutput) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
    info!("{:>6} {:>8} {:>14} {:>10} {:>10}", "epoch", "start_s", "status", "mf_hz", "sef95_hz");
    for r in out.records.iter().take(5) {
        info!(
            "{:>6} {:>8.1} {:>14} {:>10} {:>10}",
            r.epoch_index,
            r.start_s,
            format!("{:?}", r.status),
            fmt(r.mf_hz),
            fmt(r.sef95_hz),
        );
    }
    info!(
        "{} of {} epochs analysed{}",
        out.analyzed_count(),
        out.epochs_total,
        if out.truncated { " (truncated)" } else { "" }
    );
}
