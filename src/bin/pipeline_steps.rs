/// pipeline_steps: read one CSV column, run each stage separately and write
/// every intermediate to a JSON file for comparison against a reference
/// implementation (e.g. `scipy.signal.sosfiltfilt` + `scipy.signal.welch`).
///
/// Output keys:
///   raw           [T_valid]     f64  parsed samples before filtering
///   hp            [T_valid]     f64  after zero-phase Butterworth highpass
///   epoch_starts  [E]           usize  start sample of each epoch
///   frequencies   [F]           f64  Welch frequency grid
///   psd           [E_full, F]   f64  one row per complete epoch
///   features      [E]                MF / SEF95 per epoch (null when absent)
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use serde_json::json;

use eegspec::{
    butter_highpass, features::extract, io::{delimiter_byte, read_column}, parse_cells, segment, sosfiltfilt,
    ChannelSelector, FilterSpec, SignalSeries, WelchConfig, WelchEstimator,
};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Input CSV file.
    #[arg(long)]
    input: PathBuf,

    /// Output JSON path.
    #[arg(long)]
    output: PathBuf,

    /// Column index or name.
    #[arg(long, default_value = "0")]
    column: ChannelSelector,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Sampling rate (Hz).
    #[arg(long, default_value_t = 256.0)]
    sample_rate: f64,

    /// Highpass cutoff (Hz).
    #[arg(long, default_value_t = 0.5)]
    hp: f64,

    /// Highpass order.
    #[arg(long, default_value_t = 4)]
    order: usize,

    /// Epoch duration (s).
    #[arg(long, default_value_t = 2.0)]
    epoch_dur: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let fs = args.sample_rate;
    let spec = FilterSpec { cutoff_hz: args.hp, order: args.order };
    spec.validate(fs)?;
    let delimiter = delimiter_byte(args.delimiter)?;

    // ── 1. Read + parse ───────────────────────────────────────────────────
    let t_read = now();
    let col = read_column(&args.input, &args.column, delimiter)?;
    let (raw, report) = parse_cells(&col.cells);
    let ms_read = t_read.elapsed().as_secs_f64() * 1000.0;

    // ── 2. Highpass ───────────────────────────────────────────────────────
    let t_hp = now();
    let sos = butter_highpass(spec.cutoff_hz, fs, spec.order);
    let hp = sosfiltfilt(&sos, &raw);
    let series = SignalSeries::new(hp.clone(), fs)?;
    let ms_hp = t_hp.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Epoch ──────────────────────────────────────────────────────────
    let t_ep = now();
    let epochs = segment(&series, args.epoch_dur)?;
    let ms_ep = t_ep.elapsed().as_secs_f64() * 1000.0;

    // ── 4. Welch + features ───────────────────────────────────────────────
    let t_psd = now();
    let n_len = epochs.first().map_or(0, |e| e.nominal_len);
    let welch = WelchEstimator::new(n_len, fs, &WelchConfig::default())?;
    let mut psd_rows = Vec::new();
    let mut frequencies = Vec::new();
    let mut features = Vec::new();
    for e in &epochs {
        let feats = match welch.estimate_normalized(e) {
            Ok((unit, gain)) => {
                let f = extract(&unit).ok();
                let psd = unit.scaled(gain);
                frequencies = psd.frequencies.clone();
                psd_rows.push(psd.power);
                f
            }
            Err(_) => None,
        };
        features.push(json!({
            "epoch_index": e.index,
            "mf_hz": feats.map(|f| f.mf),
            "sef95_hz": feats.map(|f| f.sef95),
        }));
    }
    let ms_psd = t_psd.elapsed().as_secs_f64() * 1000.0;

    info!(
        "TIMING read={ms_read:.4}ms hp={ms_hp:.4}ms epoch={ms_ep:.4}ms welch={ms_psd:.4}ms"
    );
    info!(
        "  column '{}'  {} valid of {}  {} epochs ({} full)",
        col.name, report.valid, report.total, epochs.len(), psd_rows.len()
    );

    // ── 5. Write output ───────────────────────────────────────────────────
    let doc = json!({
        "sample_rate": fs,
        "raw": raw,
        "hp": hp,
        "epoch_starts": epochs.iter().map(|e| e.start).collect::<Vec<_>>(),
        "frequencies": frequencies,
        "psd": psd_rows,
        "features": features,
    });
    std::fs::write(&args.output, serde_json::to_vec(&doc)?)?;
    info!("Written → {}", args.output.display());
    Ok(())
}

/// Return `std::time::Instant::now()` (used for internal timing).
#[inline(always)]
fn now() -> std::time::Instant { std::time::Instant::now() }
