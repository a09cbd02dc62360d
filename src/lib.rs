//! # eegspec — per-epoch EEG spectral features in pure Rust
//!
//! `eegspec` turns one recorded EEG channel into per-epoch spectral summaries:
//! a Welch power spectral density, the median frequency (MF) and the 95 %
//! spectral edge frequency (SEF95), plus classic band powers.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.csv
//!   │
//!   ├─ io::read_column()        one column as raw cells, malformed rows counted
//!   ├─ condition::condition()   parse + drop non-numeric/non-finite cells,
//!   │                           zero-phase Butterworth HP (default 0.5 Hz, order 4)
//!   ├─ epoch::segment()         non-overlapping windows (default 2 s),
//!   │                           trailing partial window kept as Insufficient
//!   ├─ spectral (Welch)         Hann sub-windows, 50 % overlap, nfft = epoch length
//!   └─ features::extract()      cumulative power → MF, SEF95 (+ band powers)
//!        │
//!        └─→ Vec<FeatureRecord>  one per epoch, in epoch order
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegspec::{io::read_column, run, PipelineConfig};
//! use std::path::Path;
//!
//! let cfg = PipelineConfig::default();
//! let col = read_column(Path::new("data/recording.csv"), &cfg.channel, b',').unwrap();
//! let out = run(&col.cells, &cfg).unwrap();
//!
//! for r in &out.records {
//!     println!("epoch {}: {:?} MF={:?} SEF95={:?}", r.epoch_index, r.status, r.mf_hz, r.sef95_hz);
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use eegspec::{condition, segment, FilterSpec, WelchConfig, WelchEstimator};
//! use eegspec::features::extract;
//!
//! let cells = vec!["1.0"; 2048];
//! let filt = FilterSpec { cutoff_hz: 0.5, order: 4 };
//! let conditioned = condition(&cells, 256.0, &filt, 512).unwrap();
//! let epochs = segment(&conditioned.series, 2.0).unwrap();
//! let welch = WelchEstimator::new(512, 256.0, &WelchConfig::default()).unwrap();
//! for e in epochs.iter().filter(|e| e.is_complete()) {
//!     let psd = welch.estimate(e).unwrap();
//!     let feats = extract(&psd);
//! }
//! ```

pub mod condition;
pub mod config;
pub mod epoch;
pub mod error;
pub mod features;
pub mod filter;
pub mod io;
pub mod pipeline;
pub mod spectral;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{ChannelSelector, FilterSpec, PipelineConfig, RunLimits, WelchConfig};

// error
pub use error::{Result, SpectralError};

// condition
pub use condition::{condition, condition_samples, parse_cells, ConditionReport, Conditioned, SignalSeries};

// epoch
pub use epoch::{epoch_count, epoch_length, segment, Epoch, EpochStatus};

// filter
pub use filter::{butter_highpass, sosfiltfilt, Biquad};

// spectral
pub use spectral::{estimate, PsdCurve, WelchEstimator, WindowKind};

// features
pub use features::{band_powers, extract, Band, BandPowers, SpectralFeatures};

// pipeline
pub use pipeline::{run, Analysis, FeatureRecord, PipelineOutput, RecordStatus};
