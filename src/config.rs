//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of one analysis run.  It is
//! a plain value: build it once, validate it, and pass it by reference into
//! [`crate::run`].  Nothing in the crate keeps configuration in global state,
//! so independent runs can proceed in parallel.
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::condition::FILTER_ORDER_MULTIPLE;
use crate::epoch::epoch_length;
use crate::error::{Result, SpectralError};
use crate::filter::MAX_FILTER_ORDER;
use crate::spectral::{WindowKind, MIN_SEGMENT_SAMPLES};

/// High-pass filter stage: Butterworth cutoff (Hz) and order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// −3 dB point in Hz.  Must satisfy `0 < cutoff_hz < sample_rate / 2`.
    pub cutoff_hz: f64,
    /// Butterworth order, `1..=12`.  Odd orders add one first-order section.
    pub order: usize,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self { cutoff_hz: 0.5, order: 4 }
    }
}

impl FilterSpec {
    /// Check cutoff and order against the Nyquist frequency of `sample_rate`.
    pub fn validate(&self, sample_rate: f64) -> Result<()> {
        let nyquist = sample_rate / 2.0;
        if !self.cutoff_hz.is_finite() || self.cutoff_hz <= 0.0 {
            return Err(SpectralError::InvalidFilterSpec(format!(
                "cutoff {} Hz must be positive", self.cutoff_hz
            )));
        }
        if self.cutoff_hz >= nyquist {
            return Err(SpectralError::InvalidFilterSpec(format!(
                "cutoff {} Hz must be below Nyquist ({nyquist} Hz)", self.cutoff_hz
            )));
        }
        if self.order == 0 || self.order > MAX_FILTER_ORDER {
            return Err(SpectralError::InvalidFilterSpec(format!(
                "order {} outside 1..={MAX_FILTER_ORDER}", self.order
            )));
        }
        Ok(())
    }
}

/// Which column of the input table to analyse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSelector {
    /// Zero-based column position.
    Index(usize),
    /// Header name, matched case-insensitively ignoring surrounding spaces.
    Name(String),
}

impl Default for ChannelSelector {
    fn default() -> Self {
        ChannelSelector::Index(0)
    }
}

impl std::fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSelector::Index(i) => write!(f, "#{i}"),
            ChannelSelector::Name(n) => write!(f, "{n}"),
        }
    }
}

impl std::str::FromStr for ChannelSelector {
    type Err = std::convert::Infallible;

    /// Digits select by position, anything else by header name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(i) => ChannelSelector::Index(i),
            Err(_) => ChannelSelector::Name(s.to_string()),
        })
    }
}

/// Welch estimator settings, fixed for the whole run.
///
/// The FFT length always equals the epoch length, so the frequency grid is
/// `k · sample_rate / epoch_samples`.  The settings here only decide how the
/// epoch is cut into tapered sub-windows before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchConfig {
    /// Taper applied to every sub-window.
    ///
    /// Default: [`WindowKind::Hann`].
    pub window: WindowKind,

    /// Sub-window length is `epoch_samples / segment_divisor`.
    /// `1` degenerates to a single tapered periodogram.
    ///
    /// Default: `2`.
    pub segment_divisor: usize,

    /// Fractional overlap between consecutive sub-windows, in `[0, 1)`.
    ///
    /// Default: `0.5`.
    pub overlap: f64,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self { window: WindowKind::Hann, segment_divisor: 2, overlap: 0.5 }
    }
}

impl WelchConfig {
    /// Samples per sub-window for an epoch of `epoch_samples`.
    pub fn segment_samples(&self, epoch_samples: usize) -> usize {
        epoch_samples / self.segment_divisor.max(1)
    }

    /// Overlapping samples between consecutive sub-windows.
    pub fn overlap_samples(&self, epoch_samples: usize) -> usize {
        let seg = self.segment_samples(epoch_samples);
        ((seg as f64 * self.overlap).floor() as usize).min(seg.saturating_sub(1))
    }

    pub fn validate(&self, epoch_samples: usize) -> Result<()> {
        if self.segment_divisor == 0 {
            return Err(SpectralError::InvalidConfig("welch segment_divisor must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(SpectralError::InvalidConfig(format!(
                "welch overlap {} outside [0, 1)", self.overlap
            )));
        }
        let seg = self.segment_samples(epoch_samples);
        if seg < MIN_SEGMENT_SAMPLES {
            return Err(SpectralError::InvalidEpochDuration(format!(
                "{epoch_samples}-sample epoch gives {seg}-sample welch windows, \
                 at least {MIN_SEGMENT_SAMPLES} required"
            )));
        }
        Ok(())
    }
}

/// External cut-off for very long recordings.
///
/// When a limit is hit the run stops cleanly: the output keeps every record
/// processed so far, in order, and is flagged `truncated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Maximum number of epochs to emit records for.
    pub max_epochs: Option<usize>,
    /// Wall-clock budget for the per-epoch stage, in milliseconds.
    pub time_budget_ms: Option<u64>,
}

/// Configuration for one analysis run.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use eegspec::{FilterSpec, PipelineConfig};
///
/// let cfg = PipelineConfig {
///     sample_rate: 128.0,
///     filter: FilterSpec { cutoff_hz: 1.0, order: 2 },
///     ..PipelineConfig::default()
/// };
/// assert_eq!(cfg.epoch_samples(), 256);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sampling rate of the input column in Hz.
    ///
    /// Default: `256.0` Hz.
    pub sample_rate: f64,

    /// Zero-phase Butterworth high-pass applied before epoching.
    ///
    /// Default: 0.5 Hz, order 4.
    pub filter: FilterSpec,

    /// Duration of each epoch in seconds.
    ///
    /// Epoch length in samples is `round(epoch_dur × sample_rate)`.  Epochs
    /// shorter than the filter's cutoff period are accepted; their lowest
    /// bins still carry filter settling error.
    ///
    /// Default: `2.0` s.
    pub epoch_dur: f64,

    /// Column to analyse.
    ///
    /// Default: first column.
    pub channel: ChannelSelector,

    pub welch: WelchConfig,

    /// Lower edge (inclusive) of the band-power range in Hz.
    ///
    /// Default: `1.0` Hz.
    pub lower_bound: f64,

    /// Upper edge (exclusive) of the band-power range in Hz.
    ///
    /// Default: `30.0` Hz.
    pub upper_bound: f64,

    /// Keep every epoch's PSD curve in the output (viewer mode).
    ///
    /// Default: `false` (batch export only needs the scalar features).
    pub retain_psd: bool,

    pub limits: RunLimits,
}

impl Default for PipelineConfig {
    /// 256 Hz · 0.5 Hz order-4 HP · 2 s epochs · Hann Welch · 1–30 Hz bands.
    fn default() -> Self {
        Self {
            sample_rate: 256.0,
            filter: FilterSpec::default(),
            epoch_dur: 2.0,
            channel: ChannelSelector::default(),
            welch: WelchConfig::default(),
            lower_bound: 1.0,
            upper_bound: 30.0,
            retain_psd: false,
            limits: RunLimits::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.  Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Number of samples per epoch, `round(epoch_dur × sample_rate)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eegspec::PipelineConfig;
    /// let cfg = PipelineConfig::default();
    /// assert_eq!(cfg.epoch_samples(), 512);
    /// ```
    pub fn epoch_samples(&self) -> usize {
        let n = (self.epoch_dur * self.sample_rate).round();
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }

    /// Nyquist frequency in Hz.
    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Fewest valid samples the conditioner accepts: one full epoch, and
    /// enough samples to pad and settle the filter.
    pub fn min_valid_samples(&self) -> usize {
        self.epoch_samples().max(FILTER_ORDER_MULTIPLE * self.filter.order)
    }

    /// Validate every parameter.  Called by [`crate::run`] before any data is
    /// touched, so a bad combination never yields partial output.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(SpectralError::InvalidConfig(format!(
                "sample rate {} Hz must be positive", self.sample_rate
            )));
        }
        self.filter.validate(self.sample_rate)?;
        let n = epoch_length(self.epoch_dur, self.sample_rate)?;
        self.welch.validate(n)?;

        if !(self.lower_bound.is_finite() && self.upper_bound.is_finite())
            || self.lower_bound < 0.0
            || self.upper_bound <= self.lower_bound
        {
            return Err(SpectralError::InvalidConfig(format!(
                "band range [{}, {}) Hz: need 0 <= lower < upper",
                self.lower_bound, self.upper_bound
            )));
        }
        if self.limits.max_epochs == Some(0) {
            return Err(SpectralError::InvalidConfig("max_epochs must be >= 1".into()));
        }
        if let ChannelSelector::Name(name) = &self.channel {
            if name.trim().is_empty() {
                return Err(SpectralError::InvalidConfig("empty channel name".into()));
            }
        }
        Ok(())
    }
}
