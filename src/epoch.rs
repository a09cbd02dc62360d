//! Fixed-length epoching.
//!
//! Splits a conditioned series into non-overlapping windows of
//! `round(epoch_dur × sample_rate)` samples, starting at sample 0.  A trailing
//! window with fewer samples is kept and marked
//! [`EpochStatus::Insufficient`] so callers can report "N of M analysed".
use ndarray::{s, ArrayView1};
use serde::Serialize;

use crate::condition::SignalSeries;
use crate::error::{Result, SpectralError};

/// Shortest epoch, in samples, that still resolves a frequency grid.
pub const MIN_EPOCH_SAMPLES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochStatus {
    Complete,
    Insufficient,
}

/// A contiguous window of the series.  Borrows the series' samples.
#[derive(Debug, Clone)]
pub struct Epoch<'a> {
    pub index: usize,
    /// Index of the first sample in the series.
    pub start: usize,
    /// Nominal length in samples.
    pub nominal_len: usize,
    pub samples: ArrayView1<'a, f64>,
    pub status: EpochStatus,
}

impl Epoch<'_> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.status == EpochStatus::Complete
    }

    /// Start time in seconds.
    pub fn start_s(&self, sample_rate: f64) -> f64 {
        self.start as f64 / sample_rate
    }
}

/// Epoch length in samples for `epoch_dur` seconds at `sample_rate` Hz.
///
/// # Errors
///
/// [`SpectralError::InvalidEpochDuration`] if the duration is not positive or
/// rounds to fewer than [`MIN_EPOCH_SAMPLES`] samples.
pub fn epoch_length(epoch_dur: f64, sample_rate: f64) -> Result<usize> {
    if !epoch_dur.is_finite() || epoch_dur <= 0.0 {
        return Err(SpectralError::InvalidEpochDuration(format!(
            "{epoch_dur} s must be positive"
        )));
    }
    let n = (epoch_dur * sample_rate).round();
    if !n.is_finite() || n < MIN_EPOCH_SAMPLES as f64 {
        return Err(SpectralError::InvalidEpochDuration(format!(
            "{epoch_dur} s at {sample_rate} Hz is {n} samples, at least {MIN_EPOCH_SAMPLES} required"
        )));
    }
    Ok(n as usize)
}

/// Number of epochs (including a trailing partial one) for `n_samples`.
pub fn epoch_count(n_samples: usize, epoch_samples: usize) -> usize {
    n_samples.div_ceil(epoch_samples)
}

/// Partition `series` into epochs of `epoch_dur` seconds, in signal order.
pub fn segment(series: &SignalSeries, epoch_dur: f64) -> Result<Vec<Epoch<'_>>> {
    let n_len = epoch_length(epoch_dur, series.sample_rate())?;
    let data = series.samples();
    let n_t = data.len();

    Ok((0..epoch_count(n_t, n_len))
        .map(|e| {
            let start = e * n_len;
            let stop = (start + n_len).min(n_t);
            let status = if stop - start == n_len {
                EpochStatus::Complete
            } else {
                EpochStatus::Insufficient
            };
            Epoch {
                index: e,
                start,
                nominal_len: n_len,
                samples: data.slice_move(s![start..stop]),
                status,
            }
        })
        .collect())
}
