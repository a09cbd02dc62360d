//! Error kinds raised by the analysis core.
//!
//! Run-level errors abort the whole run before any record is produced.
//! [`SpectralError::EmptySpectrum`] is per-epoch: the orchestrator records it
//! on the offending epoch and carries on.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectralError {
    #[error("insufficient data: {valid} valid samples, at least {required} required")]
    InsufficientData { valid: usize, required: usize },

    #[error("invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    #[error("invalid epoch duration: {0}")]
    InvalidEpochDuration(String),

    #[error("empty spectrum: no power above DC")]
    EmptySpectrum,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SpectralError {
    /// `true` for errors that only invalidate a single epoch.
    pub fn is_per_epoch(&self) -> bool {
        matches!(self, SpectralError::EmptySpectrum)
    }
}

pub type Result<T> = std::result::Result<T, SpectralError>;
