//! Signal conditioning: cell validation and zero-phase high-pass filtering.
//!
//! Cells that do not parse as numbers, or parse to NaN/±inf, are dropped (not
//! substituted) and counted.  The surviving samples are filtered with a
//! forward-backward Butterworth high-pass, which removes drift and DC offset
//! without shifting anything in time.
use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use serde::Serialize;

use crate::config::FilterSpec;
use crate::error::{Result, SpectralError};
use crate::filter::{butter_highpass, sosfiltfilt};

/// The conditioner needs at least this many samples per unit of filter order.
pub const FILTER_ORDER_MULTIPLE: usize = 6;

/// Validated, filtered samples plus the rate they were recorded at.
///
/// Every element is finite and `sample_rate > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    samples: Array1<f64>,
    sample_rate: f64,
}

impl SignalSeries {
    /// Wrap already-validated samples.  Non-finite values or a non-positive
    /// rate are rejected.
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SpectralError::InvalidConfig(format!(
                "sample rate {sample_rate} Hz must be positive"
            )));
        }
        if let Some(i) = samples.iter().position(|v| !v.is_finite()) {
            return Err(SpectralError::InvalidConfig(format!("sample {i} is not finite")));
        }
        Ok(Self { samples: Array1::from(samples), sample_rate })
    }

    pub fn samples(&self) -> ArrayView1<'_, f64> {
        self.samples.view()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}

/// What the validation step kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionReport {
    pub total: usize,
    /// Cells that did not parse as a number (including blanks).
    pub non_numeric: usize,
    /// Cells that parsed to NaN or ±inf.
    pub non_finite: usize,
    pub valid: usize,
}

impl ConditionReport {
    pub fn dropped(&self) -> usize {
        self.non_numeric + self.non_finite
    }
}

/// Output of [`condition`].
#[derive(Debug, Clone)]
pub struct Conditioned {
    pub series: SignalSeries,
    pub report: ConditionReport,
}

/// Parse each cell as `f64`, keeping finite values in order.
pub fn parse_cells<S: AsRef<str>>(cells: &[S]) -> (Vec<f64>, ConditionReport) {
    let mut report = ConditionReport { total: cells.len(), ..Default::default() };
    let mut values = Vec::with_capacity(cells.len());

    for cell in cells {
        match cell.as_ref().trim().parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(v),
            Ok(_) => report.non_finite += 1,
            Err(_) => report.non_numeric += 1,
        }
    }
    report.valid = values.len();
    (values, report)
}

/// Validate and high-pass filter a raw column of cells.
///
/// # Errors
///
/// * [`SpectralError::InvalidFilterSpec`] if the cutoff is not inside
///   `(0, sample_rate / 2)` or the order is out of range.
/// * [`SpectralError::InsufficientData`] if fewer than `min_valid` cells
///   survive validation (an empty column always fails).
pub fn condition<S: AsRef<str>>(
    cells: &[S],
    sample_rate: f64,
    filter: &FilterSpec,
    min_valid: usize,
) -> Result<Conditioned> {
    filter.validate(sample_rate)?;
    let (values, report) = parse_cells(cells);
    if report.dropped() > 0 {
        warn!(
            "dropped {} of {} cells ({} non-numeric, {} non-finite)",
            report.dropped(), report.total, report.non_numeric, report.non_finite
        );
    }
    let series = filter_validated(values, sample_rate, filter, min_valid)?;
    Ok(Conditioned { series, report })
}

/// Same as [`condition`] for input that is already numeric.  Non-finite
/// values are dropped and counted as `non_finite`.
pub fn condition_samples(
    samples: &[f64],
    sample_rate: f64,
    filter: &FilterSpec,
    min_valid: usize,
) -> Result<Conditioned> {
    filter.validate(sample_rate)?;
    let values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    let report = ConditionReport {
        total: samples.len(),
        non_numeric: 0,
        non_finite: samples.len() - values.len(),
        valid: values.len(),
    };
    let series = filter_validated(values, sample_rate, filter, min_valid)?;
    Ok(Conditioned { series, report })
}

fn filter_validated(
    values: Vec<f64>,
    sample_rate: f64,
    filter: &FilterSpec,
    min_valid: usize,
) -> Result<SignalSeries> {
    let required = min_valid.max(1);
    if values.len() < required {
        return Err(SpectralError::InsufficientData { valid: values.len(), required });
    }

    let sos = butter_highpass(filter.cutoff_hz, sample_rate, filter.order);
    let filtered = sosfiltfilt(&sos, &values);
    debug!(
        "high-pass {} Hz order {} ({} sections) over {} samples",
        filter.cutoff_hz, filter.order, sos.len(), filtered.len()
    );
    SignalSeries::new(filtered, sample_rate)
}
