//! Orchestration: condition → segment → (PSD → features) per epoch.
//!
//! Run-level failures (bad configuration, too little data) abort before any
//! record exists.  Per-epoch problems never do: a short trailing epoch or a
//! zero-power epoch gets a record with an explicit status and no feature
//! values, and processing continues.
//!
//! Epochs are independent, so the per-epoch stage runs on the rayon pool.
//! Work is split into ordered chunks of `4 × threads` epochs; results are
//! reassembled in epoch order.  Between chunks the time budget is checked and
//! progress is reported.
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::condition::{condition, condition_samples, ConditionReport, Conditioned, SignalSeries};
use crate::config::PipelineConfig;
use crate::epoch::{epoch_count, segment, Epoch, EpochStatus};
use crate::error::Result;
use crate::features::{band_powers, extract, BandPowers};
use crate::spectral::{PsdCurve, WelchEstimator};

/// Outcome of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// MF, SEF95 and band powers are present.
    Analyzed,
    /// Trailing epoch shorter than the epoch length; not analysed.
    Insufficient,
    /// The epoch had no power above DC; features are undefined.
    EmptySpectrum,
}

/// Features of one epoch.  Feature fields are `None` unless
/// `status == Analyzed`; they are never reported as zero in place of absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub epoch_index: usize,
    pub channel: String,
    /// Epoch start in seconds from the first valid sample.
    pub start_s: f64,
    /// Samples actually present in the epoch.
    pub n_samples: usize,
    pub status: RecordStatus,
    pub mf_hz: Option<f64>,
    pub sef95_hz: Option<f64>,
    pub bands: Option<BandPowers>,
}

impl FeatureRecord {
    fn unavailable(epoch: &Epoch<'_>, channel: &str, sample_rate: f64, status: RecordStatus) -> Self {
        Self {
            epoch_index: epoch.index,
            channel: channel.to_string(),
            start_s: epoch.start_s(sample_rate),
            n_samples: epoch.len(),
            status,
            mf_hz: None,
            sef95_hz: None,
            bands: None,
        }
    }
}

/// Everything a run hands to the export / viewer collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub channel: String,
    /// One record per processed epoch, in epoch order.
    pub records: Vec<FeatureRecord>,
    /// Viewer mode only: `curves[i]` belongs to `records[i]`
    /// (`None` for insufficient epochs).  Empty in lean mode.
    pub curves: Vec<Option<PsdCurve>>,
    pub conditioning: ConditionReport,
    /// Epochs derivable from the conditioned signal, `⌈N / epoch_len⌉`.
    pub epochs_total: usize,
    /// A run limit stopped processing before `epochs_total` was reached.
    pub truncated: bool,
}

impl PipelineOutput {
    pub fn analyzed_count(&self) -> usize {
        self.count(RecordStatus::Analyzed)
    }

    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// A conditioned recording, ready for per-epoch analysis.
///
/// Holding on to an `Analysis` lets a viewer re-derive any epoch's PSD on
/// demand with [`Analysis::psd`] instead of keeping every curve in memory.
#[derive(Debug)]
pub struct Analysis {
    channel: String,
    config: PipelineConfig,
    series: SignalSeries,
    report: ConditionReport,
    estimator: WelchEstimator,
}

impl Analysis {
    /// Validate `config`, then condition a raw column of cells.
    pub fn prepare<S: AsRef<str>>(
        channel: impl Into<String>,
        cells: &[S],
        config: &PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let conditioned = condition(cells, config.sample_rate, &config.filter, config.min_valid_samples())?;
        Self::from_conditioned(channel.into(), conditioned, config)
    }

    /// Validate `config`, then condition numeric samples.
    pub fn from_samples(
        channel: impl Into<String>,
        samples: &[f64],
        config: &PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let conditioned =
            condition_samples(samples, config.sample_rate, &config.filter, config.min_valid_samples())?;
        Self::from_conditioned(channel.into(), conditioned, config)
    }

    fn from_conditioned(channel: String, conditioned: Conditioned, config: &PipelineConfig) -> Result<Self> {
        let estimator = WelchEstimator::new(config.epoch_samples(), config.sample_rate, &config.welch)?;
        debug!(
            "{channel}: {} samples, epoch {} samples, welch {}×{} (nfft {})",
            conditioned.series.len(),
            estimator.nfft(),
            estimator.n_segments(),
            estimator.segment_len(),
            estimator.nfft(),
        );
        if config.epoch_dur < 1.0 / config.filter.cutoff_hz {
            warn!(
                "epoch ({} s) is shorter than the high-pass period ({:.3} s); \
                 lowest frequency bins carry filter settling error",
                config.epoch_dur,
                1.0 / config.filter.cutoff_hz
            );
        }
        Ok(Self {
            channel,
            config: config.clone(),
            series: conditioned.series,
            report: conditioned.report,
            estimator,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn series(&self) -> &SignalSeries {
        &self.series
    }

    pub fn report(&self) -> ConditionReport {
        self.report
    }

    pub fn epoch_count(&self) -> usize {
        epoch_count(self.series.len(), self.estimator.nfft())
    }

    pub fn epochs(&self) -> Result<Vec<Epoch<'_>>> {
        segment(&self.series, self.config.epoch_dur)
    }

    /// Re-derive one epoch's PSD.  `None` if the index is out of range or
    /// the epoch is insufficient.
    pub fn psd(&self, epoch_index: usize) -> Option<PsdCurve> {
        let epochs = self.epochs().ok()?;
        let epoch = epochs.get(epoch_index)?;
        self.estimator.estimate(epoch).ok()
    }

    /// Run the per-epoch stage over every epoch, honouring
    /// [`crate::RunLimits`].
    pub fn run(&self) -> Result<PipelineOutput> {
        self.run_with_progress(|_, _| {})
    }

    /// Same as [`Analysis::run`], calling `progress(done, total)` after each
    /// chunk of epochs.  `done` rises strictly; `total` is the number of
    /// epochs scheduled after `max_epochs` is applied.
    pub fn run_with_progress<F>(&self, mut progress: F) -> Result<PipelineOutput>
    where
        F: FnMut(usize, usize),
    {
        let mut epochs = self.epochs()?;
        let epochs_total = epochs.len();
        let mut truncated = false;

        if let Some(max) = self.config.limits.max_epochs {
            if epochs.len() > max {
                epochs.truncate(max);
                truncated = true;
            }
        }

        let deadline = self
            .config
            .limits
            .time_budget_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let chunk_len = (rayon::current_num_threads() * 4).max(1);

        let mut processed: Vec<(FeatureRecord, Option<PsdCurve>)> = Vec::with_capacity(epochs.len());
        for chunk in epochs.chunks(chunk_len) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    "{}: time budget exhausted after {} of {} epochs",
                    self.channel,
                    processed.len(),
                    epochs_total
                );
                truncated = true;
                break;
            }
            let done: Vec<_> = chunk
                .par_iter()
                .map(|e| self.process_epoch(e))
                .collect::<Result<_>>()?;
            processed.extend(done);
            progress(processed.len(), epochs.len());
        }

        let (records, curves): (Vec<_>, Vec<_>) = processed.into_iter().unzip();
        let curves = if self.config.retain_psd { curves } else { Vec::new() };

        let output = PipelineOutput {
            channel: self.channel.clone(),
            records,
            curves,
            conditioning: self.report,
            epochs_total,
            truncated,
        };
        info!(
            "{}: {} of {} epochs analysed ({} insufficient, {} empty){}",
            output.channel,
            output.analyzed_count(),
            epochs_total,
            output.count(RecordStatus::Insufficient),
            output.count(RecordStatus::EmptySpectrum),
            if truncated { ", truncated" } else { "" },
        );
        Ok(output)
    }

    fn process_epoch(&self, epoch: &Epoch<'_>) -> Result<(FeatureRecord, Option<PsdCurve>)> {
        let fs = self.config.sample_rate;
        if epoch.status == EpochStatus::Insufficient {
            debug!(
                "{}: epoch {} has {} of {} samples",
                self.channel, epoch.index, epoch.len(), epoch.nominal_len
            );
            let rec = FeatureRecord::unavailable(epoch, &self.channel, fs, RecordStatus::Insufficient);
            return Ok((rec, None));
        }

        // MF / SEF95 are scale-free; `peak²` may overflow.
        let (unit, gain) = self.estimator.estimate_normalized(epoch)?;
        let record = match extract(&unit) {
            Ok(feats) => FeatureRecord {
                epoch_index: epoch.index,
                channel: self.channel.clone(),
                start_s: epoch.start_s(fs),
                n_samples: epoch.len(),
                status: RecordStatus::Analyzed,
                mf_hz: Some(feats.mf),
                sef95_hz: Some(feats.sef95),
                bands: Some(
                    band_powers(&unit, self.config.lower_bound, self.config.upper_bound).scaled(gain),
                ),
            },
            Err(e) if e.is_per_epoch() => {
                warn!("{}: epoch {}: {e}", self.channel, epoch.index);
                FeatureRecord::unavailable(epoch, &self.channel, fs, RecordStatus::EmptySpectrum)
            }
            Err(e) => return Err(e),
        };
        let curve = self.config.retain_psd.then(|| unit.scaled(gain));
        Ok((record, curve))
    }
}

/// Run the whole pipeline on one raw column of cells.
///
/// The channel label on every record is the configured selector.
pub fn run<S: AsRef<str>>(raw_column: &[S], config: &PipelineConfig) -> Result<PipelineOutput> {
    Analysis::prepare(config.channel.to_string(), raw_column, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpectralError;
    use std::f64::consts::PI;

    fn sine_cells(n: usize, freq: f64, fs: f64) -> Vec<String> {
        (0..n)
            .map(|i| format!("{}", 20.0 + (2.0 * PI * freq * i as f64 / fs).sin()))
            .collect()
    }

    #[test]
    fn one_record_per_epoch_including_partial() {
        let cfg = PipelineConfig::default();
        let out = run(&sine_cells(1300, 10.0, 256.0), &cfg).unwrap();
        assert_eq!(out.epochs_total, 3);
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[2].status, RecordStatus::Insufficient);
        assert_eq!(out.records[2].n_samples, 1300 - 1024);
        assert!(out.records[2].mf_hz.is_none());
        assert!(out.curves.is_empty());
        assert!(!out.truncated);
    }

    #[test]
    fn invalid_config_fails_before_data() {
        let cfg = PipelineConfig { epoch_dur: 0.0, ..Default::default() };
        let err = run(&sine_cells(1024, 10.0, 256.0), &cfg).unwrap_err();
        assert!(matches!(err, SpectralError::InvalidEpochDuration(_)));
    }

    #[test]
    fn flat_signal_gives_empty_spectrum_records() {
        let cells = vec!["5.0"; 1024];
        let out = run(&cells, &PipelineConfig::default()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert!(out.records.iter().all(|r| r.status == RecordStatus::EmptySpectrum));
        assert!(out.records.iter().all(|r| r.mf_hz.is_none() && r.bands.is_none()));
    }

    #[test]
    fn retained_curves_align_with_records() {
        let cfg = PipelineConfig { retain_psd: true, ..Default::default() };
        let analysis = Analysis::prepare("Cz", &sine_cells(1100, 10.0, 256.0), &cfg).unwrap();
        let out = analysis.run().unwrap();
        assert_eq!(out.curves.len(), out.records.len());
        assert!(out.curves[0].is_some());
        assert!(out.curves[2].is_none());
        assert_eq!(out.records[0].channel, "Cz");
        // On-demand re-derivation matches the retained curve.
        assert_eq!(analysis.psd(1).as_ref(), out.curves[1].as_ref());
        assert!(analysis.psd(2).is_none());
        assert!(analysis.psd(99).is_none());
    }

    #[test]
    fn max_epochs_truncates_in_order() {
        let cfg = PipelineConfig {
            limits: crate::RunLimits { max_epochs: Some(2), time_budget_ms: None },
            ..Default::default()
        };
        let out = run(&sine_cells(512 * 5, 10.0, 256.0), &cfg).unwrap();
        assert!(out.truncated);
        assert_eq!(out.epochs_total, 5);
        let idx: Vec<usize> = out.records.iter().map(|r| r.epoch_index).collect();
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn huge_finite_amplitude_is_analyzed() {
        let cells: Vec<String> = (0..1024)
            .map(|i| format!("{:e}", 1e200 * (2.0 * PI * 10.0 * i as f64 / 256.0).sin()))
            .collect();
        let out = run(&cells, &PipelineConfig::default()).unwrap();
        assert_eq!(out.records.len(), 2);
        for r in &out.records {
            assert_eq!(r.status, RecordStatus::Analyzed);
            let (mf, sef) = (r.mf_hz.unwrap(), r.sef95_hz.unwrap());
            assert!((9.0..=11.0).contains(&mf) && (9.0..=11.0).contains(&sef), "{r:?}");
        }
    }

    #[test]
    fn progress_rises_to_record_count() {
        let cells = sine_cells(512 * 40 + 7, 10.0, 256.0);
        let analysis = Analysis::prepare("Cz", &cells, &PipelineConfig::default()).unwrap();
        let mut seen = Vec::new();
        let out = analysis.run_with_progress(|done, total| seen.push((done, total))).unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(seen.iter().all(|&(_, total)| total == 41));
        assert_eq!(seen.last().unwrap().0, out.records.len());
    }

    #[test]
    fn zero_time_budget_stops_cleanly() {
        let cfg = PipelineConfig {
            limits: crate::RunLimits { max_epochs: None, time_budget_ms: Some(0) },
            ..Default::default()
        };
        let out = run(&sine_cells(512 * 4, 10.0, 256.0), &cfg).unwrap();
        assert!(out.truncated);
        assert!(out.records.is_empty());
        assert_eq!(out.epochs_total, 4);
    }
}
