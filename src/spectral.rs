//! Welch power spectral density per epoch.
//!
//! Matches `scipy.signal.welch(x, fs, window, nperseg, noverlap, nfft=len(x),
//! detrend='constant', scaling='density')`:
//!
//! 1. Cut the epoch into sub-windows of `nperseg` samples, `noverlap` shared.
//! 2. Divide by the epoch's peak magnitude, remove each sub-window's mean and
//!    apply a periodic taper.
//! 3. Zero-pad to `nfft` = epoch length, FFT, take `|X|²`.
//! 4. Average over sub-windows, scale by `1 / (fs · Σw²)`, fold to one side,
//!    then multiply back by `peak²`.
//!
//! Because `nfft` is the epoch length, the grid is `k · fs / nfft` for
//! `k = 0..=nfft/2` and depends only on epoch length and sample rate.
use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::ArrayView1;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::config::WelchConfig;
use crate::epoch::Epoch;
use crate::error::{Result, SpectralError};

/// Shortest Welch sub-window, in samples.
pub const MIN_SEGMENT_SAMPLES: usize = 8;

/// Taper applied to each Welch sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Hann,
    Hamming,
}

/// Periodic (DFT-even) window of length `n`.
pub fn window(kind: WindowKind, n: usize) -> Vec<f64> {
    match kind {
        WindowKind::Hann => hann(n),
        WindowKind::Hamming => hamming(n),
    }
}

/// Periodic Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f64> {
    cosine_window(n, 0.5, 0.5)
}

/// Periodic Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    cosine_window(n, 0.54, 0.46)
}

fn cosine_window(n: usize, a0: f64, a1: f64) -> Vec<f64> {
    (0..n)
        .map(|i| a0 - a1 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// One-sided PSD of one epoch.
///
/// `frequencies` rise strictly from 0 Hz in steps of `sample_rate / nfft`;
/// `power` is non-negative, in signal units² / Hz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsdCurve {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

impl PsdCurve {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Bin spacing in Hz (`0.0` for fewer than two bins).
    pub fn resolution(&self) -> f64 {
        match self.frequencies.as_slice() {
            [f0, f1, ..] => f1 - f0,
            _ => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies.iter().copied().zip(self.power.iter().copied())
    }

    /// Multiply every bin by `gain`.  Zero bins stay zero even for an
    /// infinite gain.
    pub fn scaled(self, gain: f64) -> Self {
        if gain == 1.0 {
            return self;
        }
        let power = self
            .power
            .into_iter()
            .map(|p| if p == 0.0 { 0.0 } else { p * gain })
            .collect();
        Self { frequencies: self.frequencies, power }
    }
}

/// Welch estimator planned once per run and shared across epochs.
pub struct WelchEstimator {
    sample_rate: f64,
    nfft: usize,
    nperseg: usize,
    step: usize,
    taper: Vec<f64>,
    scale: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for WelchEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WelchEstimator")
            .field("sample_rate", &self.sample_rate)
            .field("nfft", &self.nfft)
            .field("nperseg", &self.nperseg)
            .field("step", &self.step)
            .finish()
    }
}

impl WelchEstimator {
    /// Plan an estimator for epochs of `epoch_samples` samples.
    pub fn new(epoch_samples: usize, sample_rate: f64, cfg: &WelchConfig) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SpectralError::InvalidConfig(format!(
                "sample rate {sample_rate} Hz must be positive"
            )));
        }
        cfg.validate(epoch_samples)?;

        let nperseg = cfg.segment_samples(epoch_samples);
        let noverlap = cfg.overlap_samples(epoch_samples);
        let taper = window(cfg.window, nperseg);
        let win_energy: f64 = taper.iter().map(|w| w * w).sum();

        let mut planner = FftPlanner::<f64>::new();
        Ok(Self {
            sample_rate,
            nfft: epoch_samples,
            nperseg,
            step: nperseg - noverlap,
            taper,
            scale: 1.0 / (sample_rate * win_energy),
            fft: planner.plan_fft_forward(epoch_samples),
        })
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    pub fn segment_len(&self) -> usize {
        self.nperseg
    }

    /// Number of sub-windows averaged per epoch.
    pub fn n_segments(&self) -> usize {
        (self.nfft - self.nperseg) / self.step + 1
    }

    /// Number of one-sided frequency bins.
    pub fn n_bins(&self) -> usize {
        self.nfft / 2 + 1
    }

    pub fn resolution(&self) -> f64 {
        self.sample_rate / self.nfft as f64
    }

    /// PSD of a complete epoch.
    ///
    /// # Errors
    ///
    /// [`SpectralError::InsufficientData`] if the epoch is not full length.
    pub fn estimate(&self, epoch: &Epoch<'_>) -> Result<PsdCurve> {
        let (unit, gain) = self.estimate_normalized(epoch)?;
        Ok(unit.scaled(gain))
    }

    /// PSD of the epoch divided by its peak magnitude, plus the power gain
    /// (`peak²`) that restores absolute units.
    ///
    /// The unit-peak curve stays finite for any finite input, so scale-free
    /// features can be taken from it even when `peak²` overflows.
    pub fn estimate_normalized(&self, epoch: &Epoch<'_>) -> Result<(PsdCurve, f64)> {
        if epoch.len() != self.nfft {
            return Err(SpectralError::InsufficientData {
                valid: epoch.len(),
                required: self.nfft,
            });
        }
        Ok(self.normalized_samples(epoch.samples))
    }

    /// PSD of exactly `nfft` samples.  Panics on any other length.
    pub fn estimate_samples(&self, x: ArrayView1<'_, f64>) -> PsdCurve {
        let (unit, gain) = self.normalized_samples(x);
        unit.scaled(gain)
    }

    fn normalized_samples(&self, x: ArrayView1<'_, f64>) -> (PsdCurve, f64) {
        assert_eq!(x.len(), self.nfft, "welch input length must equal nfft");
        let peak = x.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let peak = if peak > 0.0 && peak.is_finite() { peak } else { 1.0 };
        let n_bins = self.n_bins();
        let n_seg = self.n_segments();

        let mut acc = vec![0.0_f64; n_bins];
        let mut buf = vec![Complex::<f64>::default(); self.nfft];

        for seg in 0..n_seg {
            let start = seg * self.step;
            let chunk = x.slice(ndarray::s![start..start + self.nperseg]);
            let mean = chunk.iter().map(|v| v / peak).sum::<f64>() / self.nperseg as f64;

            buf.iter_mut().for_each(|b| *b = Complex::default());
            for ((b, &v), &w) in buf.iter_mut().zip(chunk.iter()).zip(self.taper.iter()) {
                b.re = (v / peak - mean) * w;
            }
            self.fft.process(&mut buf);

            for (a, c) in acc.iter_mut().zip(buf.iter()) {
                *a += c.norm_sqr();
            }
        }

        // One-sided: double everything but DC and (for even nfft) Nyquist.
        let last_doubled = if self.nfft % 2 == 0 { n_bins - 1 } else { n_bins };
        let norm = self.scale / n_seg as f64;
        let power: Vec<f64> = acc
            .iter()
            .enumerate()
            .map(|(k, &p)| {
                let fold = if k > 0 && k < last_doubled { 2.0 } else { 1.0 };
                p * norm * fold
            })
            .collect();

        let df = self.resolution();
        let frequencies = (0..n_bins).map(|k| k as f64 * df).collect();
        (PsdCurve { frequencies, power }, peak * peak)
    }
}

/// One-off estimate for a single epoch.  Prefer [`WelchEstimator`] when
/// processing many epochs: it plans the FFT once.
pub fn estimate(epoch: &Epoch<'_>, sample_rate: f64, cfg: &WelchConfig) -> Result<PsdCurve> {
    WelchEstimator::new(epoch.nominal_len, sample_rate, cfg)?.estimate(epoch)
}
