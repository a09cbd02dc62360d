//! Scalar features of a PSD curve.
//!
//! Edge frequencies come from the cumulative power fraction
//! `c[k] = Σ_{1≤i≤k} P[i] / Σ_{i≥1} P[i]`.  The DC bin (`k = 0`) is kept in the
//! curve but left out of the sum: after high-pass filtering it only holds
//! residual offset.  `c[0]` is taken as 0.
//!
//! The frequency where `c` first reaches a fraction `q` is interpolated
//! linearly between the bin just below and the first bin at or above `q`.
//! A bin that hits `q` exactly returns its own frequency.
use serde::Serialize;

use crate::error::{Result, SpectralError};
use crate::spectral::PsdCurve;

pub const MEDIAN_FRACTION: f64 = 0.50;
pub const SEF95_FRACTION: f64 = 0.95;

/// Median frequency and 95 % spectral edge frequency, in Hz.
///
/// `mf <= sef95 <= nyquist` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralFeatures {
    pub mf: f64,
    pub sef95: f64,
}

/// Compute MF and SEF95.
///
/// # Errors
///
/// [`SpectralError::EmptySpectrum`] if the curve has no power above DC.
pub fn extract(curve: &PsdCurve) -> Result<SpectralFeatures> {
    let cum = cumulative_fraction(curve)?;
    Ok(SpectralFeatures {
        mf: crossing(curve, &cum, MEDIAN_FRACTION),
        sef95: crossing(curve, &cum, SEF95_FRACTION),
    })
}

/// Frequency below which `fraction` of the (non-DC) power lies.
///
/// `fraction` must be in `(0, 1]`.
pub fn edge_frequency(curve: &PsdCurve, fraction: f64) -> Result<f64> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(SpectralError::InvalidConfig(format!(
            "edge fraction {fraction} outside (0, 1]"
        )));
    }
    let cum = cumulative_fraction(curve)?;
    Ok(crossing(curve, &cum, fraction))
}

/// Normalised cumulative power per bin, DC excluded (`c[0] = 0`).
pub fn cumulative_fraction(curve: &PsdCurve) -> Result<Vec<f64>> {
    if curve.len() < 2 {
        return Err(SpectralError::EmptySpectrum);
    }
    let total: f64 = curve.power[1..].iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SpectralError::EmptySpectrum);
    }

    let mut running = 0.0;
    let mut cum = Vec::with_capacity(curve.len());
    cum.push(0.0);
    for &p in &curve.power[1..] {
        running += p;
        cum.push(running / total);
    }
    Ok(cum)
}

fn crossing(curve: &PsdCurve, cum: &[f64], q: f64) -> f64 {
    let f = &curve.frequencies;
    // c[0] = 0 < q, so the first hit is at k >= 1; rounding can leave the
    // last bin a hair under 1.0.
    let k = match cum.iter().position(|&c| c >= q) {
        Some(k) => k,
        None => return f[f.len() - 1],
    };
    let (c_lo, c_hi) = (cum[k - 1], cum[k]);
    let t = (q - c_lo) / (c_hi - c_lo);
    f[k - 1] + t * (f[k] - f[k - 1])
}

/// Classic EEG frequency bands, half-open `[lo, hi)` in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta];

    pub fn range(self) -> (f64, f64) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
        }
    }
}

/// Absolute band powers (units² of the input), integrated as
/// `Σ P[k] · Δf` over bins in each band, clipped to `[lower, upper)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Power over the whole `[lower, upper)` range.
    pub total: f64,
}

impl BandPowers {
    /// Multiply every band by `gain`.  Zero bands stay zero.
    pub fn scaled(self, gain: f64) -> Self {
        let m = |v: f64| if v == 0.0 { 0.0 } else { v * gain };
        Self {
            delta: m(self.delta),
            theta: m(self.theta),
            alpha: m(self.alpha),
            beta: m(self.beta),
            total: m(self.total),
        }
    }

    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
        }
    }
}

/// Integrate band powers over `[lower, upper)` Hz.  The DC bin never counts.
pub fn band_powers(curve: &PsdCurve, lower: f64, upper: f64) -> BandPowers {
    let df = curve.resolution();
    let sum_in = |lo: f64, hi: f64| -> f64 {
        let (lo, hi) = (lo.max(lower), hi.min(upper));
        curve
            .iter()
            .skip(1)
            .filter(|&(f, _)| f >= lo && f < hi)
            .map(|(_, p)| p)
            .sum::<f64>()
            * df
    };

    let [delta, theta, alpha, beta] = Band::ALL.map(|b| {
        let (lo, hi) = b.range();
        sum_in(lo, hi)
    });
    BandPowers { delta, theta, alpha, beta, total: sum_in(lower, upper) }
}
