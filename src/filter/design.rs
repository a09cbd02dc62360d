//! Butterworth high-pass design as cascaded second-order sections.
//!
//! For a high-pass at `cutoff` Hz, order `N`, sampling rate `sfreq`:
//!   • prewarped corner  K = tan(π · cutoff / sfreq)
//!   • analog pole pairs  s² + 2·sin(θₖ)·s + 1,  θₖ = π(2k+1) / 2N
//!   • low-pass → high-pass  s → ωc / s,  then bilinear transform per section
//!   • odd N adds one first-order section for the real pole
use std::f64::consts::PI;

/// Highest supported filter order.
pub const MAX_FILTER_ORDER: usize = 12;

/// One second-order section.
///
/// `H(z) = (b0 + b1·z⁻¹ + b2·z⁻²) / (1 + a1·z⁻¹ + a2·z⁻²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    /// Gain at DC (`z = 1`).
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Magnitude response at `freq` Hz.
    pub fn magnitude_at(&self, freq: f64, sfreq: f64) -> f64 {
        let w = 2.0 * PI * freq / sfreq;
        // Evaluate numerator and denominator at z⁻¹ = e^{-jw}.
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = self.b1 * s1 + self.b2 * s2;
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = self.a1 * s1 + self.a2 * s2;
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }

    /// `true` when both poles lie strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// Design an order-`order` Butterworth high-pass at `cutoff` Hz.
///
/// The caller validates `0 < cutoff < sfreq / 2` and `1 <= order <= MAX_FILTER_ORDER`
/// (see [`crate::FilterSpec::validate`]).  Sections are returned highest-Q first.
pub fn butter_highpass(cutoff: f64, sfreq: f64, order: usize) -> Vec<Biquad> {
    let k = (PI * cutoff / sfreq).tan();
    let k2 = k * k;
    let n_pairs = order / 2;

    let mut sections = Vec::with_capacity(order.div_ceil(2));
    for i in 0..n_pairs {
        let theta = PI * (2 * i + 1) as f64 / (2 * order) as f64;
        let d = 2.0 * theta.sin();
        let norm = 1.0 / (1.0 + d * k + k2);
        sections.push(Biquad {
            b0: norm,
            b1: -2.0 * norm,
            b2: norm,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - d * k + k2) * norm,
        });
    }

    if order % 2 == 1 {
        let norm = 1.0 / (1.0 + k);
        sections.push(Biquad {
            b0: norm,
            b1: -norm,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
        });
    }
    sections
}

/// Magnitude response of a cascade at `freq` Hz.
pub fn sos_magnitude_at(sos: &[Biquad], freq: f64, sfreq: f64) -> f64 {
    sos.iter().map(|s| s.magnitude_at(freq, sfreq)).product()
}
