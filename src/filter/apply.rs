//! Zero-phase second-order-section filtering.
//!
//! Matches `scipy.signal.sosfiltfilt` with default odd padding:
//! the signal is extended by odd reflection, run forward through the cascade,
//! reversed, run forward again and reversed back.  Each pass starts from the
//! cascade's steady state scaled by the first sample, so a DC offset does not
//! ring through the output.
use super::design::Biquad;

/// Forward-backward filter a single 1-D signal.
///
/// Returns a vector of the same length as `x`.
pub fn sosfiltfilt(sos: &[Biquad], x: &[f64]) -> Vec<f64> {
    let n_x = x.len();
    if n_x == 0 || sos.is_empty() {
        return x.to_vec();
    }

    let n_edge = default_padlen(sos.len()).min(n_x - 1);
    let x_ext = odd_reflect_pad(x, n_edge);
    let zi = sos_steady_state(sos);

    let mut y = sosfilt(sos, &x_ext, &scaled(&zi, x_ext[0]));
    y.reverse();
    let y0 = y[0];
    let mut y = sosfilt(sos, &y, &scaled(&zi, y0));
    y.reverse();

    y[n_edge..n_edge + n_x].to_vec()
}

/// Run `x` once through the cascade (Direct Form II transposed), starting
/// from per-section state `zi`.
pub fn sosfilt(sos: &[Biquad], x: &[f64], zi: &[[f64; 2]]) -> Vec<f64> {
    let mut state: Vec<[f64; 2]> = zi.to_vec();
    state.resize(sos.len(), [0.0; 2]);

    x.iter()
        .map(|&v| {
            let mut out = v;
            for (s, z) in sos.iter().zip(state.iter_mut()) {
                let input = out;
                out = s.b0 * input + z[0];
                z[0] = s.b1 * input - s.a1 * out + z[1];
                z[1] = s.b2 * input - s.a2 * out;
            }
            out
        })
        .collect()
}

/// Per-section state reached after an infinitely long unit step.
///
/// Matches `scipy.signal.sosfilt_zi`: section `j` sees a constant input equal
/// to the product of the DC gains of sections `0..j`.
pub fn sos_steady_state(sos: &[Biquad]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sos.iter()
        .map(|s| {
            let g = s.dc_gain();
            let z1 = (s.b1 + s.b2 - (s.a1 + s.a2) * g) * scale;
            let z2 = (s.b2 - s.a2 * g) * scale;
            scale *= g;
            [z1, z2]
        })
        .collect()
}

/// Edge padding used by `sosfiltfilt`: three times the equivalent tap count.
pub fn default_padlen(n_sections: usize) -> usize {
    3 * (2 * n_sections + 1)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn scaled(zi: &[[f64; 2]], by: f64) -> Vec<[f64; 2]> {
    zi.iter().map(|z| [z[0] * by, z[1] * by]).collect()
}

/// Odd reflection about both end samples.
///
/// Left:  `pad[i] = 2*x[0] - x[n-i]`  for i in 1..=n
/// Right: `pad[i] = 2*x[-1] - x[-(i+1)]` for i in 1..=n
///
/// `n` must be smaller than `x.len()`.
fn odd_reflect_pad(x: &[f64], n: usize) -> Vec<f64> {
    let len = x.len();
    let mut out = Vec::with_capacity(len + 2 * n);

    for i in (1..=n).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    let last = x[len - 1];
    for i in 1..=n {
        out.push(2.0 * last - x[len - 1 - i]);
    }
    out
}
