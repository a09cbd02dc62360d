//! High-pass filter design and application.
//!
//! - [`design`]: Butterworth high-pass as cascaded second-order sections
//!   (bilinear transform with prewarping).
//! - [`apply`]: zero-phase forward-backward filtering, matching
//!   `scipy.signal.sosfiltfilt`.

pub mod apply;
pub mod design;

pub use apply::{default_padlen, sos_steady_state, sosfilt, sosfiltfilt};
pub use design::{butter_highpass, sos_magnitude_at, Biquad, MAX_FILTER_ORDER};
