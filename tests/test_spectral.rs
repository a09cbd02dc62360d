mod common;
use common::{noise, sine};
use eegspec::{estimate, segment, SignalSeries, WelchConfig, WelchEstimator, WindowKind};

#[test]
fn bin_spacing_never_grows_with_epoch_duration() {
    let mut prev = f64::INFINITY;
    for dur in [0.25, 0.5, 1.0, 1.5, 2.0, 4.0, 8.0] {
        let n = (dur * 256.0_f64).round() as usize;
        let est = WelchEstimator::new(n, 256.0, &WelchConfig::default()).unwrap();
        let df = est.resolution();
        assert!(df <= prev, "dur={dur}: {df} > {prev}");
        approx::assert_abs_diff_eq!(df, 256.0 / n as f64, epsilon = 1e-12);
        prev = df;
    }
}

#[test]
fn every_epoch_shares_one_grid() {
    let x = sine(256 * 10, 6.0, 1.0, 0.0, 256.0);
    let series = SignalSeries::new(x, 256.0).unwrap();
    let epochs = segment(&series, 2.0).unwrap();
    let est = WelchEstimator::new(512, 256.0, &WelchConfig::default()).unwrap();
    let grids: Vec<Vec<f64>> = epochs.iter().map(|e| est.estimate(e).unwrap().frequencies).collect();
    assert_eq!(grids.len(), 5);
    assert!(grids.windows(2).all(|w| w[0] == w[1]));
    approx::assert_abs_diff_eq!(grids[0][1], 0.5);
    approx::assert_abs_diff_eq!(*grids[0].last().unwrap(), 128.0);
}

#[test]
fn white_noise_power_matches_variance() {
    // Uniform noise on [-1, 1) has variance 1/3.
    let x = noise(2048, 42);
    let series = SignalSeries::new(x, 256.0).unwrap();
    let epochs = segment(&series, 8.0).unwrap();
    for kind in [WindowKind::Hann, WindowKind::Hamming] {
        let cfg = WelchConfig { window: kind, ..Default::default() };
        let psd = estimate(&epochs[0], 256.0, &cfg).unwrap();
        let total: f64 = psd.power.iter().sum::<f64>() * psd.resolution();
        approx::assert_relative_eq!(total, 1.0 / 3.0, max_relative = 0.15);
    }
}

#[test]
fn short_epoch_is_rejected_by_estimate() {
    let series = SignalSeries::new(vec![0.0; 600], 256.0).unwrap();
    let epochs = segment(&series, 2.0).unwrap();
    assert!(epochs[1].len() < 512);
    let err = estimate(&epochs[1], 256.0, &WelchConfig::default()).unwrap_err();
    assert_eq!(err, eegspec::SpectralError::InsufficientData { valid: 88, required: 512 });
}

#[test]
fn too_short_for_welch_windows() {
    // 12-sample epoch halves to 6-sample windows.
    let err = WelchEstimator::new(12, 256.0, &WelchConfig::default()).unwrap_err();
    assert!(matches!(err, eegspec::SpectralError::InvalidEpochDuration(_)));
}
