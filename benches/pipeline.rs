use std::f64::consts::PI;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use eegspec::{run, sosfiltfilt, butter_highpass, PipelineConfig, WelchConfig, WelchEstimator};
use ndarray::Array1;

const FS: f64 = 256.0;

/// 10 minutes of alpha + drift at 256 Hz.
fn recording() -> Vec<f64> {
    (0..(600.0 * FS) as usize)
        .map(|i| {
            let t = i as f64 / FS;
            (2.0 * PI * 10.0 * t).sin() + 0.3 * (2.0 * PI * 22.0 * t).sin() + 0.05 * t
        })
        .collect()
}

fn bench_highpass(c: &mut Criterion) {
    let x = recording();
    let sos = butter_highpass(0.5, FS, 4);
    c.bench_function("sosfiltfilt order 4 [153600 samples]", |b| {
        b.iter(|| black_box(sosfiltfilt(&sos, black_box(&x))).len())
    });
}

fn bench_welch(c: &mut Criterion) {
    let est = WelchEstimator::new(512, FS, &WelchConfig::default()).unwrap();
    let epoch = Array1::from_shape_fn(512, |i| (2.0 * PI * 10.0 * i as f64 / FS).sin());
    c.bench_function("welch 2 s epoch", |b| {
        b.iter(|| black_box(est.estimate_samples(black_box(epoch.view()))).len())
    });
}

fn bench_run(c: &mut Criterion) {
    let cells: Vec<String> = recording().iter().map(|v| v.to_string()).collect();
    let cfg = PipelineConfig::default();
    c.bench_function("run 10 min @ 256 Hz", |b| {
        b.iter(|| black_box(run(black_box(&cells), &cfg).unwrap()).records.len())
    });
}

criterion_group!(benches, bench_highpass, bench_welch, bench_run);
criterion_main!(benches);
