/// Shared helpers: synthetic signals and temp CSV files.
use std::f64::consts::PI;
use std::path::PathBuf;

#[allow(unused)]
/// `amp · sin(2π·freq·t) + dc`, `n` samples at `fs` Hz.
pub fn sine(n: usize, freq: f64, amp: f64, dc: f64, fs: f64) -> Vec<f64> {
    (0..n)
        .map(|i| amp * (2.0 * PI * freq * i as f64 / fs).sin() + dc)
        .collect()
}

#[allow(unused)]
/// Element-wise sum of equally long signals.
pub fn mix(parts: &[Vec<f64>]) -> Vec<f64> {
    let n = parts[0].len();
    (0..n).map(|i| parts.iter().map(|p| p[i]).sum()).collect()
}

#[allow(unused)]
/// Deterministic uniform noise in [-1, 1) (64-bit LCG).
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}

#[allow(unused)]
pub fn to_cells(x: &[f64]) -> Vec<String> {
    x.iter().map(|v| v.to_string()).collect()
}

#[allow(unused)]
/// Write `header` and `rows` as a comma-separated file inside `dir`.
pub fn write_csv(dir: &tempfile::TempDir, name: &str, header: &str, rows: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    let mut text = String::from(header);
    text.push('\n');
    for r in rows {
        text.push_str(r);
        text.push('\n');
    }
    std::fs::write(&path, text).unwrap();
    path
}
