//! Periodic (DFT-even) analysis windows, as `scipy.signal.get_window` builds
//! them for spectral estimation (`sym=False`).
use std::f64::consts::PI;

/// Periodic Hann window of length `n`.
pub fn hann_periodic(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n).map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos()).collect()
}

/// Symmetric Tukey (tapered cosine) window with taper fraction `alpha`.
///
/// `alpha <= 0` is rectangular, `alpha >= 1` is a symmetric Hann window.
pub fn tukey_symmetric(m: usize, alpha: f64) -> Vec<f64> {
    if m <= 1 {
        return vec![1.0; m];
    }
    let mf = (m - 1) as f64;
    if alpha <= 0.0 {
        return vec![1.0; m];
    }
    if alpha >= 1.0 {
        return (0..m).map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / mf).cos()).collect();
    }
    let width = (alpha * mf / 2.0).floor() as usize;
    (0..m)
        .map(|i| {
            let n = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * n / alpha / mf)).cos())
            } else if i >= m - width - 1 {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * n / alpha / mf)).cos())
            } else {
                1.0
            }
        })
        .collect()
}

/// Periodic Tukey window: the symmetric window of length `n + 1` without its
/// last sample.
pub fn tukey_periodic(n: usize, alpha: f64) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let mut w = tukey_symmetric(n + 1, alpha);
    w.truncate(n);
    w
}
