//! Forward-backward (zero-phase) IIR filtering.
//!
//! Matches `scipy.signal.filtfilt(b, a, x, padtype='odd')`:
//!
//! 1. odd-reflect `padlen = 3·max(len(a), len(b))` samples onto both ends,
//! 2. run [`lfilter`] forward with steady-state initial conditions scaled by
//!    the first padded sample,
//! 3. run it again over the reversed output, scaled by its first sample,
//! 4. reverse and strip the padding.
//!
//! Unlike SciPy, signals shorter than `padlen + 1` are not rejected: the
//! padding is clamped to `n - 1`.
use ndarray::{Array2, ArrayView1};

use super::design::{butter_highpass, BaCoeffs};

/// Direct-form II transposed IIR filter with initial state `zi`.
///
/// `zi` has `max(len(a), len(b)) - 1` entries; `None` means zero state.
pub fn lfilter(coeffs: &BaCoeffs, x: &[f64], zi: Option<&[f64]>) -> Vec<f64> {
    let n = coeffs.a.len().max(coeffs.b.len());
    let a0 = coeffs.a[0];
    let coef = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0) / a0;
    let b: Vec<f64> = (0..n).map(|i| coef(&coeffs.b, i)).collect();
    let a: Vec<f64> = (0..n).map(|i| coef(&coeffs.a, i)).collect();

    let mut z: Vec<f64> = match zi {
        Some(zi) => zi.to_vec(),
        None => vec![0.0; n - 1],
    };
    let mut y = Vec::with_capacity(x.len());
    for &xn in x {
        let yn = b[0] * xn + z.first().copied().unwrap_or(0.0);
        for i in 0..n - 1 {
            let next = if i + 1 < n - 1 { z[i + 1] } else { 0.0 };
            z[i] = b[i + 1] * xn + next - a[i + 1] * yn;
        }
        y.push(yn);
    }
    y
}

/// Steady-state initial conditions for a unit step input.
///
/// Solves `zi = A·zi + B` for the companion-form state matrix, in the closed
/// form used by `scipy.signal.lfilter_zi`.
pub fn lfilter_zi(coeffs: &BaCoeffs) -> Vec<f64> {
    let n = coeffs.a.len().max(coeffs.b.len());
    let a0 = coeffs.a[0];
    let pad = |c: &[f64]| -> Vec<f64> {
        (0..n).map(|i| c.get(i).copied().unwrap_or(0.0) / a0).collect()
    };
    let b = pad(&coeffs.b);
    let a = pad(&coeffs.a);

    let m = n - 1;
    if m == 0 {
        return vec![];
    }
    // B = b[1:] - a[1:]·b[0];  first column of (I - Aᵀ) sums to Σa.
    let big_b: Vec<f64> = (1..n).map(|k| b[k] - a[k] * b[0]).collect();
    let a_sum: f64 = a.iter().sum();

    let mut zi = vec![0.0; m];
    zi[0] = big_b.iter().sum::<f64>() / a_sum;
    let mut asum = 1.0;
    let mut csum = 0.0;
    for k in 1..m {
        asum += a[k];
        csum += b[k] - a[k] * b[0];
        zi[k] = asum * zi[0] - csum;
    }
    zi
}

/// Odd reflection about each end point (`2·x[0] − x[i]`, `2·x[-1] − x[-1-i]`).
///
/// The pad length is clamped to `n - 1` so the reflection never leaves the
/// signal.
pub fn odd_extend(x: &[f64], npad: usize) -> (Vec<f64>, usize) {
    let n = x.len();
    let npad = npad.min(n.saturating_sub(1));
    let mut out = Vec::with_capacity(n + 2 * npad);
    for i in (1..=npad).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    let last = x[n - 1];
    for i in 1..=npad {
        out.push(2.0 * last - x[n - 1 - i]);
    }
    (out, npad)
}

/// Zero-phase filtering of one signal.
pub fn filtfilt(coeffs: &BaCoeffs, x: &[f64]) -> Vec<f64> {
    if x.is_empty() {
        return vec![];
    }
    let padlen = 3 * coeffs.a.len().max(coeffs.b.len());
    let (ext, npad) = odd_extend(x, padlen);
    let zi = lfilter_zi(coeffs);

    let scaled = |s: f64| -> Vec<f64> { zi.iter().map(|z| z * s).collect() };
    let fwd = lfilter(coeffs, &ext, Some(&scaled(ext[0])));
    let rev: Vec<f64> = fwd.into_iter().rev().collect();
    let bwd = lfilter(coeffs, &rev, Some(&scaled(rev[0])));

    bwd.into_iter().rev().skip(npad).take(x.len()).collect()
}

/// Zero-phase Butterworth highpass of one `f32` signal.
///
/// `None`, `<= 0` or at/above Nyquist returns the input unchanged.
pub fn highpass_1d(x: ArrayView1<f32>, sfreq: f32, cutoff_hz: Option<f32>) -> Vec<f32> {
    let Some(coeffs) = cutoff_hz.and_then(|fc| butter_highpass(fc, sfreq)) else {
        return x.to_vec();
    };
    let xd: Vec<f64> = x.iter().map(|&v| v as f64).collect();
    filtfilt(&coeffs, &xd).into_iter().map(|v| v as f32).collect()
}

/// Zero-phase highpass applied to every channel of `data` (`[C, T]`).
pub fn highpass_zero_phase(data: &Array2<f32>, sfreq: f32, cutoff_hz: Option<f32>) -> Array2<f32> {
    let mut out = data.clone();
    for (mut dst, src) in out.rows_mut().into_iter().zip(data.rows()) {
        let filtered = highpass_1d(src, sfreq, cutoff_hz);
        dst.assign(&ArrayView1::from(filtered.as_slice()));
    }
    out
}
