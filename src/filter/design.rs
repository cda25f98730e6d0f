//! Butterworth IIR highpass design (bilinear transform, pre-warped).
//!
//! A third-order Butterworth highpass factors into one first-order section
//! (real pole) and one biquad with `Q = 1` (the complex pair of `s² + s + 1`).
//! With `K = tan(π·fc / fs)`:
//!
//! ```text
//!   H₁(z) = (1 − z⁻¹) / ((1 + K) + (K − 1)·z⁻¹)
//!   H₂(z) = (1 − z⁻¹)² / ((1 + K + K²) + 2(K² − 1)·z⁻¹ + (1 − K + K²)·z⁻²)
//! ```
//!
//! The two sections are multiplied out into a single `(b, a)` pair, which is
//! what `butter(3, fc / nyq, btype='highpass')` returns.
use std::f64::consts::PI;

/// Transfer-function coefficients, `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BaCoeffs {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl BaCoeffs {
    /// Filter order (`len(a) - 1`).
    pub fn order(&self) -> usize {
        self.a.len().saturating_sub(1)
    }
}

/// First-order Butterworth highpass section.
fn first_order_highpass(k: f64) -> BaCoeffs {
    let norm = 1.0 / (1.0 + k);
    BaCoeffs {
        b: vec![norm, -norm],
        a: vec![1.0, (k - 1.0) * norm],
    }
}

/// Second-order highpass section with quality factor `q`.
fn biquad_highpass(k: f64, q: f64) -> BaCoeffs {
    let k2 = k * k;
    let norm = 1.0 / (1.0 + k / q + k2);
    BaCoeffs {
        b: vec![norm, -2.0 * norm, norm],
        a: vec![1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm],
    }
}

/// Polynomial product (full convolution).
pub fn poly_mul(p: &[f64], q: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; p.len() + q.len() - 1];
    for (i, &pi) in p.iter().enumerate() {
        for (j, &qj) in q.iter().enumerate() {
            out[i + j] += pi * qj;
        }
    }
    out
}

/// Design a 3rd-order Butterworth highpass at `cutoff_hz`.
///
/// Returns `None` when the cutoff does not describe a usable filter:
/// non-finite, `<= 0`, or at/above Nyquist.  Callers treat `None` as the
/// identity filter.
pub fn butter_highpass(cutoff_hz: f32, sfreq: f32) -> Option<BaCoeffs> {
    let nyq = 0.5 * sfreq as f64;
    let fc = cutoff_hz as f64;
    if !fc.is_finite() || fc <= 0.0 || fc >= nyq {
        return None;
    }
    let k = (PI * fc / sfreq as f64).tan();
    let s1 = first_order_highpass(k);
    let s2 = biquad_highpass(k, 1.0);
    Some(BaCoeffs {
        b: poly_mul(&s1.b, &s2.b),
        a: poly_mul(&s1.a, &s2.a),
    })
}

/// Magnitude response `|H(e^{jω})|` at `freq_hz`.
pub fn magnitude_at(coeffs: &BaCoeffs, freq_hz: f64, sfreq: f64) -> f64 {
    let w = 2.0 * PI * freq_hz / sfreq;
    let eval = |c: &[f64]| {
        let (mut re, mut im) = (0.0, 0.0);
        for (n, &v) in c.iter().enumerate() {
            re += v * (w * n as f64).cos();
            im -= v * (w * n as f64).sin();
        }
        (re, im)
    };
    let (nr, ni) = eval(&coeffs.b);
    let (dr, di) = eval(&coeffs.a);
    ((nr * nr + ni * ni) / (dr * dr + di * di)).sqrt()
}
