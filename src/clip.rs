//! Quantile clip bounds: fit once on training bandpower, reapply verbatim.
//!
//! The same [`ClipBounds`] must gate test and inference features that reach a
//! model trained on clipped data.  Bounds persist as JSON:
//!
//! ```json
//! {"method": "quantile_clip", "lo_q": 0.01, "hi_q": 0.99, "lo": [..], "hi": [..]}
//! ```
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{ArrayBase, ArrayD, ArrayView2, Axis, Data, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, FeatureResult};

pub const CLIP_METHOD: &str = "quantile_clip";

/// Per-feature `[lo, hi]` bounds plus the quantiles they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipBounds {
    pub method: String,
    pub lo_q: f64,
    pub hi_q: f64,
    pub lo: Vec<f32>,
    pub hi: Vec<f32>,
}

impl ClipBounds {
    pub fn n_features(&self) -> usize {
        self.lo.len()
    }

    /// Equal-length vectors with `lo <= hi` wherever both are defined.
    pub fn validate(&self) -> FeatureResult<()> {
        if self.lo.len() != self.hi.len() {
            return Err(FeatureError::ClipBounds(format!(
                "lo has {} entries, hi has {}",
                self.lo.len(),
                self.hi.len()
            )));
        }
        if let Some(j) = self.lo.iter().zip(&self.hi).position(|(l, h)| l > h) {
            return Err(FeatureError::ClipBounds(format!(
                "feature {j}: lo {} > hi {}",
                self.lo[j], self.hi[j]
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> FeatureResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FeatureError::ClipBounds(e.to_string()))
    }

    pub fn from_json(text: &str) -> FeatureResult<Self> {
        let bounds: Self =
            serde_json::from_str(text).map_err(|e| FeatureError::ClipBounds(e.to_string()))?;
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json()?;
        std::fs::write(path, text)
            .with_context(|| format!("writing clip bounds to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading clip bounds {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing clip bounds {}", path.display()))
    }
}

/// Quantile `q` of the non-NaN values with linear interpolation between
/// order statistics (`pos = q·(n − 1)`).  `NaN` if every value is `NaN`.
pub fn nan_quantile(values: &[f32], q: f64) -> f32 {
    let mut v: Vec<f32> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    if v.is_empty() {
        return f32::NAN;
    }
    v.sort_by(f32::total_cmp);
    let pos = q * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    (v[lo] as f64 + (v[hi] as f64 - v[lo] as f64) * frac) as f32
}

/// Fit per-column bounds on a `[n, d]` training matrix.
pub fn fit_clip_bounds(x: ArrayView2<f32>, lo_q: f64, hi_q: f64) -> FeatureResult<ClipBounds> {
    if !(0.0..=1.0).contains(&lo_q) || !(0.0..=1.0).contains(&hi_q) || lo_q > hi_q {
        return Err(FeatureError::ClipBounds(format!(
            "quantiles must satisfy 0 <= lo_q <= hi_q <= 1, got ({lo_q}, {hi_q})"
        )));
    }
    if x.nrows() == 0 {
        return Err(FeatureError::ClipBounds("cannot fit bounds on zero rows".into()));
    }
    let (lo, hi): (Vec<f32>, Vec<f32>) = x
        .columns()
        .into_iter()
        .map(|col| {
            let v = col.to_vec();
            (nan_quantile(&v, lo_q), nan_quantile(&v, hi_q))
        })
        .unzip();
    Ok(ClipBounds { method: CLIP_METHOD.to_string(), lo_q, hi_q, lo, hi })
}

fn clip_value(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        return v;
    }
    let v = if v < lo { lo } else { v };
    if v > hi { hi } else { v }
}

/// Clip a feature vector (`[d]`) or a batch (`[n, d]`) column-wise.
///
/// Any other dimensionality, or a last axis that is not `d` long, is a
/// [`FeatureError::ClipShape`].  `NaN` stays `NaN`.
pub fn apply_clip_bounds<S, D>(
    x: &ArrayBase<S, D>,
    bounds: &ClipBounds,
) -> FeatureResult<ArrayD<f32>>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    bounds.validate()?;
    let d = bounds.n_features();
    let shape = x.shape().to_vec();
    let fits = matches!(x.ndim(), 1 | 2) && shape.last() == Some(&d);
    if !fits {
        return Err(FeatureError::ClipShape { expected: d, shape });
    }

    let mut out = x.to_owned().into_dyn();
    let last = Axis(out.ndim() - 1);
    for mut lane in out.lanes_mut(last) {
        for (v, (&lo, &hi)) in lane.iter_mut().zip(bounds.lo.iter().zip(&bounds.hi)) {
            *v = clip_value(*v, lo, hi);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2, Array3};

    #[test]
    fn quantile_interpolates_linearly() {
        let v: Vec<f32> = (0..=100).map(|i| i as f32).collect();
        approx::assert_abs_diff_eq!(nan_quantile(&v, 0.01), 1.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(nan_quantile(&v, 0.99), 99.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(nan_quantile(&[0.0, 10.0], 0.25), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn quantile_ignores_nan() {
        assert_eq!(nan_quantile(&[f32::NAN, 4.0, f32::NAN, 2.0], 1.0), 4.0);
        assert!(nan_quantile(&[f32::NAN], 0.5).is_nan());
    }

    #[test]
    fn applied_bounds_contain_every_value() {
        let x = Array2::from_shape_fn((200, 3), |(i, j)| {
            ((i * 37 + j * 11) % 101) as f32 * (j + 1) as f32
        });
        let b = fit_clip_bounds(x.view(), 0.05, 0.95).unwrap();
        let y = apply_clip_bounds(&x, &b).unwrap();
        for row in y.lanes(Axis(1)) {
            for (j, &v) in row.iter().enumerate() {
                assert!(v >= b.lo[j] && v <= b.hi[j]);
            }
        }
        // Idempotent.
        assert_eq!(apply_clip_bounds(&y, &b).unwrap(), y);
    }

    fn unit_bounds() -> ClipBounds {
        ClipBounds {
            method: CLIP_METHOD.into(),
            lo_q: 0.0,
            hi_q: 1.0,
            lo: vec![0.0; 2],
            hi: vec![1.0; 2],
        }
    }

    #[test]
    fn vector_input_and_nan_passthrough() {
        let b = unit_bounds();
        let y = apply_clip_bounds(&array![f32::NAN, 5.0], &b).unwrap();
        let y: Vec<f32> = y.iter().copied().collect();
        assert!(y[0].is_nan());
        assert_eq!(y[1], 1.0);
    }

    #[test]
    fn wrong_shapes_rejected() {
        let b = unit_bounds();
        let cube = Array3::<f32>::zeros((2, 2, 2));
        assert!(matches!(apply_clip_bounds(&cube, &b), Err(FeatureError::ClipShape { .. })));
        let short = Array1::<f32>::zeros(3);
        assert!(matches!(
            apply_clip_bounds(&short, &b),
            Err(FeatureError::ClipShape { expected: 2, .. })
        ));

        let ragged = ClipBounds { hi: vec![1.0], ..b };
        let res = apply_clip_bounds(&array![0.5_f32, 0.5], &ragged);
        assert!(matches!(res, Err(FeatureError::ClipBounds(_))));
    }

    #[test]
    fn bad_quantiles_rejected() {
        let x = Array2::<f32>::zeros((4, 2));
        assert!(fit_clip_bounds(x.view(), 0.9, 0.1).is_err());
        assert!(fit_clip_bounds(x.view(), -0.1, 0.5).is_err());
    }

    #[test]
    fn json_round_trip_reproduces_clipping() {
        let x = Array2::from_shape_fn((50, 4), |(i, j)| (i as f32 - 25.0) * (j as f32 + 0.5));
        let b = fit_clip_bounds(x.view(), 0.01, 0.99).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bp_clip_bounds.json");
        b.save(&path).unwrap();
        let back = ClipBounds::load(&path).unwrap();
        assert_eq!(back.method, "quantile_clip");
        assert_eq!(apply_clip_bounds(&x, &back).unwrap(), apply_clip_bounds(&x, &b).unwrap());
    }

    #[test]
    fn json_without_vectors_is_an_error() {
        let text = r#"{"method":"quantile_clip","lo_q":0.01,"hi_q":0.99}"#;
        let err = ClipBounds::from_json(text).unwrap_err();
        assert!(matches!(err, FeatureError::ClipBounds(_)));
    }
}
