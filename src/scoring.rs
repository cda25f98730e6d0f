//! Inference on bandpower features.
//!
//! Any classifier plugs in through [`Classifier`]; what it can say about its
//! confidence is a [`Score`]:
//!
//! | score            | label     | probability   |
//! |------------------|-----------|---------------|
//! | `Probability(p)` | `p ≥ 0.5` | `p`           |
//! | `Margin(m)`      | `m ≥ 0`   | `σ(m)`        |
//! | `Unavailable`    | `predict` | label as 0/1  |
//!
//! Features pass through the training clip bounds first.  A clip failure does
//! not abort inference; it is logged and reported in [`ClipStatus`].
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clip::{apply_clip_bounds, ClipBounds};
use crate::features::SpectralFeatureSet;

/// Confidence reported by a classifier for the positive class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Probability(f64),
    /// Signed distance to the decision boundary.
    Margin(f64),
    Unavailable,
}

/// A trained binary classifier over a bandpower vector.
pub trait Classifier {
    fn predict(&self, x: &[f32]) -> u8;

    fn score(&self, _x: &[f32]) -> Score {
        Score::Unavailable
    }
}

/// Linear decision function `w·x + b`, scored as a margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LinearScorer {
    fn margin(&self, x: &[f32]) -> f64 {
        let dot: f64 = self.weights.iter().zip(x).map(|(&w, &v)| w as f64 * v as f64).sum();
        dot + self.bias as f64
    }
}

impl Classifier for LinearScorer {
    fn predict(&self, x: &[f32]) -> u8 {
        u8::from(self.margin(x) >= 0.0)
    }

    fn score(&self, x: &[f32]) -> Score {
        Score::Margin(self.margin(x))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "clip", rename_all = "snake_case")]
pub enum ClipStatus {
    /// No bounds were supplied.
    NotConfigured,
    Applied,
    /// Bounds were supplied but could not be applied; features went in raw.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: u8,
    pub probability: f64,
    pub clip: ClipStatus,
}

pub fn sigmoid(m: f64) -> f64 {
    1.0 / (1.0 + (-m).exp())
}

/// Clip `bp` with `bounds` if given.
pub fn gate_features(bp: &[f32], bounds: Option<&ClipBounds>) -> (Vec<f32>, ClipStatus) {
    let Some(bounds) = bounds else {
        return (bp.to_vec(), ClipStatus::NotConfigured);
    };
    match apply_clip_bounds(&ndarray::ArrayView1::from(bp), bounds) {
        Ok(clipped) => (clipped.iter().copied().collect(), ClipStatus::Applied),
        Err(e) => {
            warn!(error = %e, "clip bounds not applied; scoring unclipped features");
            (bp.to_vec(), ClipStatus::Failed { reason: e.to_string() })
        }
    }
}

/// Map a model's answer to `(label, probability)`.
pub fn resolve_score<M: Classifier + ?Sized>(model: &M, x: &[f32]) -> (u8, f64) {
    match model.score(x) {
        Score::Probability(p) => (u8::from(p >= 0.5), p),
        Score::Margin(m) => (u8::from(m >= 0.0), sigmoid(m)),
        Score::Unavailable => {
            let label = model.predict(x);
            (label, label as f64)
        }
    }
}

/// Score the bandpower features of one file.
pub fn predict_features<M: Classifier + ?Sized>(
    features: &SpectralFeatureSet,
    bounds: Option<&ClipBounds>,
    model: &M,
) -> Prediction {
    let (x, clip) = gate_features(&features.bp_feats, bounds);
    let (label, probability) = resolve_score(model, &x);
    Prediction { label, probability, clip }
}
