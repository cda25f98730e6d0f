//! Ocular (EOG) artifact removal.
//!
//! ```text
//! [C, T] epoch
//!   ├─ zero-phase Butterworth highpass (default 1 Hz)
//!   ├─ reference = z(mean of frontal channels)
//!   ├─ FastICA, k = min(n_components, C)
//!   ├─ mark components with |r(z(source), reference)| ≥ threshold
//!   └─ zero marked sources, back-project
//! ```
//!
//! Whenever the cleaner cannot do its job it says so through
//! [`EogOutcome::Skipped`] and the caller keeps the epoch as it was.
use ndarray::Array2;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{EogConfig, PipelineConfig};
use crate::epoch::EpochMatrix;
use crate::filter::highpass_zero_phase;
use crate::ica::FastIca;
use crate::normalize::{pearson, zscore};

/// Channels close enough to the eyes to serve as an EOG proxy.
pub const FRONTAL: [&str; 9] = ["FP1", "FP2", "AF7", "AF8", "F7", "F8", "FZ", "FPZ", "AFZ"];

/// Upper bound on components when `n_components == 0`.
const DEFAULT_MAX_COMPONENTS: usize = 12;

/// Minimum epoch length the cleaner works on.
const MIN_SAMPLES: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("fewer than 2 channels")]
    TooFewChannels,
    #[error("fewer than 8 samples")]
    TooFewSamples,
    #[error("no frontal channel")]
    NoFrontalChannel,
    #[error("ICA failed: {0}")]
    Decomposition(String),
    #[error("no component correlates with the frontal reference")]
    NoArtifactComponent,
}

#[derive(Debug, Clone)]
pub enum EogOutcome {
    /// Cleaned `[C, T]` data and the indices of the zeroed components.
    Cleaned { data: Array2<f32>, removed: Vec<usize> },
    Skipped(SkipReason),
}

/// What happened to one epoch, carried on every feature set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EogStatus {
    Disabled,
    Cleaned { n_removed: usize },
    Skipped { reason: SkipReason },
}

impl EogStatus {
    pub fn is_cleaned(&self) -> bool {
        matches!(self, EogStatus::Cleaned { .. })
    }
}

pub fn is_frontal(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    FRONTAL.contains(&upper.as_str())
}

/// Effective component count: `0` means `min(C, 12)`, anything else is
/// clamped to `C`.
pub fn component_count(requested: usize, n_channels: usize) -> usize {
    match requested {
        0 => n_channels.min(DEFAULT_MAX_COMPONENTS),
        k => k.min(n_channels),
    }
}

/// Run the cleaner on `data` (`[C, T]`).
pub fn remove_eog(
    data: &Array2<f32>,
    ch_names: &[String],
    sfreq: f32,
    cfg: &EogConfig,
) -> EogOutcome {
    let (n_ch, n_t) = data.dim();
    if n_ch < 2 {
        return EogOutcome::Skipped(SkipReason::TooFewChannels);
    }
    if n_t < MIN_SAMPLES {
        return EogOutcome::Skipped(SkipReason::TooFewSamples);
    }
    let frontal: Vec<usize> = (0..n_ch)
        .filter(|&i| ch_names.get(i).is_some_and(|n| is_frontal(n)))
        .collect();
    if frontal.is_empty() {
        return EogOutcome::Skipped(SkipReason::NoFrontalChannel);
    }

    let hp = highpass_zero_phase(data, sfreq, cfg.highpass_hz).mapv(|v| v as f64);

    let frontal_mean: Vec<f64> = (0..n_t)
        .map(|t| frontal.iter().map(|&c| hp[[c, t]]).sum::<f64>() / frontal.len() as f64)
        .collect();
    let reference = zscore(&frontal_mean);

    let k = component_count(cfg.n_components, n_ch);
    let fit = match FastIca::new(k, cfg.seed).fit(&hp) {
        Ok(fit) => fit,
        Err(e) => return EogOutcome::Skipped(SkipReason::Decomposition(e.to_string())),
    };

    let threshold = cfg.corr_threshold as f64;
    let removed: Vec<usize> = fit
        .sources
        .columns()
        .into_iter()
        .enumerate()
        .filter_map(|(i, src)| {
            let r = pearson(&zscore(&src.to_vec()), &reference);
            debug!(component = i, r, "EOG correlation");
            (r.is_finite() && r.abs() >= threshold).then_some(i)
        })
        .collect();
    if removed.is_empty() {
        return EogOutcome::Skipped(SkipReason::NoArtifactComponent);
    }

    let mut sources = fit.sources.clone();
    for &i in &removed {
        sources.column_mut(i).fill(0.0);
    }
    let cleaned = fit.reconstruct(&sources).mapv(|v| v as f32);
    EogOutcome::Cleaned { data: cleaned, removed }
}

/// Clean `epoch` in place when enabled; otherwise leave it alone.
pub fn apply_eog(epoch: &mut EpochMatrix, cfg: &PipelineConfig) -> EogStatus {
    if !cfg.eog.enabled {
        return EogStatus::Disabled;
    }
    match remove_eog(&epoch.data, &epoch.ch_names, cfg.sfreq, &cfg.eog) {
        EogOutcome::Cleaned { data, removed } => {
            debug!(trial = epoch.trial_number, ?removed, "EOG components removed");
            epoch.data = data;
            EogStatus::Cleaned { n_removed: removed.len() }
        }
        EogOutcome::Skipped(reason) => {
            let (file, trial) = (&epoch.source_file, epoch.trial_number);
            match &reason {
                SkipReason::Decomposition(_) => {
                    warn!(file = %file, trial, %reason, "EOG cleaning skipped")
                }
                _ => debug!(file = %file, trial, %reason, "EOG cleaning skipped"),
            }
            EogStatus::Skipped { reason }
        }
    }
}
