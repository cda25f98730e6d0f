//! Per-epoch feature extraction and the feature schema.
//!
//! ```text
//! EpochMatrix [C, T]
//!   ├─ (EOG cleaning, if enabled)
//!   ├─ td   mean / std / min / max per channel      → td_mean_<ch>, …
//!   ├─ bp   Welch PSD → band integration             → bp_<band>_<ch>
//!   └─ spec log10(channel-mean spectrogram + 1e-12)  → [F, T] image
//! ```
//!
//! Column names travel with the vectors; two feature sets are comparable only
//! when their [`FeatureSchema`]s are equal.
use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::config::{Band, PipelineConfig};
use crate::eog::{apply_eog, EogStatus};
use crate::epoch::EpochMatrix;
use crate::error::{FeatureError, FeatureResult};
use crate::normalize::channel_stats;
use crate::spectral::{band_powers, spectrogram, welch};

/// Time-domain statistics per channel, in column order.
pub const TD_STATS: [&str; 4] = ["mean", "std", "min", "max"];

/// Features of one epoch.
#[derive(Debug, Clone, Serialize)]
pub struct SpectralFeatureSet {
    pub source_file: String,
    pub trial_number: i64,
    pub label: u8,
    pub ch_names: Vec<String>,
    /// Channel-major: `[mean, std, min, max]` per channel.
    pub td_feats: Vec<f32>,
    pub td_cols: Vec<String>,
    /// Band-major, then channel-major.
    pub bp_feats: Vec<f32>,
    pub bp_cols: Vec<String>,
    /// `[F, T]` log-power image.
    pub spec_img: Array2<f32>,
    pub spec_f: Vec<f32>,
    pub spec_t: Vec<f32>,
    pub eog: EogStatus,
}

impl SpectralFeatureSet {
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema {
            td_cols: self.td_cols.clone(),
            bp_cols: self.bp_cols.clone(),
            spec_f: self.spec_f.clone(),
            spec_t: self.spec_t.clone(),
        }
    }
}

/// Column identity and order plus the spectrogram bin axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    pub td_cols: Vec<String>,
    pub bp_cols: Vec<String>,
    pub spec_f: Vec<f32>,
    pub spec_t: Vec<f32>,
}

/// Why a feature set does not fit a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMismatch {
    TdColumns,
    BpColumns,
    SpecShape,
}

impl std::fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SchemaMismatch::TdColumns => "time-domain columns differ",
            SchemaMismatch::BpColumns => "bandpower columns differ",
            SchemaMismatch::SpecShape => "spectrogram shape differs",
        })
    }
}

impl FeatureSchema {
    /// Check `set` against this schema: column lists must match exactly and
    /// the spectrogram image must be `[len(spec_f), len(spec_t)]`.
    pub fn check(&self, set: &SpectralFeatureSet) -> Result<(), SchemaMismatch> {
        if set.td_cols != self.td_cols {
            return Err(SchemaMismatch::TdColumns);
        }
        if set.bp_cols != self.bp_cols {
            return Err(SchemaMismatch::BpColumns);
        }
        if set.spec_img.dim() != (self.spec_f.len(), self.spec_t.len()) {
            return Err(SchemaMismatch::SpecShape);
        }
        Ok(())
    }
}

pub fn td_columns(ch_names: &[String]) -> Vec<String> {
    ch_names
        .iter()
        .flat_map(|ch| TD_STATS.iter().map(move |stat| format!("td_{stat}_{ch}")))
        .collect()
}

pub fn bp_columns(bands: &[Band], ch_names: &[String]) -> Vec<String> {
    bands
        .iter()
        .flat_map(|b| ch_names.iter().map(move |ch| format!("bp_{}_{ch}", b.name)))
        .collect()
}

/// Extract every feature of one epoch.
///
/// The epoch is consumed because EOG cleaning rewrites it in place.  An epoch
/// without channels is a [`FeatureError::DegenerateEpoch`].
pub fn extract_feature_set(
    mut epoch: EpochMatrix,
    cfg: &PipelineConfig,
) -> FeatureResult<SpectralFeatureSet> {
    if epoch.is_empty() {
        return Err(FeatureError::DegenerateEpoch(epoch.trial_number));
    }
    let eog = apply_eog(&mut epoch, cfg);

    let td_feats: Vec<f32> =
        channel_stats(&epoch.data).into_iter().flat_map(|s| s.to_array()).collect();
    let td_cols = td_columns(&epoch.ch_names);

    let psd = welch(&epoch.data, cfg.sfreq, cfg.welch_nperseg);
    let bp = band_powers(&psd, &cfg.bands);
    let bp_feats: Vec<f32> = bp.iter().copied().collect();
    let bp_cols = bp_columns(&cfg.bands, &epoch.ch_names);

    let sp = spectrogram(&epoch.data, cfg.sfreq, &cfg.spectrogram);
    let spec_img = sp.log_image();

    debug!(
        file = %epoch.source_file,
        trial = epoch.trial_number,
        n_channels = epoch.n_channels(),
        n_td = td_feats.len(),
        n_bp = bp_feats.len(),
        spec = ?spec_img.dim(),
        "features extracted"
    );

    Ok(SpectralFeatureSet {
        source_file: epoch.source_file,
        trial_number: epoch.trial_number,
        label: epoch.label,
        ch_names: epoch.ch_names,
        td_feats,
        td_cols,
        bp_feats,
        bp_cols,
        spec_img,
        spec_f: sp.freqs,
        spec_t: sp.times,
        eog,
    })
}
