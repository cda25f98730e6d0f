//! Per-file analysis summary for dashboards.
//!
//! Everything is computed from the same (optionally EOG-cleaned) epoch the
//! feature extractor sees, so the charts and the model inputs agree.
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::eog::{apply_eog, EogStatus};
use crate::epoch::EpochMatrix;
use crate::error::{FeatureError, FeatureResult};
use crate::features::bp_columns;
use crate::spectral::{band_powers, spectrogram, welch};

/// Longest time series returned per channel.
pub const MAX_POINTS: usize = 512;

/// Bandpower features listed in [`AnalysisReport::bandpower_top`].
pub const TOP_FEATURES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimePoint {
    pub t: usize,
    pub v: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSeries {
    pub channel: String,
    pub points: Vec<TimePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PsdPoint {
    pub f: f32,
    pub p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandValue {
    pub band: String,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureValue {
    pub feature: String,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrogramImage {
    pub f: Vec<f32>,
    pub t: Vec<f32>,
    /// Row per frequency.
    pub z: Vec<Vec<f32>>,
    pub shape: [usize; 2],
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EogSummary {
    pub enabled: bool,
    pub highpass_hz: Option<f32>,
    pub n_components: usize,
    pub corr_threshold: f32,
    pub outcome: EogStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessingSummary {
    pub fs_hz: f32,
    pub n_samples: usize,
    pub channels_used: usize,
    pub eog: EogSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub source_file: String,
    pub trial_number: i64,
    pub channels: Vec<String>,
    pub timeseries: Vec<ChannelSeries>,
    /// Channel-mean Welch PSD.
    pub psd: Vec<PsdPoint>,
    /// Channel-mean power per band.
    pub bandpower_by_band: Vec<BandValue>,
    pub spectrogram: SpectrogramImage,
    /// Largest bandpower features by magnitude.
    pub bandpower_top: Vec<FeatureValue>,
    pub preprocessing: PreprocessingSummary,
}

/// Every `⌈n / max_points⌉`-th sample.
pub fn downsample(row: &[f32], max_points: usize) -> Vec<TimePoint> {
    let step = row.len().div_ceil(max_points.max(1)).max(1);
    row.iter().enumerate().step_by(step).map(|(t, &v)| TimePoint { t, v }).collect()
}

/// The `k` entries with the largest `|value|`, largest first.
pub fn top_by_magnitude(names: &[String], values: &[f32], k: usize) -> Vec<FeatureValue> {
    let mut idx: Vec<usize> = (0..values.len().min(names.len())).collect();
    idx.sort_by(|&a, &b| values[b].abs().total_cmp(&values[a].abs()));
    idx.into_iter()
        .take(k)
        .map(|j| FeatureValue { feature: names[j].clone(), value: values[j] })
        .collect()
}

pub fn analyze_epoch(
    mut epoch: EpochMatrix,
    cfg: &PipelineConfig,
) -> FeatureResult<AnalysisReport> {
    if epoch.is_empty() {
        return Err(FeatureError::DegenerateEpoch(epoch.trial_number));
    }
    let eog_status = apply_eog(&mut epoch, cfg);

    let timeseries = epoch
        .ch_names
        .iter()
        .zip(epoch.data.rows())
        .map(|(ch, row)| ChannelSeries {
            channel: ch.clone(),
            points: downsample(&row.to_vec(), MAX_POINTS),
        })
        .collect();

    let psd = welch(&epoch.data, cfg.sfreq, cfg.welch_nperseg);
    let psd_points = psd
        .freqs
        .iter()
        .zip(psd.channel_mean())
        .map(|(&f, p)| PsdPoint { f, p })
        .collect();

    let bp = band_powers(&psd, &cfg.bands);
    let bandpower_by_band = cfg
        .bands
        .iter()
        .zip(bp.rows())
        .map(|(band, row)| BandValue { band: band.name.clone(), value: row.mean().unwrap_or(0.0) })
        .collect();
    let bp_feats: Vec<f32> = bp.iter().copied().collect();
    let bp_names = bp_columns(&cfg.bands, &epoch.ch_names);
    let bandpower_top = top_by_magnitude(&bp_names, &bp_feats, TOP_FEATURES);

    let sp = spectrogram(&epoch.data, cfg.sfreq, &cfg.spectrogram);
    let img = sp.log_image();
    let spectrogram = SpectrogramImage {
        shape: [img.nrows(), img.ncols()],
        min: img.iter().copied().fold(f32::INFINITY, f32::min),
        max: img.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        z: img.rows().into_iter().map(|r| r.to_vec()).collect(),
        f: sp.freqs,
        t: sp.times,
    };

    let preprocessing = PreprocessingSummary {
        fs_hz: cfg.sfreq,
        n_samples: epoch.n_samples(),
        channels_used: epoch.n_channels(),
        eog: EogSummary {
            enabled: cfg.eog.enabled,
            highpass_hz: cfg.eog.highpass_hz,
            n_components: cfg.eog.n_components,
            corr_threshold: cfg.eog.corr_threshold,
            outcome: eog_status,
        },
    };

    Ok(AnalysisReport {
        source_file: epoch.source_file,
        trial_number: epoch.trial_number,
        channels: epoch.ch_names,
        timeseries,
        psd: psd_points,
        bandpower_by_band,
        spectrogram,
        bandpower_top,
        preprocessing,
    })
}
