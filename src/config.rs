//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the feature pipeline.
//! All fields have defaults that match the settings the classifiers were
//! trained with; the same configuration must be used for training and
//! inference, otherwise the feature schema drifts.

use crate::error::{FeatureError, FeatureResult};

/// Number of samples in one SMNI trial (1 s at 256 Hz).
pub const N_SAMPLES: usize = 256;

/// Sampling rate of the SMNI recordings in Hz.
pub const FS: f32 = 256.0;

/// A named frequency band, `lo..=hi` in Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub lo: f32,
    pub hi: f32,
}

impl Band {
    pub fn new(name: &str, lo: f32, hi: f32) -> Self {
        Self { name: name.to_string(), lo, hi }
    }
}

/// The canonical EEG bands in feature order: delta, theta, alpha, beta, gamma.
pub fn default_bands() -> Vec<Band> {
    vec![
        Band::new("delta", 0.5, 4.0),
        Band::new("theta", 4.0, 8.0),
        Band::new("alpha", 8.0, 13.0),
        Band::new("beta", 13.0, 30.0),
        Band::new("gamma", 30.0, 45.0),
    ]
}

/// Parameters of the EOG artifact cleaner.
#[derive(Debug, Clone, PartialEq)]
pub struct EogConfig {
    /// Run the cleaner at all.
    ///
    /// Default: `false` (env `EOG_CLEAN=1` turns it on).
    pub enabled: bool,

    /// Cutoff of the zero-phase Butterworth highpass applied before ICA.
    /// `None` or `<= 0` disables the filter.
    ///
    /// Default: `Some(1.0)` Hz.
    pub highpass_hz: Option<f32>,

    /// Requested number of independent components; clamped to the channel
    /// count.  `0` means `min(n_channels, 12)`.
    ///
    /// Default: `12`.
    pub n_components: usize,

    /// Minimum `|r|` between a component and the frontal reference for the
    /// component to be removed.
    ///
    /// Default: `0.35`.
    pub corr_threshold: f32,

    /// Seed of the ICA initial unmixing matrix.
    ///
    /// Default: `42`.
    pub seed: u64,
}

impl Default for EogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            highpass_hz: Some(1.0),
            n_components: 12,
            corr_threshold: 0.35,
            seed: 42,
        }
    }
}

/// Short-time spectrogram parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrogramConfig {
    pub nperseg: usize,
    pub noverlap: usize,
    pub nfft: usize,
    /// Frequencies above this are dropped.  `None` keeps the full axis.
    pub fmax: Option<f32>,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self { nperseg: 64, noverlap: 48, nfft: 256, fmax: Some(45.0) }
    }
}

/// Configuration for the full feature pipeline.
///
/// All fields are `pub`, so struct-update syntax works:
///
/// ```
/// use eegfeat::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     welch_nperseg: 64,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(cfg.n_samples, 256);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Sampling rate in Hz, shared by every spectral step.
    ///
    /// Default: `256.0`.
    pub sfreq: f32,

    /// Epoch length in samples; the sample axis is reindexed to `0..n_samples`.
    ///
    /// Default: `256`.
    pub n_samples: usize,

    /// Channels with a missing fraction at or above this are dropped.
    ///
    /// Default: `0.05`.
    pub max_missing_fraction: f32,

    /// Bandpower bands, in feature order.
    pub bands: Vec<Band>,

    /// Welch segment length.
    ///
    /// Default: `128` (2 Hz resolution at 256 Hz).
    pub welch_nperseg: usize,

    pub spectrogram: SpectrogramConfig,

    pub eog: EogConfig,

    /// Lower / upper quantile for [`crate::clip::fit_clip_bounds`].
    ///
    /// Default: `(0.01, 0.99)`.
    pub clip_quantiles: (f64, f64),
}

impl Default for PipelineConfig {
    /// Returns the training configuration:
    /// 256 Hz · 256 samples · Welch 128 · spectrogram 64/48/256 ≤ 45 Hz · EOG off.
    fn default() -> Self {
        Self {
            sfreq: FS,
            n_samples: N_SAMPLES,
            max_missing_fraction: 0.05,
            bands: default_bands(),
            welch_nperseg: 128,
            spectrogram: SpectrogramConfig::default(),
            eog: EogConfig::default(),
            clip_quantiles: (0.01, 0.99),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with the EOG settings taken from the environment.
    ///
    /// | variable               | field                  |
    /// |------------------------|------------------------|
    /// | `EOG_CLEAN`            | `eog.enabled` (`"1"`)  |
    /// | `EOG_HIGHPASS_HZ`      | `eog.highpass_hz`      |
    /// | `EOG_ICA_N_COMPONENTS` | `eog.n_components`     |
    /// | `EOG_CORR_THRESHOLD`   | `eog.corr_threshold`   |
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> FeatureResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup, so the
    /// parsing is testable without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> FeatureResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("EOG_CLEAN") {
            cfg.eog.enabled = v.trim() == "1";
        }
        if let Some(v) = lookup("EOG_HIGHPASS_HZ") {
            let hz: f32 = parse_env("EOG_HIGHPASS_HZ", &v)?;
            cfg.eog.highpass_hz = Some(hz);
        }
        if let Some(v) = lookup("EOG_ICA_N_COMPONENTS") {
            // Any value <= 0 selects the automatic count.
            let k: i64 = parse_env("EOG_ICA_N_COMPONENTS", &v)?;
            cfg.eog.n_components = usize::try_from(k).unwrap_or(0);
        }
        if let Some(v) = lookup("EOG_CORR_THRESHOLD") {
            cfg.eog.corr_threshold = parse_env("EOG_CORR_THRESHOLD", &v)?;
        }
        Ok(cfg)
    }

    /// Frequency resolution of the Welch PSD in Hz.
    pub fn welch_resolution(&self) -> f32 {
        self.sfreq / self.welch_nperseg.min(self.n_samples).max(1) as f32
    }

    /// Check value ranges.
    ///
    /// Returns the names of bands that cover fewer than two Welch bins.  Those
    /// bands are legal but always integrate to zero power, which usually
    /// means a misconfigured band edge.
    pub fn validate(&self) -> FeatureResult<Vec<String>> {
        if !(self.sfreq.is_finite() && self.sfreq > 0.0) {
            let msg = format!("sfreq must be > 0, got {}", self.sfreq);
            return Err(FeatureError::InvalidConfig(msg));
        }
        if self.n_samples == 0 {
            return Err(FeatureError::InvalidConfig("n_samples must be > 0".into()));
        }
        if self.welch_nperseg == 0 {
            return Err(FeatureError::InvalidConfig("welch_nperseg must be > 0".into()));
        }
        let sp = &self.spectrogram;
        if sp.nperseg == 0 || sp.noverlap >= sp.nperseg || sp.nfft < sp.nperseg {
            return Err(FeatureError::InvalidConfig(format!(
                "spectrogram needs 0 < noverlap < nperseg <= nfft, got {}/{}/{}",
                sp.nperseg, sp.noverlap, sp.nfft
            )));
        }
        let (lo_q, hi_q) = self.clip_quantiles;
        if !(0.0..=1.0).contains(&lo_q) || !(0.0..=1.0).contains(&hi_q) || lo_q > hi_q {
            return Err(FeatureError::InvalidConfig(format!(
                "clip quantiles must satisfy 0 <= lo <= hi <= 1, got ({lo_q}, {hi_q})"
            )));
        }

        let df = self.welch_resolution();
        let nyq = self.sfreq / 2.0;
        let mut narrow = Vec::new();
        for band in &self.bands {
            if band.lo > band.hi {
                return Err(FeatureError::InvalidConfig(format!(
                    "band '{}' has lo {} > hi {}",
                    band.name, band.lo, band.hi
                )));
            }
            let first = (band.lo.max(0.0) / df).ceil() as i64;
            let last = (band.hi.min(nyq) / df).floor() as i64;
            if last - first + 1 < 2 {
                narrow.push(band.name.clone());
            }
        }
        Ok(narrow)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> FeatureResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FeatureError::InvalidConfig(format!("{key}={value:?} is not a valid value")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_bands_in_feature_order() {
        let names: Vec<_> = default_bands().into_iter().map(|b| b.name).collect();
        assert_eq!(names, ["delta", "theta", "alpha", "beta", "gamma"]);
    }

    #[test]
    fn env_lookup_overrides_eog() {
        let env: HashMap<&str, &str> = [
            ("EOG_CLEAN", "1"),
            ("EOG_HIGHPASS_HZ", "0.5"),
            ("EOG_ICA_N_COMPONENTS", "8"),
        ]
        .into_iter()
        .collect();
        let cfg = PipelineConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert!(cfg.eog.enabled);
        assert_eq!(cfg.eog.highpass_hz, Some(0.5));
        assert_eq!(cfg.eog.n_components, 8);
        assert_eq!(cfg.eog.corr_threshold, 0.35);
    }

    #[test]
    fn non_positive_component_count_means_auto() {
        for v in ["-1", "0"] {
            let lookup = |k: &str| (k == "EOG_ICA_N_COMPONENTS").then(|| v.to_string());
            let cfg = PipelineConfig::from_lookup(lookup).unwrap();
            assert_eq!(cfg.eog.n_components, 0);
        }
    }

    #[test]
    fn env_lookup_rejects_garbage() {
        let err =
            PipelineConfig::from_lookup(|k| (k == "EOG_CORR_THRESHOLD").then(|| "high".into()));
        assert!(matches!(err, Err(FeatureError::InvalidConfig(_))));
    }

    #[test]
    fn default_config_has_no_narrow_band() {
        assert!(PipelineConfig::default().validate().unwrap().is_empty());
    }

    #[test]
    fn sub_bin_band_is_reported() {
        let cfg = PipelineConfig {
            bands: vec![Band::new("sliver", 10.5, 11.5)],
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.validate().unwrap(), vec!["sliver".to_string()]);
    }

    #[test]
    fn bad_quantiles_rejected() {
        let cfg = PipelineConfig { clip_quantiles: (0.9, 0.1), ..PipelineConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
