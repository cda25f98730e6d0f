//! # eegfeat: spectral feature extraction for single-trial EEG
//!
//! `eegfeat` turns SMNI-style long-format EEG recordings (one row per
//! channel sample) into fixed-schema feature vectors and images for
//! alcoholic-vs-control classification.  Every DSP step follows the SciPy
//! conventions the classifiers were trained on (Welch, spectrogram,
//! Butterworth `filtfilt`, logcosh FastICA).
//!
//! ## Pipeline overview
//!
//! ```text
//! co2a0000364.csv
//!   │
//!   ├─ table::read_long_table()       normalised headers, subject → label
//!   ├─ epoch::build_epoch_matrix()    first trial, [C, 256], gap fill
//!   ├─ eog::apply_eog()               optional HP 1 Hz + FastICA + frontal
//!   │                                 correlation → component removal
//!   ├─ features                       td stats · Welch bandpower · log spec
//!   │    │
//!   │    └─→ SpectralFeatureSet
//!   │
//!   ├─ dataset::build_train_test()    schema-checked stacking
//!   ├─ clip::fit_clip_bounds()        per-feature quantile bounds (train)
//!   └─ scoring::predict_features()    clip-gated classifier scoring
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegfeat::{extract_features_from_file, PipelineConfig};
//! use std::path::Path;
//!
//! let cfg = PipelineConfig::default();
//! let set = extract_features_from_file(Path::new("data/co2a0000364.csv"), &cfg).unwrap();
//! println!("{} bandpower features, spec {:?}", set.bp_feats.len(), set.spec_img.dim());
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use eegfeat::spectral::{welch, band_powers};
//! use eegfeat::config::default_bands;
//! use ndarray::Array2;
//!
//! let data: Array2<f32> = Array2::zeros((19, 256)); // [C, T]
//! let psd = welch(&data, 256.0, 128);
//! let bp = band_powers(&psd, &default_bands());    // [B, C]
//! ```

pub mod clip;
pub mod config;
pub mod dataset;
pub mod eog;
pub mod epoch;
pub mod error;
pub mod features;
pub mod filter;
pub mod ica;
pub mod io;
pub mod linalg;
pub mod normalize;
pub mod report;
pub mod scoring;
pub mod spectral;
pub mod table;
pub mod upload;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{default_bands, Band, EogConfig, PipelineConfig, SpectrogramConfig, FS, N_SAMPLES};

// errors
pub use error::{FeatureError, FeatureResult};

// input
pub use epoch::{build_epoch_matrix, EpochMatrix, EpochSelection};
pub use table::{read_long_table, read_long_table_file, LongTable, RawRecord};

// preprocessing
pub use eog::{apply_eog, remove_eog, EogOutcome, EogStatus, SkipReason};
pub use filter::highpass_zero_phase;
pub use ica::{FastIca, IcaError, IcaFit};

// features
pub use features::{extract_feature_set, FeatureSchema, SchemaMismatch, SpectralFeatureSet};
pub use spectral::{band_powers, bandpower, spectrogram, welch, Psd, Spectrogram};

// dataset, clipping, inference
pub use clip::{apply_clip_bounds, fit_clip_bounds, ClipBounds};
pub use dataset::{assemble_files, build_train_test, AssembledSet, Assembler, DatasetBundle};
pub use io::{write_assembled, StFile, StWriter};
pub use report::{analyze_epoch, AnalysisReport};
pub use scoring::{predict_features, Classifier, ClipStatus, LinearScorer, Prediction, Score};
pub use upload::{extract_features_from_upload, with_uploaded_csv};

/// Extract the features of the first trial in `table`.
///
/// Errors carry the table's file name so a failure inside a batch is
/// traceable to its source.
pub fn extract_features_from_table(
    table: LongTable,
    cfg: &PipelineConfig,
) -> Result<SpectralFeatureSet> {
    let file = table.source_file.clone();
    let epoch = first_epoch(&table, cfg).with_context(|| format!("{file}: building epoch"))?;
    extract_feature_set(epoch, cfg).with_context(|| format!("{file}: extracting features"))
}

/// [`extract_features_from_table`] on a CSV file.
///
/// # Examples
///
/// ```no_run
/// use eegfeat::{extract_features_from_file, PipelineConfig};
/// use std::path::Path;
///
/// let cfg = PipelineConfig::default();
/// let set = extract_features_from_file(Path::new("co2a0000364.csv"), &cfg).unwrap();
/// assert_eq!(set.spec_img.dim(), (46, 13));
/// ```
pub fn extract_features_from_file(path: &Path, cfg: &PipelineConfig) -> Result<SpectralFeatureSet> {
    let file = table::base_name(path);
    let table = read_long_table_file(path).with_context(|| format!("{file}: reading CSV"))?;
    extract_features_from_table(table, cfg)
}

/// [`extract_features_from_table`] on any CSV stream.
pub fn extract_features_from_reader<R: Read>(
    reader: R,
    source_file: &str,
    cfg: &PipelineConfig,
) -> Result<SpectralFeatureSet> {
    let table = read_long_table(reader, source_file)
        .with_context(|| format!("{source_file}: reading CSV"))?;
    extract_features_from_table(table, cfg)
}

/// Dashboard summary of the first trial in a CSV file.
pub fn analyze_file(path: &Path, cfg: &PipelineConfig) -> Result<AnalysisReport> {
    let file = table::base_name(path);
    let table = read_long_table_file(path).with_context(|| format!("{file}: reading CSV"))?;
    let epoch = first_epoch(&table, cfg).with_context(|| format!("{file}: building epoch"))?;
    analyze_epoch(epoch, cfg).with_context(|| format!("{file}: analysing"))
}

fn first_epoch(table: &LongTable, cfg: &PipelineConfig) -> FeatureResult<EpochMatrix> {
    build_epoch_matrix(table, &EpochSelection::default(), cfg.n_samples, cfg.max_missing_fraction)
}
