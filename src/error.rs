//! Typed failures of the feature pipeline.
//!
//! Hard failures (malformed input, degenerate epochs, invalid bounds) are
//! variants of [`FeatureError`].  Soft fallbacks never show up here: the EOG
//! cleaner reports them through [`crate::eog::EogStatus`] and inference through
//! [`crate::scoring::ClipStatus`].
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    /// A required column is absent after header normalisation.
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    /// Subject identifier is empty or not one of `a` / `c`.
    #[error("row {row}: unmappable subject identifier '{value}' (expected 'a' or 'c')")]
    UnknownSubject { row: usize, value: String },

    /// A row could not be parsed as tabular data.
    #[error("row {row}: {message}")]
    Csv { row: usize, message: String },

    /// The input has no data rows at all.
    #[error("input table has no rows")]
    EmptyTable,

    /// No rows left after filtering by trial (and channel allow-list).
    #[error("trial {0} has no rows after filtering")]
    EmptyTrial(i64),

    /// Every channel was rejected by the missing-sample filter.
    #[error("no channel survived the missing-sample filter (trial {0})")]
    DegenerateEpoch(i64),

    /// `apply_clip_bounds` received an array it cannot clip.
    #[error("clip input must be 1-D or 2-D with {expected} features, got shape {shape:?}")]
    ClipShape { expected: usize, shape: Vec<usize> },

    /// Bounds themselves are malformed.
    #[error("malformed clip bounds: {0}")]
    ClipBounds(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Uploaded file name does not carry a `.csv` suffix.
    #[error("only .csv uploads are supported, got '{0}'")]
    UnsupportedUpload(String),

    /// Dataset assembly accepted no file.
    #[error("no file matched the feature schema ({skipped} skipped)")]
    EmptyDataset { skipped: usize },
}

pub type FeatureResult<T> = std::result::Result<T, FeatureError>;
