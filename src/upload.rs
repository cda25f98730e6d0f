//! Scoped staging of uploaded CSV bytes.
//!
//! The bytes land in a named temporary file (`eeg_upload_*.csv`) that lives
//! exactly as long as the callback; it is removed when the guard drops,
//! whether the callback succeeds, fails or panics.
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::error::FeatureError;
use crate::features::SpectralFeatureSet;
use crate::table::{base_name, read_long_table_file};

const UPLOAD_PREFIX: &str = "eeg_upload_";

/// `true` for `.csv` (any case) and for names without an extension, which
/// are taken to be CSV.
pub fn is_csv_name(file_name: &str) -> bool {
    match Path::new(file_name).extension() {
        None => true,
        Some(ext) => ext.eq_ignore_ascii_case("csv"),
    }
}

/// Stage `bytes` in a temp file and run `f` on its path.
pub fn with_uploaded_csv<T, F>(bytes: &[u8], file_name: &str, f: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    if !is_csv_name(file_name) {
        return Err(FeatureError::UnsupportedUpload(file_name.to_string()).into());
    }
    let mut tmp = tempfile::Builder::new()
        .prefix(UPLOAD_PREFIX)
        .suffix(".csv")
        .tempfile()
        .context("creating upload temp file")?;
    tmp.write_all(bytes).context("writing upload temp file")?;
    tmp.flush().context("writing upload temp file")?;
    f(tmp.path())
}

/// Feature extraction for an upload; `source_file` is the upload's name, not
/// the temp file's.
pub fn extract_features_from_upload(
    bytes: &[u8],
    file_name: &str,
    cfg: &PipelineConfig,
) -> Result<SpectralFeatureSet> {
    with_uploaded_csv(bytes, file_name, |path| {
        let mut table =
            read_long_table_file(path).with_context(|| format!("{file_name}: reading CSV"))?;
        table.source_file = base_name(Path::new(file_name));
        crate::extract_features_from_table(table, cfg)
    })
}
