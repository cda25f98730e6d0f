//! Long-form SMNI table reader.
//!
//! One CSV row is one sample of one channel of one trial:
//!
//! ```text
//! "",trial number,sensor position,sample num,sensor value,subject identifier,matching condition,channel,name,time
//! 0,0,FP1,0,-8.921,a,S1 obj,0,co2a0000364,0.0
//! ```
//!
//! Headers are normalised (`trim → lowercase → ' ' → '_'`), `sensor_position`
//! becomes `channel` and an existing numeric `channel` column is moved out of
//! the way to `channel_id`.  Any row that does not parse fails the whole file.
use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::error::{FeatureError, FeatureResult};

/// One sample of the long-form table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1 = alcoholic (`a`), 0 = control (`c`).
    pub label: u8,
    pub channel: String,
    pub trial_number: i64,
    pub sample_index: i64,
    pub sensor_value: f32,
}

/// All rows of one file, plus the file's base name.
#[derive(Debug, Clone)]
pub struct LongTable {
    pub source_file: String,
    pub records: Vec<RawRecord>,
}

impl LongTable {
    /// Trial number of the first row.
    pub fn first_trial(&self) -> FeatureResult<i64> {
        self.records.first().map(|r| r.trial_number).ok_or(FeatureError::EmptyTable)
    }

    /// Label of the first row.
    pub fn label(&self) -> FeatureResult<u8> {
        self.records.first().map(|r| r.label).ok_or(FeatureError::EmptyTable)
    }
}

/// Canonical column name: trimmed, lower-case, spaces replaced by `_`.
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Map a subject identifier to the binary label.
pub fn subject_label(id: &str) -> Option<u8> {
    match id.trim() {
        "a" => Some(1),
        "c" => Some(0),
        _ => None,
    }
}

struct Columns {
    subject: usize,
    channel: usize,
    trial: usize,
    sample: usize,
    value: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> FeatureResult<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| match normalize_column(h).as_str() {
                "sensor_position" => "channel".to_string(),
                "channel" => "channel_id".to_string(),
                other => other.to_string(),
            })
            .collect();
        let find = |col: &'static str| {
            names.iter().position(|n| n == col).ok_or(FeatureError::MissingColumn(col))
        };
        Ok(Self {
            subject: find("subject_identifier")?,
            channel: find("channel")?,
            trial: find("trial_number")?,
            sample: find("sample_num")?,
            value: find("sensor_value")?,
        })
    }
}

/// Parse a CSV stream into a [`LongTable`].
pub fn read_long_table<R: Read>(reader: R, source_file: &str) -> FeatureResult<LongTable> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| FeatureError::Csv { row: 0, message: e.to_string() })?
        .clone();
    let cols = Columns::locate(&headers)?;

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // 1-based data row number (header is row 0).
        let row = i + 1;
        let rec = result.map_err(|e| FeatureError::Csv { row, message: e.to_string() })?;
        let field = |idx: usize| rec.get(idx).unwrap_or("").trim();

        let subject = field(cols.subject);
        let label = subject_label(subject)
            .ok_or_else(|| FeatureError::UnknownSubject { row, value: subject.to_string() })?;

        let channel = field(cols.channel);
        if channel.is_empty() {
            return Err(FeatureError::Csv { row, message: "empty channel name".into() });
        }

        records.push(RawRecord {
            label,
            channel: channel.to_string(),
            trial_number: parse_integral(field(cols.trial), row, "trial_number")?,
            sample_index: parse_integral(field(cols.sample), row, "sample_num")?,
            sensor_value: field(cols.value).parse().map_err(|_| FeatureError::Csv {
                row,
                message: format!("sensor_value {:?} is not a number", field(cols.value)),
            })?,
        });
    }

    if records.is_empty() {
        return Err(FeatureError::EmptyTable);
    }
    Ok(LongTable { source_file: source_file.to_string(), records })
}

/// Read a CSV file; the table's `source_file` is the file's base name.
pub fn read_long_table_file(path: &Path) -> anyhow::Result<LongTable> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(read_long_table(file, &base_name(path))?)
}

/// File name without directories, falling back to the full path.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Integers may be written as `3` or `3.0`; fractional values are rejected.
fn parse_integral(s: &str, row: usize, column: &str) -> FeatureResult<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(FeatureError::Csv { row, message: format!("{column} {s:?} is not an integer") }),
    }
}
