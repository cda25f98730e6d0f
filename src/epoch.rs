//! Single-trial epoch matrix.
//!
//! Pivots the long table into a dense `[C, n_samples]` grid for one trial:
//!
//! 1. keep rows of the requested trial (and channel allow-list),
//! 2. average duplicate `(channel, sample)` cells,
//! 3. reindex the sample axis to `0..n_samples` (missing → NaN),
//! 4. drop channels whose NaN fraction is `>= max_missing`,
//! 5. linear interpolation along time, constant fill at both edges.
//!
//! Channel rows keep first-appearance order.
use ndarray::Array2;
use tracing::debug;

use crate::error::{FeatureError, FeatureResult};
use crate::table::LongTable;

/// One trial as a dense `[C, T]` matrix with row labels.
#[derive(Debug, Clone)]
pub struct EpochMatrix {
    /// `[C, T]` voltages, every value finite.
    pub data: Array2<f32>,
    /// Row labels, `data.nrows()` entries.
    pub ch_names: Vec<String>,
    pub trial_number: i64,
    pub label: u8,
    pub source_file: String,
}

impl EpochMatrix {
    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// `true` when no channel survived the missing-sample filter.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }
}

/// Which trial / channels to pull out of a long table.
#[derive(Debug, Clone, Default)]
pub struct EpochSelection<'a> {
    /// `None` → trial of the first row.
    pub trial_number: Option<i64>,
    /// `None` → all channels.
    pub channels: Option<&'a [String]>,
}

/// Build the `[C, n_samples]` matrix of one trial.
///
/// Returns [`FeatureError::EmptyTrial`] when filtering leaves no row.  A trial
/// whose channels are all too incomplete yields an *empty* matrix; feature
/// extraction rejects it.
pub fn build_epoch_matrix(
    table: &LongTable,
    selection: &EpochSelection<'_>,
    n_samples: usize,
    max_missing: f32,
) -> FeatureResult<EpochMatrix> {
    let trial = match selection.trial_number {
        Some(t) => t,
        None => table.first_trial()?,
    };
    let label = table.label()?;

    // Pivot: per channel, running (sum, count) per sample.
    let mut ch_names: Vec<String> = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut counts: Vec<Vec<u32>> = Vec::new();
    let mut n_rows = 0usize;

    for rec in table.records.iter().filter(|r| r.trial_number == trial) {
        if let Some(keep) = selection.channels {
            if !keep.iter().any(|c| c == &rec.channel) {
                continue;
            }
        }
        n_rows += 1;
        let ci = match ch_names.iter().position(|c| c == &rec.channel) {
            Some(i) => i,
            None => {
                ch_names.push(rec.channel.clone());
                sums.push(vec![0.0; n_samples]);
                counts.push(vec![0; n_samples]);
                ch_names.len() - 1
            }
        };
        // Samples outside the epoch are dropped by the reindex; NaN readings
        // do not count towards a cell's mean.
        if rec.sample_index < 0 || rec.sample_index as usize >= n_samples {
            continue;
        }
        if !rec.sensor_value.is_finite() {
            continue;
        }
        let t = rec.sample_index as usize;
        sums[ci][t] += rec.sensor_value as f64;
        counts[ci][t] += 1;
    }

    if n_rows == 0 {
        return Err(FeatureError::EmptyTrial(trial));
    }

    let mut kept_names = Vec::new();
    let mut kept_rows: Vec<Vec<f32>> = Vec::new();
    for ((name, s), c) in ch_names.into_iter().zip(sums).zip(counts) {
        let mut row: Vec<f32> = s
            .iter()
            .zip(&c)
            .map(|(&sum, &n)| if n > 0 { (sum / n as f64) as f32 } else { f32::NAN })
            .collect();
        let missing = row.iter().filter(|v| v.is_nan()).count() as f32 / n_samples as f32;
        if missing >= max_missing {
            debug!(channel = %name, missing, "dropping incomplete channel");
            continue;
        }
        fill_gaps(&mut row);
        kept_names.push(name);
        kept_rows.push(row);
    }

    let mut data = Array2::<f32>::zeros((kept_rows.len(), n_samples));
    for (mut dst, src) in data.rows_mut().into_iter().zip(&kept_rows) {
        dst.assign(&ndarray::ArrayView1::from(src.as_slice()));
    }

    Ok(EpochMatrix {
        data,
        ch_names: kept_names,
        trial_number: trial,
        label,
        source_file: table.source_file.clone(),
    })
}

/// Linear interpolation between known samples; leading and trailing gaps take
/// the nearest known value.  A row with no known value is left untouched.
pub fn fill_gaps(row: &mut [f32]) {
    let known: Vec<usize> = (0..row.len()).filter(|&i| !row[i].is_nan()).collect();
    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return;
    };

    let head = row[first];
    for v in &mut row[..first] {
        *v = head;
    }
    let tail = row[last];
    for v in &mut row[last + 1..] {
        *v = tail;
    }
    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (ya, yb) = (row[a], row[b]);
        let span = (b - a) as f32;
        for i in a + 1..b {
            row[i] = ya + (yb - ya) * (i - a) as f32 / span;
        }
    }
}
