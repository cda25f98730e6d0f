//! Dataset assembly across files.
//!
//! The first accepted file fixes the [`FeatureSchema`] unless one is passed
//! in; every later file must match it exactly or it is skipped and counted.
//! Files are never padded or truncated to fit.
//!
//! ```text
//! train files ─ assemble(None)   ─→ train set + schema
//! test files  ─ assemble(schema) ─→ test set
//! ```
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use ndarray::{Array1, Array2, Array3};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{FeatureError, FeatureResult};
use crate::features::{FeatureSchema, SchemaMismatch, SpectralFeatureSet};

/// Stacked features of the accepted files.
#[derive(Debug, Clone)]
pub struct AssembledSet {
    /// `[n, n_td]`
    pub td: Array2<f32>,
    /// `[n, n_bp]`
    pub bp: Array2<f32>,
    /// `[n, F, T]`
    pub spec: Array3<f32>,
    pub labels: Array1<i64>,
    /// Source file of every row.
    pub groups: Vec<String>,
    pub skipped: usize,
}

impl AssembledSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows per label.
    pub fn label_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for &y in self.labels.iter() {
            *counts.entry(y).or_insert(0) += 1;
        }
        counts
    }
}

/// Outcome of [`Assembler::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Skipped(SchemaMismatch),
}

/// Incremental stacker.
#[derive(Debug)]
pub struct Assembler {
    schema: Option<FeatureSchema>,
    td: Vec<f32>,
    bp: Vec<f32>,
    spec: Vec<f32>,
    labels: Vec<i64>,
    groups: Vec<String>,
    skipped: usize,
}

impl Assembler {
    pub fn new(schema: Option<FeatureSchema>) -> Self {
        Self {
            schema,
            td: Vec::new(),
            bp: Vec::new(),
            spec: Vec::new(),
            labels: Vec::new(),
            groups: Vec::new(),
            skipped: 0,
        }
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn push(&mut self, set: SpectralFeatureSet) -> Admission {
        match self.schema.as_ref().map(|s| s.check(&set)) {
            None => self.schema = Some(set.schema()),
            Some(Err(why)) => {
                warn!(file = %set.source_file, %why, "skipping file: schema mismatch");
                self.skipped += 1;
                return Admission::Skipped(why);
            }
            Some(Ok(())) => {}
        }
        self.td.extend_from_slice(&set.td_feats);
        self.bp.extend_from_slice(&set.bp_feats);
        self.spec.extend(set.spec_img.iter().copied());
        self.labels.push(set.label as i64);
        self.groups.push(set.source_file);
        Admission::Accepted
    }

    /// Stack the accepted rows.  Fails with [`FeatureError::EmptyDataset`]
    /// when nothing was accepted.
    pub fn finish(self) -> FeatureResult<(AssembledSet, FeatureSchema)> {
        let n = self.labels.len();
        let schema = match self.schema {
            Some(s) if n > 0 => s,
            _ => return Err(FeatureError::EmptyDataset { skipped: self.skipped }),
        };
        let shape_err =
            |e: ndarray::ShapeError| FeatureError::InvalidConfig(format!("stacking features: {e}"));
        let td = Array2::from_shape_vec((n, schema.td_cols.len()), self.td).map_err(shape_err)?;
        let bp = Array2::from_shape_vec((n, schema.bp_cols.len()), self.bp).map_err(shape_err)?;
        let spec_dim = (n, schema.spec_f.len(), schema.spec_t.len());
        let spec = Array3::from_shape_vec(spec_dim, self.spec).map_err(shape_err)?;
        let set = AssembledSet {
            td,
            bp,
            spec,
            labels: Array1::from(self.labels),
            groups: self.groups,
            skipped: self.skipped,
        };
        info!(rows = n, skipped = set.skipped, labels = ?set.label_counts(), "dataset assembled");
        Ok((set, schema))
    }
}

/// Extract and stack `paths` in order.  A file that fails extraction aborts
/// the whole assembly with the file's name in the error chain.
pub fn assemble_files<P: AsRef<Path>>(
    paths: &[P],
    cfg: &PipelineConfig,
    schema: Option<FeatureSchema>,
) -> Result<(AssembledSet, FeatureSchema)> {
    let mut asm = Assembler::new(schema);
    for path in paths {
        let set = crate::extract_features_from_file(path.as_ref(), cfg)?;
        asm.push(set);
    }
    Ok(asm.finish()?)
}

/// Train and test splits sharing one schema.
#[derive(Debug, Clone)]
pub struct DatasetBundle {
    pub train: AssembledSet,
    pub test: AssembledSet,
    pub schema: FeatureSchema,
}

/// Assemble `train` (establishing the schema), then `test` against it.
pub fn build_train_test<P: AsRef<Path>>(
    train: &[P],
    test: &[P],
    cfg: &PipelineConfig,
) -> Result<DatasetBundle> {
    let (train_set, schema) = assemble_files(train, cfg, None)?;
    let (test_set, schema) = assemble_files(test, cfg, Some(schema))?;
    info!(
        train = train_set.len(),
        test = test_set.len(),
        train_labels = ?train_set.label_counts(),
        test_labels = ?test_set.label_counts(),
        "train/test bundle ready"
    );
    Ok(DatasetBundle { train: train_set, test: test_set, schema })
}
