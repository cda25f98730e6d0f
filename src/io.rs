//! Safetensors I/O for assembled datasets.
//!
//! Writer: [`StWriter`] builds a safetensors file from F32 / I64 tensors plus
//! a string `__metadata__` map.  [`write_assembled`] lays out one split:
//!
//! ```text
//!   td      [n, n_td]   F32        __metadata__.td_cols  JSON list
//!   bp      [n, n_bp]   F32        __metadata__.bp_cols  JSON list
//!   spec    [n, F, T]   F32        __metadata__.groups   JSON list
//!   label   [n]         I64
//!   spec_f  [F]         F32
//!   spec_t  [T]         F32
//! ```
//!
//! Reader: [`StFile`] parses the header back, for inspection and tests.
use anyhow::{bail, Context, Result};
use ndarray::{ArrayD, IxDyn};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::dataset::AssembledSet;
use crate::features::FeatureSchema;

// ── Writer ────────────────────────────────────────────────────────────────────

/// Simple safetensors file writer for F32 and I64 tensors.
///
/// ```rust,no_run
/// use eegfeat::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_i64("label", &[1, 0, 1], &[3]);
/// w.add_metadata("note", "three samples");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
    metadata: BTreeMap<String, String>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    /// Any-dimensional array, written in logical (row-major) order.
    pub fn add_f32_array<D>(&mut self, name: &str, arr: &ndarray::Array<f32, D>)
    where
        D: ndarray::Dimension,
    {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, arr.shape());
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header_map.insert("__metadata__".into(), serde_json::to_value(&self.metadata)?);
        }
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;

        let mut out = Vec::with_capacity(8 + hdr_bytes.len() + pad + offset);
        out.extend_from_slice(&((hdr_bytes.len() + pad) as u64).to_le_bytes());
        out.extend_from_slice(&hdr_bytes);
        out.extend(std::iter::repeat(b' ').take(pad));
        for (_, data, _, _) in &self.entries {
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }
}

/// Write one assembled split with its schema.
pub fn write_assembled(set: &AssembledSet, schema: &FeatureSchema, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f32_array("td", &set.td);
    w.add_f32_array("bp", &set.bp);
    w.add_f32_array("spec", &set.spec);
    w.add_i64("label", set.labels.as_slice().context("labels not contiguous")?, &[set.len()]);
    w.add_f32("spec_f", &schema.spec_f, &[schema.spec_f.len()]);
    w.add_f32("spec_t", &schema.spec_t, &[schema.spec_t.len()]);
    w.add_metadata("td_cols", &serde_json::to_string(&schema.td_cols)?);
    w.add_metadata("bp_cols", &serde_json::to_string(&schema.bp_cols)?);
    w.add_metadata("groups", &serde_json::to_string(&set.groups)?);
    w.add_metadata("skipped", &set.skipped.to_string());
    w.write(path)
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// A parsed safetensors file.
pub struct StFile {
    bytes: Vec<u8>,
    data_start: usize,
    header: HashMap<String, serde_json::Value>,
}

impl StFile {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 8 {
            bail!("safetensors file too small");
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        let n = u64::from_le_bytes(len) as usize;
        if bytes.len() < 8 + n {
            bail!("safetensors header truncated");
        }
        let header: HashMap<String, serde_json::Value> =
            serde_json::from_slice(&bytes[8..8 + n]).context("failed to parse safetensors header")?;
        Ok(Self { bytes, data_start: 8 + n, header })
    }

    /// Tensor names, sorted, without `__metadata__`.
    pub fn names(&self) -> Vec<String> {
        let mut v: Vec<String> =
            self.header.keys().filter(|k| *k != "__metadata__").cloned().collect();
        v.sort();
        v
    }

    pub fn metadata(&self) -> HashMap<String, String> {
        self.header
            .get("__metadata__")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default()
    }

    fn raw(&self, name: &str, dtype: &str) -> Result<(&[u8], Vec<usize>)> {
        let entry = self.header.get(name).with_context(|| format!("missing '{name}' tensor"))?;
        if entry["dtype"].as_str() != Some(dtype) {
            bail!("tensor '{name}' is {}, expected {dtype}", entry["dtype"]);
        }
        let offsets: Vec<usize> = serde_json::from_value(entry["data_offsets"].clone())
            .with_context(|| format!("bad data_offsets for '{name}'"))?;
        let shape: Vec<usize> = serde_json::from_value(entry["shape"].clone())
            .with_context(|| format!("bad shape for '{name}'"))?;
        let (s, e) = match offsets.as_slice() {
            [s, e] if s <= e && self.data_start + e <= self.bytes.len() => (*s, *e),
            _ => bail!("data_offsets for '{name}' out of range"),
        };
        Ok((&self.bytes[self.data_start + s..self.data_start + e], shape))
    }

    pub fn tensor_f32(&self, name: &str) -> Result<ArrayD<f32>> {
        let (raw, shape) = self.raw(name, "F32")?;
        let data: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }

    pub fn tensor_i64(&self, name: &str) -> Result<ArrayD<i64>> {
        let (raw, shape) = self.raw(name, "I64")?;
        let data: Vec<i64> = raw
            .chunks_exact(8)
            .map(|b| {
                let mut le = [0u8; 8];
                le.copy_from_slice(b);
                i64::from_le_bytes(le)
            })
            .collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }
}
