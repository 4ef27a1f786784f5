//! Reconstruct aggregated tables from a shelf's directory tree.
//!
//! The scan works from the filesystem alone:
//!
//! 1. Walk every non-hidden directory under the root.
//! 2. Directories exactly as deep as the schema has fields are candidate
//!    records; their path segments are bound to field names by position.
//! 3. Each candidate's payload files (`*.csv`) are loaded, and every metadata
//!    attribute is broadcast into a column.
//! 4. Tables are grouped by payload file stem and concatenated over the union
//!    of their columns.
//!
//! Candidates are visited in lexicographic order of their relative path, so
//! the row order of every aggregated table is reproducible.
//!
//! A candidate that holds metadata but no payload yet (or payload but no
//! metadata) is not an error: it simply contributes what it has.

mod columns;
mod merge;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use arrow::array::RecordBatch;
use log::debug;
use serde_json::Value;
use snafu::{IntoError, prelude::*};
use walkdir::WalkDir;

use crate::{
    error::{
        MalformedMetadataSnafu, ManifestMismatchSnafu, ManifestNameMismatchSnafu, ShelfResult,
    },
    formats::csv::read_csv,
    layout::{self, DEFAULT_METADATA_NAME, PAYLOAD_EXT},
    manifest::ShelfManifest,
    metadata::MetadataDocument,
    storage::{self, BackendError, OtherIoSnafu},
};

pub use merge::concat_aligned;

/// How to interpret a directory tree during aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    field_names: Vec<String>,
    metadata_name: String,
    payload_ext: String,
    field_columns: bool,
}

impl ScanOptions {
    /// Scan for records nested under `field_names`, in order.
    pub fn new<I, S>(field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScanOptions {
            field_names: field_names.into_iter().map(Into::into).collect(),
            metadata_name: DEFAULT_METADATA_NAME.to_string(),
            payload_ext: PAYLOAD_EXT.to_string(),
            field_columns: false,
        }
    }

    /// Options matching a persisted manifest.
    pub fn from_manifest(manifest: &ShelfManifest) -> Self {
        Self::new(manifest.fields.iter().cloned()).metadata_name(manifest.metadata_name.clone())
    }

    /// Base name of the metadata document. Default `metadata`.
    pub fn metadata_name(mut self, name: impl Into<String>) -> Self {
        self.metadata_name = name.into();
        self
    }

    /// Extension identifying payload files. Default `csv`.
    pub fn payload_ext(mut self, ext: impl Into<String>) -> Self {
        self.payload_ext = ext.into();
        self
    }

    /// Also add one column per field holding the record's path segment.
    pub fn with_field_columns(mut self, enabled: bool) -> Self {
        self.field_columns = enabled;
        self
    }

    /// Field names, in nesting order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }
}

/// A directory at record depth, before any file is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute directory path.
    pub dir: PathBuf,
    /// `(field name, segment)` pairs bound by position.
    pub fields: Vec<(String, String)>,
    /// Payload files directly inside `dir`, sorted by name.
    pub payloads: Vec<PathBuf>,
    /// The metadata document, if present.
    pub metadata: Option<PathBuf>,
}

/// Aggregate a shelf using the layout recorded in its manifest.
pub fn load_all(root: impl AsRef<Path>) -> ShelfResult<BTreeMap<String, RecordBatch>> {
    let root = root.as_ref();
    let manifest = ShelfManifest::require(root)?;
    scan(root, &ScanOptions::from_manifest(&manifest))
}

/// Aggregate the tree under `root` using explicit `options`.
///
/// When the root carries a manifest, its field names and metadata name must
/// match `options`; trees without a manifest are scanned on depth alone.
pub fn load_all_with(
    root: impl AsRef<Path>,
    options: &ScanOptions,
) -> ShelfResult<BTreeMap<String, RecordBatch>> {
    let root = root.as_ref();
    if let Some(manifest) = ShelfManifest::read(root)? {
        ensure!(
            manifest.fields == options.field_names,
            ManifestMismatchSnafu {
                root: root.display().to_string(),
                persisted: manifest.fields,
                requested: options.field_names.clone(),
            }
        );
        ensure!(
            manifest.metadata_name == options.metadata_name,
            ManifestNameMismatchSnafu {
                root: root.display().to_string(),
                what: "metadata",
                persisted: manifest.metadata_name,
                requested: options.metadata_name.clone(),
            }
        );
    }
    scan(root, options)
}

fn scan(root: &Path, options: &ScanOptions) -> ShelfResult<BTreeMap<String, RecordBatch>> {
    let mut groups: BTreeMap<String, Vec<RecordBatch>> = BTreeMap::new();

    for candidate in discover(root, options)? {
        for (stem, batch) in load_candidate(&candidate, options)? {
            groups.entry(stem).or_default().push(batch);
        }
    }

    groups
        .into_iter()
        .map(|(stem, batches)| {
            let table = concat_aligned(&stem, &batches)?;
            Ok((stem, table))
        })
        .collect()
}

/// List candidate record directories under `root`, sorted by relative path.
pub fn discover(root: &Path, options: &ScanOptions) -> ShelfResult<Vec<Candidate>> {
    let depth = options.field_names.len();
    let metadata_file = layout::metadata_file_name(&options.metadata_name);
    let mut candidates = Vec::new();

    let walker = WalkDir::new(root)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        // The root itself may have a hidden name (temp dirs often do).
        .filter_entry(|e| e.depth() == 0 || !layout::is_hidden(&e.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).display().to_string();
            OtherIoSnafu { path }.into_error(BackendError::Walk(e))
        })?;
        if entry.depth() != depth || !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.into_path();
        let rel = dir.strip_prefix(root).unwrap_or(&dir);
        let fields = options
            .field_names
            .iter()
            .cloned()
            .zip(rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()))
            .collect();

        let (payloads, metadata) = list_record_files(&dir, &metadata_file, &options.payload_ext)?;
        debug!(
            "Candidate record {} ({} payloads, metadata: {})",
            dir.display(),
            payloads.len(),
            metadata.is_some()
        );

        candidates.push(Candidate {
            dir,
            fields,
            payloads,
            metadata,
        });
    }

    Ok(candidates)
}

fn list_record_files(
    dir: &Path,
    metadata_file: &str,
    payload_ext: &str,
) -> ShelfResult<(Vec<PathBuf>, Option<PathBuf>)> {
    let entries = fs::read_dir(dir)
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: dir.display().to_string(),
        })?;

    let mut payloads = Vec::new();
    let mut metadata = None;
    for entry in entries {
        let entry = entry.map_err(BackendError::Local).context(OtherIoSnafu {
            path: dir.display().to_string(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if layout::is_hidden(&name) {
            continue;
        }
        if name == metadata_file {
            metadata = Some(path);
        } else if path.extension().is_some_and(|ext| ext == payload_ext) {
            payloads.push(path);
        }
    }
    payloads.sort();

    Ok((payloads, metadata))
}

/// Parse a metadata document, insisting on a JSON object.
pub fn read_metadata(path: &Path) -> ShelfResult<MetadataDocument> {
    let text = storage::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        MalformedMetadataSnafu {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .build()
    })?;

    match value {
        Value::Object(doc) => Ok(doc),
        other => MalformedMetadataSnafu {
            path: path.display().to_string(),
            reason: format!("expected a JSON object, found {}", json_kind(&other)),
        }
        .fail(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Load every payload of `candidate`, decorated with its metadata columns.
fn load_candidate(
    candidate: &Candidate,
    options: &ScanOptions,
) -> ShelfResult<Vec<(String, RecordBatch)>> {
    let metadata = candidate
        .metadata
        .as_deref()
        .map(read_metadata)
        .transpose()?;

    let mut tables = Vec::with_capacity(candidate.payloads.len());
    for payload in &candidate.payloads {
        let stem = payload
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let where_ = payload.display().to_string();

        let mut batch = read_csv(payload)?;
        if options.field_columns {
            for (name, segment) in &candidate.fields {
                batch = columns::append_constant(
                    &batch,
                    name,
                    &Value::String(segment.clone()),
                    &where_,
                )?;
            }
        }
        if let Some(doc) = &metadata {
            for (key, value) in doc {
                batch = columns::append_constant(&batch, key, value, &where_)?;
            }
        }

        tables.push((stem, batch));
    }

    Ok(tables)
}
