//! Error types and SNAFU context selectors for the shelf.
//!
//! `ShelfError` is the single error type of the public API. Context selectors
//! are crate-visible so the store, record and aggregation modules attach
//! context the same way.

use arrow::error::ArrowError;
use snafu::prelude::*;

use crate::{layout::SegmentProblem, storage::StorageError};

/// Convenience alias for results returned by shelf operations.
pub type ShelfResult<T> = Result<T, ShelfError>;

/// Errors from shelf construction, record creation and aggregation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ShelfError {
    /// A declared field received no value and has no default.
    #[snafu(display("Field {field} has no value and no default"))]
    MissingRequiredField {
        /// Name of the unresolved field.
        field: String,
    },

    /// A field value cannot be used as a directory name.
    #[snafu(display("Value {value:?} of field {field} is not a valid path segment: {problem}"))]
    InvalidFieldType {
        /// Name of the field.
        field: String,
        /// Text rendering of the rejected value.
        value: String,
        /// Why the rendering was rejected.
        problem: SegmentProblem,
    },

    /// `attach` was called without any table.
    #[snafu(display("No table supplied for payload {file_name} in {record}"))]
    MissingData {
        /// Target payload file name.
        file_name: String,
        /// Record directory.
        record: String,
    },

    /// A metadata document exists but is not a JSON object.
    #[snafu(display("Malformed metadata document at {path}: {reason}"))]
    MalformedMetadata {
        /// Path of the offending document.
        path: String,
        /// Parser message or shape problem.
        reason: String,
    },

    /// A metadata attribute (or field column) would replace a data column.
    #[snafu(display("Metadata key {key} collides with a column of payload {path}"))]
    MetadataFieldCollision {
        /// The colliding key.
        key: String,
        /// Payload file whose column set already contains `key`.
        path: String,
    },

    /// The same field name was declared twice.
    #[snafu(display("Field {field} is declared more than once"))]
    DuplicateField {
        /// The duplicated field name.
        field: String,
    },

    /// A configured name (field, metadata or data file) is unusable.
    #[snafu(display("Invalid {what} name {name:?}: {problem}"))]
    InvalidName {
        /// What the name is for.
        what: &'static str,
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        problem: SegmentProblem,
    },

    /// A field value was supplied for a name the schema does not declare.
    #[snafu(display("Unknown field {field}; declared fields are {declared:?}"))]
    UnknownField {
        /// The unknown name.
        field: String,
        /// Declared field names, in order.
        declared: Vec<String>,
    },

    /// An attribute uses the name of a declared field.
    #[snafu(display("Attribute {key} has the same name as a field"))]
    AttributeShadowsField {
        /// The attribute key.
        key: String,
    },

    /// A declared attribute is missing while attribute enforcement is on.
    #[snafu(display("Declared attribute {attribute} was not supplied"))]
    MissingAttribute {
        /// Name of the missing attribute.
        attribute: String,
    },

    /// A payload file name is not a single visible path segment.
    #[snafu(display("Invalid payload file name {file_name:?}: {problem}"))]
    InvalidFileName {
        /// The rejected file name.
        file_name: String,
        /// Why it was rejected.
        problem: SegmentProblem,
    },

    /// The shelf root has no manifest.
    #[snafu(display("No shelf manifest found at {path}"))]
    MissingManifest {
        /// Expected manifest path.
        path: String,
    },

    /// The manifest on disk disagrees with the requested field layout.
    #[snafu(display(
        "Shelf at {root} was created with fields {persisted:?}, not {requested:?}"
    ))]
    ManifestMismatch {
        /// Shelf root.
        root: String,
        /// Field names recorded in the manifest.
        persisted: Vec<String>,
        /// Field names requested by the caller.
        requested: Vec<String>,
    },

    /// The manifest on disk records a different data or metadata file name.
    #[snafu(display(
        "Shelf at {root} stores its {what} under {persisted:?}, not {requested:?}"
    ))]
    ManifestNameMismatch {
        /// Shelf root.
        root: String,
        /// Which name disagrees (`data` or `metadata`).
        what: &'static str,
        /// Name recorded in the manifest.
        persisted: String,
        /// Name requested by the caller.
        requested: String,
    },

    /// Filesystem error.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// Underlying storage error.
        #[snafu(source, backtrace)]
        source: StorageError,
    },

    /// CSV encode/decode or Arrow compute error.
    #[snafu(display("CSV/Arrow error at {path}: {source}"))]
    Csv {
        /// File being read or written, or the payload stem during merge.
        path: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// JSON encode error while writing a metadata document or manifest.
    #[snafu(display("JSON error at {path}: {source}"))]
    Json {
        /// Target path.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },
}

impl From<StorageError> for ShelfError {
    fn from(source: StorageError) -> Self {
        ShelfError::Storage { source }
    }
}
