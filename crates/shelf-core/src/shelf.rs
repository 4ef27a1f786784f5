//! The shelf: field schema, naming conventions and record creation.
//!
//! A [`Shelf`] is configured once through [`ShelfBuilder`] and then hands out
//! [`Record`]s. Creating a record resolves every field (caller value, then
//! generator, then fixed default), validates the resulting path segments and
//! attributes, and only then touches the filesystem.
//!
//! ```rust,ignore
//! let shelf = Shelf::builder("/data/runs")
//!     .field("experiment")
//!     .field(FieldSpec::date("day", None))
//!     .attribute("operator")
//!     .build()?;
//!
//! let mut record = shelf.create(
//!     NewRecord::new()
//!         .field("experiment", "baseline")
//!         .attribute("operator", "ada"),
//! )?;
//! record.save(&[batch])?;
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use arrow::array::RecordBatch;
use snafu::prelude::*;

use crate::{
    aggregate::{self, ScanOptions},
    error::{
        AttributeShadowsFieldSnafu, DuplicateFieldSnafu, InvalidFieldTypeSnafu, InvalidNameSnafu,
        ManifestMismatchSnafu, ManifestNameMismatchSnafu, MissingAttributeSnafu, MissingRequiredFieldSnafu, ShelfResult,
        UnknownFieldSnafu,
    },
    field::{FieldSpec, FieldValue},
    layout::{self, DEFAULT_DATA_NAME, DEFAULT_METADATA_NAME, check_segment},
    manifest::ShelfManifest,
    metadata::{Attributes, MetaValue, MetadataEncoder},
    record::Record,
    storage::{self, OnExisting},
};

/// Input to [`Shelf::create`]: typed field values plus an open attribute map.
///
/// Field values and attributes are kept apart so a misspelled field name is
/// reported instead of silently becoming metadata.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    /// Values keyed by declared field name. Omitted fields use their default.
    pub fields: BTreeMap<String, FieldValue>,
    /// Metadata attributes.
    pub attributes: Attributes,
}

impl NewRecord {
    /// An empty request: every field falls back to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a metadata attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Builder for [`Shelf`].
#[derive(Debug, Clone)]
pub struct ShelfBuilder {
    root: PathBuf,
    fields: Vec<FieldSpec>,
    attributes: Vec<String>,
    data_name: String,
    metadata_name: String,
    on_existing: OnExisting,
    require_attributes: bool,
    encoder: MetadataEncoder,
}

impl ShelfBuilder {
    fn new(root: PathBuf) -> Self {
        ShelfBuilder {
            root,
            fields: Vec::new(),
            attributes: Vec::new(),
            data_name: DEFAULT_DATA_NAME.to_string(),
            metadata_name: DEFAULT_METADATA_NAME.to_string(),
            on_existing: OnExisting::default(),
            require_attributes: false,
            encoder: MetadataEncoder::default(),
        }
    }

    /// Append a field. Plain strings declare required fields.
    pub fn field(mut self, field: impl Into<FieldSpec>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Append several fields.
    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSpec>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declare a metadata attribute name.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// Base name of the payload written by [`Record::save`]. Default `data`.
    pub fn data_name(mut self, name: impl Into<String>) -> Self {
        self.data_name = name.into();
        self
    }

    /// Base name of the metadata document. Default `metadata`.
    pub fn metadata_name(mut self, name: impl Into<String>) -> Self {
        self.metadata_name = name.into();
        self
    }

    /// Policy for writes that hit an existing file. Default [`OnExisting::Warn`].
    pub fn on_existing(mut self, policy: OnExisting) -> Self {
        self.on_existing = policy;
        self
    }

    /// Fail record creation when a declared attribute is missing.
    pub fn require_attributes(mut self, require: bool) -> Self {
        self.require_attributes = require;
        self
    }

    /// Replace the metadata normalization chain.
    pub fn encoder(mut self, encoder: MetadataEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Validate the configuration, create the root and write the manifest.
    ///
    /// Fails with [`ShelfError::ManifestMismatch`](crate::ShelfError::ManifestMismatch)
    /// when the root already holds a shelf with different field names, and
    /// with [`ShelfError::ManifestNameMismatch`](crate::ShelfError::ManifestNameMismatch)
    /// when it stores its data or metadata files under other names.
    pub fn build(self) -> ShelfResult<Shelf> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if let Err(problem) = check_segment(field.name()) {
                return InvalidNameSnafu {
                    what: "field",
                    name: field.name(),
                    problem,
                }
                .fail();
            }
            ensure!(
                seen.insert(field.name()),
                DuplicateFieldSnafu {
                    field: field.name()
                }
            );
        }
        if let Err(problem) = layout::payload_file_name(&self.data_name) {
            return InvalidNameSnafu {
                what: "data",
                name: self.data_name.as_str(),
                problem,
            }
            .fail();
        }
        if let Err(problem) = check_segment(&self.metadata_name) {
            return InvalidNameSnafu {
                what: "metadata",
                name: self.metadata_name.as_str(),
                problem,
            }
            .fail();
        }

        let field_names: Vec<String> = self.fields.iter().map(|f| f.name().to_string()).collect();
        if let Some(existing) = ShelfManifest::read(&self.root)? {
            ensure!(
                existing.fields == field_names,
                ManifestMismatchSnafu {
                    root: self.root.display().to_string(),
                    persisted: existing.fields,
                    requested: field_names,
                }
            );
            for (what, persisted, requested) in [
                ("data", &existing.data_name, &self.data_name),
                ("metadata", &existing.metadata_name, &self.metadata_name),
            ] {
                ensure!(
                    persisted == requested,
                    ManifestNameMismatchSnafu {
                        root: self.root.display().to_string(),
                        what,
                        persisted: persisted.as_str(),
                        requested: requested.as_str(),
                    }
                );
            }
        }

        storage::ensure_dir(&self.root)?;
        ShelfManifest::new(
            field_names,
            self.attributes.clone(),
            self.data_name.as_str(),
            self.metadata_name.as_str(),
        )
        .write(&self.root)?;

        Ok(Shelf {
            root: self.root,
            fields: self.fields,
            attributes: self.attributes,
            data_name: self.data_name,
            metadata_name: self.metadata_name,
            on_existing: self.on_existing,
            require_attributes: self.require_attributes,
            encoder: self.encoder,
        })
    }
}

/// Filesystem-backed structured storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct Shelf {
    root: PathBuf,
    fields: Vec<FieldSpec>,
    attributes: Vec<String>,
    data_name: String,
    metadata_name: String,
    on_existing: OnExisting,
    require_attributes: bool,
    encoder: MetadataEncoder,
}

impl Shelf {
    /// Start configuring a shelf rooted at `root`.
    pub fn builder(root: impl Into<PathBuf>) -> ShelfBuilder {
        ShelfBuilder::new(root.into())
    }

    /// Re-open an existing shelf from its manifest.
    ///
    /// Default rules are not persisted, so every field of the re-opened shelf
    /// is required.
    pub fn open(root: impl Into<PathBuf>) -> ShelfResult<Self> {
        let root = root.into();
        let manifest = ShelfManifest::require(&root)?;

        let mut builder = ShelfBuilder::new(root)
            .fields(manifest.fields)
            .data_name(manifest.data_name)
            .metadata_name(manifest.metadata_name);
        for attribute in manifest.attributes {
            builder = builder.attribute(attribute);
        }
        builder.build()
    }

    /// Create (or re-create) the record addressed by `request`'s field values.
    ///
    /// All validation happens before the first filesystem write: unknown
    /// field names, unresolvable fields, values that are not valid path
    /// segments, attributes named like fields, and (when enabled) missing
    /// declared attributes. The record directory and metadata document are
    /// then written synchronously.
    pub fn create(&self, request: NewRecord) -> ShelfResult<Record> {
        let NewRecord {
            mut fields,
            attributes,
        } = request;

        if let Some(unknown) = fields
            .keys()
            .find(|name| !self.fields.iter().any(|f| f.name() == name.as_str()))
        {
            return UnknownFieldSnafu {
                field: unknown.as_str(),
                declared: self.field_names(),
            }
            .fail();
        }

        let mut resolved = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let value = spec
                .resolve(fields.remove(spec.name()))
                .context(MissingRequiredFieldSnafu { field: spec.name() })?;
            resolved.push((spec.name(), value));
        }

        let mut segments = Vec::with_capacity(resolved.len());
        for (name, value) in resolved {
            let segment = value.to_segment().map_err(|problem| {
                InvalidFieldTypeSnafu {
                    field: name,
                    value: value.to_string(),
                    problem,
                }
                .build()
            })?;
            segments.push((name.to_string(), segment));
        }

        if let Some(key) = attributes
            .keys()
            .find(|key| self.fields.iter().any(|f| f.name() == key.as_str()))
        {
            return AttributeShadowsFieldSnafu { key: key.as_str() }.fail();
        }
        if self.require_attributes {
            if let Some(missing) = self
                .attributes
                .iter()
                .find(|name| !attributes.contains_key(name.as_str()))
            {
                return MissingAttributeSnafu {
                    attribute: missing.as_str(),
                }
                .fail();
            }
        }

        let path = self.root.join(layout::record_rel_dir(
            &segments.iter().map(|(_, s)| s.as_str()).collect::<Vec<_>>(),
        ));
        let metadata = self.encoder.encode_document(&attributes);

        Record::materialize(
            path,
            segments,
            metadata,
            self.data_name.clone(),
            self.metadata_name.clone(),
            self.on_existing,
        )
    }

    /// Aggregate every record under this shelf's root.
    pub fn load_all(&self) -> ShelfResult<BTreeMap<String, RecordBatch>> {
        aggregate::load_all_with(&self.root, &self.scan_options())
    }

    /// Scan options matching this shelf's layout.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::new(self.field_names()).metadata_name(self.metadata_name.clone())
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Declared fields, in nesting order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field names, in nesting order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_string()).collect()
    }

    /// Declared attribute names.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Base name of the default payload file.
    pub fn data_name(&self) -> &str {
        &self.data_name
    }

    /// Base name of the metadata document.
    pub fn metadata_name(&self) -> &str {
        &self.metadata_name
    }
}
