//! A materialized record: one directory, one metadata document, zero or more
//! payload tables.

use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use log::info;
use snafu::prelude::*;

use crate::{
    error::{InvalidFileNameSnafu, JsonSnafu, MissingDataSnafu, ShelfResult},
    formats::csv::write_csv,
    layout,
    metadata::MetadataDocument,
    storage::{self, OnExisting, WriteOutcome},
};

/// One file write performed by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// Absolute path of the written file.
    pub path: PathBuf,
    /// What happened at that path.
    pub outcome: WriteOutcome,
}

/// A storage location addressed by a full tuple of field values.
///
/// Constructing a record writes its metadata document immediately; payloads
/// are written later through [`Record::attach`] / [`Record::save`].
#[derive(Debug, Clone)]
pub struct Record {
    path: PathBuf,
    fields: Vec<(String, String)>,
    metadata: MetadataDocument,
    data_name: String,
    metadata_name: String,
    on_existing: OnExisting,
    writes: Vec<WriteReport>,
}

impl Record {
    /// Bind a record to `path` and persist `metadata` there.
    pub(crate) fn materialize(
        path: PathBuf,
        fields: Vec<(String, String)>,
        metadata: MetadataDocument,
        data_name: String,
        metadata_name: String,
        on_existing: OnExisting,
    ) -> ShelfResult<Self> {
        let mut record = Record {
            path,
            fields,
            metadata,
            data_name,
            metadata_name,
            on_existing,
            writes: Vec::new(),
        };
        record.attach_metadata()?;
        info!("Created record at: {}", record.path.display());
        Ok(record)
    }

    /// Ensure the directory exists and (re)write the metadata document.
    ///
    /// An existing document is handled according to the shelf's
    /// [`OnExisting`] policy; under the default policy it is overwritten and
    /// a warning is logged.
    pub fn attach_metadata(&mut self) -> ShelfResult<WriteOutcome> {
        storage::ensure_dir(&self.path)?;

        let target = self.metadata_path();
        let json = serde_json::to_vec_pretty(&self.metadata).context(JsonSnafu {
            path: target.display().to_string(),
        })?;
        let outcome = storage::write_bytes(&target, self.on_existing, &json)?;

        self.writes.push(WriteReport {
            path: target,
            outcome,
        });
        Ok(outcome)
    }

    /// Write `table` as CSV to `file_name` inside the record directory.
    ///
    /// `file_name` gets a `.csv` extension when it has none; any other
    /// extension (including the metadata document's `.json`) is rejected
    /// with [`ShelfError::InvalidFileName`](crate::ShelfError::InvalidFileName).
    /// An empty `table` slice means no table was supplied and fails with
    /// [`ShelfError::MissingData`](crate::ShelfError::MissingData) before
    /// anything is written.
    pub fn attach(&mut self, table: &[RecordBatch], file_name: &str) -> ShelfResult<&mut Self> {
        let file_name = layout::payload_file_name(file_name).map_err(|problem| {
            InvalidFileNameSnafu {
                file_name,
                problem,
            }
            .build()
        })?;
        ensure!(
            !table.is_empty(),
            MissingDataSnafu {
                file_name,
                record: self.path.display().to_string(),
            }
        );

        let target = self.path.join(&file_name);
        let outcome = write_csv(&target, self.on_existing, table)?;
        if outcome != WriteOutcome::Skipped {
            info!("Saved data to: {}", target.display());
        }

        self.writes.push(WriteReport {
            path: target,
            outcome,
        });
        Ok(self)
    }

    /// Attach `table` under the shelf's default payload name.
    pub fn save(&mut self, table: &[RecordBatch]) -> ShelfResult<&mut Self> {
        let name = self.data_name.clone();
        self.attach(table, &name)
    }

    /// Record directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the metadata document.
    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(layout::metadata_file_name(&self.metadata_name))
    }

    /// Resolved field values as `(name, segment)` pairs, in schema order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// The normalized metadata document.
    pub fn metadata(&self) -> &MetadataDocument {
        &self.metadata
    }

    /// Every write this record has performed, oldest first.
    pub fn writes(&self) -> &[WriteReport] {
        &self.writes
    }

    /// Outcome of the most recent write, if any.
    pub fn last_outcome(&self) -> Option<WriteOutcome> {
        self.writes.last().map(|w| w.outcome)
    }
}
