//! CSV encode/decode for payload tables.
//!
//! Writing uses `arrow_csv::Writer` with a header row. Reading infers the
//! schema from the whole file, then decodes it into a single batch.
//!
//! The Arrow CSV writer does not support nested types (lists, structs);
//! such columns surface as [`ShelfError::Csv`](crate::ShelfError::Csv).

use std::{
    io::{Seek, SeekFrom},
    path::Path,
    sync::Arc,
};

use arrow::{array::RecordBatch, compute::concat_batches};
use arrow_csv::{ReaderBuilder, WriterBuilder, reader::Format};
use snafu::prelude::*;

use crate::{
    error::{CsvSnafu, ShelfError, ShelfResult},
    storage::{self, BackendError, OnExisting, OtherIoSnafu, WriteOutcome},
};

/// Write `batches` to `path` as one CSV document with a single header row.
pub fn write_csv(
    path: &Path,
    policy: OnExisting,
    batches: &[RecordBatch],
) -> ShelfResult<WriteOutcome> {
    let path_str = path.display().to_string();

    storage::write_with(path, policy, |file| {
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        for batch in batches {
            writer.write(batch).context(CsvSnafu {
                path: path_str.clone(),
            })?;
        }
        Ok::<(), ShelfError>(())
    })
}

/// Read the CSV file at `path` into a single batch.
///
/// Column types are inferred from every row. A file holding only a header
/// yields a zero-row batch with `Utf8` columns.
pub fn read_csv(path: &Path) -> ShelfResult<RecordBatch> {
    let path_str = path.display().to_string();
    let mut file = storage::open(path)?;

    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, None)
        .context(CsvSnafu {
            path: path_str.clone(),
        })?;
    let schema = Arc::new(schema);

    file.seek(SeekFrom::Start(0))
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: path_str.clone(),
        })?;

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(format)
        .build(file)
        .context(CsvSnafu {
            path: path_str.clone(),
        })?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.context(CsvSnafu {
            path: path_str.clone(),
        })?);
    }

    concat_batches(&schema, &batches).context(CsvSnafu { path: path_str })
}
