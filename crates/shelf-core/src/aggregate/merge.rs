//! Concatenating tables whose column sets differ.
//!
//! The output schema is the union of the input columns in first-seen order.
//! Every output column is nullable; rows from an input lacking a column get
//! nulls there. When inputs disagree on a column's type the type is widened:
//!
//! - `Null` gives way to anything;
//! - two different numeric types meet at `Float64`;
//! - any other disagreement falls back to `Utf8`.

use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{ArrayRef, RecordBatch, RecordBatchOptions, new_null_array},
    compute::{cast, concat_batches},
    datatypes::{DataType, Field, Schema, SchemaRef},
};
use snafu::prelude::*;

use crate::error::{CsvSnafu, ShelfResult};

fn is_numeric(dt: &DataType) -> bool {
    dt.is_integer() || dt.is_floating()
}

/// The narrowest type both `a` and `b` convert into.
pub(crate) fn widen(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        _ if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        _ if is_numeric(a) && is_numeric(b) => DataType::Float64,
        _ => DataType::Utf8,
    }
}

/// Union schema over `batches`, with every field nullable.
pub(crate) fn union_schema(batches: &[RecordBatch]) -> SchemaRef {
    let mut order: Vec<(String, DataType)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for batch in batches {
        for field in batch.schema().fields() {
            match index.get(field.name()) {
                Some(&i) => {
                    let widened = widen(&order[i].1, field.data_type());
                    order[i].1 = widened;
                }
                None => {
                    index.insert(field.name().clone(), order.len());
                    order.push((field.name().clone(), field.data_type().clone()));
                }
            }
        }
    }

    let fields: Vec<Field> = order
        .into_iter()
        .map(|(name, dt)| Field::new(name, dt, true))
        .collect();
    Arc::new(Schema::new(fields))
}

fn align(batch: &RecordBatch, schema: &SchemaRef, stem: &str) -> ShelfResult<RecordBatch> {
    let rows = batch.num_rows();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let column = match batch.column_by_name(field.name()) {
            Some(col) if col.data_type() == field.data_type() => Arc::clone(col),
            Some(col) => cast(col, field.data_type()).context(CsvSnafu { path: stem })?,
            None => new_null_array(field.data_type(), rows),
        };
        columns.push(column);
    }

    RecordBatch::try_new_with_options(
        Arc::clone(schema),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(rows)),
    )
    .context(CsvSnafu { path: stem })
}

/// Concatenate `batches` vertically over the union of their columns.
///
/// `stem` identifies the group in error messages.
pub fn concat_aligned(stem: &str, batches: &[RecordBatch]) -> ShelfResult<RecordBatch> {
    let schema = union_schema(batches);
    let aligned = batches
        .iter()
        .map(|b| align(b, &schema, stem))
        .collect::<ShelfResult<Vec<_>>>()?;
    concat_batches(&schema, &aligned).context(CsvSnafu { path: stem })
}
