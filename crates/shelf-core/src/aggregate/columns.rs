//! Broadcasting scalar metadata values into constant columns.

use std::sync::Arc;

use arrow::{
    array::{
        ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, RecordBatchOptions,
        StringArray, UInt64Array, new_null_array,
    },
    datatypes::{DataType, Field, Schema},
};
use serde_json::Value;
use snafu::prelude::*;

use crate::error::{CsvSnafu, MetadataFieldCollisionSnafu, ShelfResult};

/// Repeat `value` `rows` times as an Arrow array.
///
/// Scalars keep their JSON type; nested values are carried as their JSON
/// text.
pub(crate) fn constant_array(value: &Value, rows: usize) -> ArrayRef {
    match value {
        Value::Null => new_null_array(&DataType::Null, rows),
        Value::Bool(b) => Arc::new(BooleanArray::from(vec![*b; rows])),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Arc::new(Int64Array::from(vec![i; rows]))
            } else if let Some(u) = n.as_u64() {
                Arc::new(UInt64Array::from(vec![u; rows]))
            } else {
                Arc::new(Float64Array::from(vec![n.as_f64().unwrap_or(f64::NAN); rows]))
            }
        }
        Value::String(s) => Arc::new(StringArray::from(vec![s.as_str(); rows])),
        Value::Array(_) | Value::Object(_) => {
            let text = value.to_string();
            Arc::new(StringArray::from(vec![text.as_str(); rows]))
        }
    }
}

/// Return a copy of `batch` with a trailing constant column `name`.
///
/// Fails with `MetadataFieldCollision` when `batch` already has a column
/// called `name`; `path` names the payload for the error.
pub(crate) fn append_constant(
    batch: &RecordBatch,
    name: &str,
    value: &Value,
    path: &str,
) -> ShelfResult<RecordBatch> {
    let schema = batch.schema();
    ensure!(
        schema.column_with_name(name).is_none(),
        MetadataFieldCollisionSnafu { key: name, path }
    );

    let rows = batch.num_rows();
    let array = constant_array(value, rows);

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(name, array.data_type().clone(), true));
    let mut columns = batch.columns().to_vec();
    columns.push(array);

    RecordBatch::try_new_with_options(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(rows)),
    )
    .context(CsvSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use serde_json::json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn ids(n: i64) -> Result<RecordBatch, arrow::error::ArrowError> {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64, false)]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from((0..n).collect::<Vec<_>>()))],
        )
    }

    #[test]
    fn scalars_keep_their_type() {
        assert_eq!(constant_array(&json!(true), 2).data_type(), &DataType::Boolean);
        assert_eq!(constant_array(&json!(-3), 2).data_type(), &DataType::Int64);
        assert_eq!(constant_array(&json!(u64::MAX), 2).data_type(), &DataType::UInt64);
        assert_eq!(constant_array(&json!(0.5), 2).data_type(), &DataType::Float64);
        assert_eq!(constant_array(&json!("x"), 2).data_type(), &DataType::Utf8);
        assert_eq!(constant_array(&Value::Null, 2).null_count(), 2);
    }

    #[test]
    fn nested_values_become_json_text() -> TestResult {
        let array = constant_array(&json!({"k": [1, 2]}), 1);
        let strings = array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or("expected Utf8")?;
        assert_eq!(strings.value(0), r#"{"k":[1,2]}"#);
        Ok(())
    }

    #[test]
    fn appended_column_is_broadcast() -> TestResult {
        let batch = append_constant(&ids(3)?, "attribute", &json!("test"), "data.csv")?;

        assert_eq!(batch.num_columns(), 2);
        let col = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or("expected Utf8")?;
        assert_eq!(col.iter().flatten().collect::<Vec<_>>(), vec!["test"; 3]);
        Ok(())
    }

    #[test]
    fn zero_row_payload_still_gets_column() -> TestResult {
        let batch = append_constant(&ids(0)?, "attribute", &json!(1), "data.csv")?;
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema().field(1).name(), "attribute");
        Ok(())
    }

    #[test]
    fn existing_column_name_collides() -> TestResult {
        let err = append_constant(&ids(1)?, "id", &json!(1), "data.csv").expect_err("collision");
        assert!(matches!(
            err,
            crate::ShelfError::MetadataFieldCollision { ref key, .. } if key == "id"
        ));
        Ok(())
    }
}
