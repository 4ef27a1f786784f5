//! Format-specific helpers.
//!
//! Payload tables are Arrow [`RecordBatch`](arrow::array::RecordBatch)es on
//! the Rust side and CSV files with a header row on disk.

pub mod csv;
