//! Wrapper prelude.
//!
//! The `shelf-format` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::normalize;
pub use crate::{
    FieldSpec, FieldValue, MetaValue, MetadataEncoder, NewRecord, OnExisting, Record, ScanOptions,
    Shelf, ShelfError, ShelfResult, WriteOutcome, load_all, load_all_with,
};
