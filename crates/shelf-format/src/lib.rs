//! # shelf-format
//!
//! Field-addressed directories holding JSON metadata and CSV payload tables,
//! plus a loader that flattens a whole shelf back into one table per payload
//! name.
//!
//! This crate is the supported public entry point and provides a small, stable surface.
//!
//! ## Example
//!
//! ```rust,ignore
//! use shelf_format::prelude::*;
//!
//! let shelf = Shelf::builder("/data/runs")
//!     .field("experiment")
//!     .field(FieldSpec::date("day", None))
//!     .build()?;
//!
//! shelf
//!     .create(NewRecord::new().field("experiment", "baseline").attribute("seed", 7))?
//!     .save(&[batch])?;
//!
//! let tables = shelf.load_all()?;
//! println!("{} rows", tables["data"].num_rows());
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Metadata normalization steps (wrapper-only).
pub mod normalize {
    pub use shelf_core::metadata::{Floats, Integers, Mappings, Primitives, Sequences};
}

pub use shelf_core::aggregate::{ScanOptions, load_all, load_all_with};
pub use shelf_core::field::{DefaultRule, FieldSpec, FieldValue};
pub use shelf_core::manifest::ShelfManifest;
pub use shelf_core::metadata::{Attributes, MetaValue, MetadataEncoder, Normalize};
pub use shelf_core::record::{Record, WriteReport};
pub use shelf_core::shelf::{NewRecord, Shelf, ShelfBuilder};
pub use shelf_core::storage::{OnExisting, WriteOutcome};
pub use shelf_core::{ShelfError, ShelfResult};
