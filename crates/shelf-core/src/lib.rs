//! Core engine for a field-addressed, filesystem-backed record shelf.
//!
//! A shelf stores tabular payloads in a directory hierarchy whose levels are
//! named by an ordered list of fields:
//!
//! ```text
//! <root>/<field_1 value>/<field_2 value>/.../<field_n value>/
//!     metadata.json   # per-record attributes
//!     data.csv        # payload tables, one file per name
//! ```
//!
//! The pieces:
//!
//! - [`FieldSpec`] describes one level of the hierarchy and how its value is
//!   resolved when the caller omits it (`field` module).
//! - [`MetadataEncoder`] turns caller attributes into a JSON document through
//!   an ordered chain of [`Normalize`] steps (`metadata` module).
//! - [`Shelf`] validates and materializes [`Record`]s; a record writes its
//!   metadata on creation and payloads on [`Record::attach`] (`shelf` and
//!   `record` modules).
//! - [`load_all`] walks a shelf and returns one concatenated table per
//!   payload name, with metadata broadcast into columns (`aggregate` module).
//! - A small JSON manifest at the root remembers the layout so a shelf can be
//!   reopened or aggregated without repeating its configuration (`manifest`
//!   module).
//!
//! All I/O is synchronous. Nothing is cached between calls: the filesystem
//! is the only state.
#![deny(missing_docs)]
pub mod aggregate;
pub mod error;
pub mod field;
pub mod formats;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod record;
pub mod shelf;
pub mod storage;

pub use aggregate::{ScanOptions, load_all, load_all_with};
pub use error::{ShelfError, ShelfResult};
pub use field::{DefaultRule, FieldSpec, FieldValue};
pub use manifest::ShelfManifest;
pub use metadata::{Attributes, MetaValue, MetadataDocument, MetadataEncoder, Normalize};
pub use record::{Record, WriteReport};
pub use shelf::{NewRecord, Shelf, ShelfBuilder};
pub use storage::{OnExisting, WriteOutcome};
