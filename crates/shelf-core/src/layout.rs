//! On-disk layout conventions for a shelf root.
//!
//! ```text
//! root/
//!   .shelf.json              # manifest: field names, attribute names, file names
//!   <field 1>/
//!     <field 2>/
//!       ...
//!         <field n>/         # one record
//!           metadata.json    # metadata document
//!           data.csv         # payload files (zero or more)
//! ```
//!
//! Relative path helpers return [`PathBuf`] values; callers join them with
//! the root before doing IO.

use std::path::{Path, PathBuf};

/// Names beginning with this character are hidden and never scanned.
pub const HIDDEN_PREFIX: char = '.';

/// File name of the persisted manifest at the shelf root.
pub const MANIFEST_FILE_NAME: &str = ".shelf.json";

/// Extension of metadata documents.
pub const METADATA_EXT: &str = "json";

/// Extension of payload files.
pub const PAYLOAD_EXT: &str = "csv";

/// Default base name of the metadata document.
pub const DEFAULT_METADATA_NAME: &str = "metadata";

/// Default base name of the payload file written by `Record::save`.
pub const DEFAULT_DATA_NAME: &str = "data";

/// Relative path: `<seg 1>/<seg 2>/.../<seg n>`
pub fn record_rel_dir<S: AsRef<str>>(segments: &[S]) -> PathBuf {
    segments.iter().map(AsRef::as_ref).collect()
}

/// File name: `<metadata_name>.json`
pub fn metadata_file_name(metadata_name: &str) -> String {
    format!("{metadata_name}.{METADATA_EXT}")
}

/// File name of a payload, appending `.csv` when `name` has no extension.
///
/// Only `.csv` payloads are picked up by aggregation, so any other extension
/// is rejected. The result must also be a single visible path segment.
pub fn payload_file_name(name: &str) -> Result<String, SegmentProblem> {
    check_segment(name)?;
    match Path::new(name).extension() {
        None => Ok(format!("{name}.{PAYLOAD_EXT}")),
        Some(ext) if ext == PAYLOAD_EXT => Ok(name.to_string()),
        Some(_) => Err(SegmentProblem::Extension),
    }
}

/// Absolute path of the manifest for `root`.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE_NAME)
}

/// Returns `true` for names the scanner must ignore.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Why a string cannot be used as a single path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentProblem {
    /// The string is empty.
    Empty,
    /// The string is `.` or `..`.
    Relative,
    /// The string contains a path separator or a NUL byte.
    Separator,
    /// The string starts with [`HIDDEN_PREFIX`] and would be skipped by scans.
    Hidden,
    /// A payload file name carries an extension other than [`PAYLOAD_EXT`].
    Extension,
}

impl std::fmt::Display for SegmentProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            SegmentProblem::Empty => "it is empty",
            SegmentProblem::Relative => "it is a relative path component",
            SegmentProblem::Separator => "it contains a path separator or NUL byte",
            SegmentProblem::Hidden => "it starts with '.' and would be hidden from scans",
            SegmentProblem::Extension => "payload files must have a .csv extension",
        };
        f.write_str(msg)
    }
}

/// Check that `s` can be used verbatim as one directory or file name.
pub fn check_segment(s: &str) -> Result<(), SegmentProblem> {
    if s.is_empty() {
        return Err(SegmentProblem::Empty);
    }
    if s == "." || s == ".." {
        return Err(SegmentProblem::Relative);
    }
    if s.contains(['/', '\\', '\0']) {
        return Err(SegmentProblem::Separator);
    }
    if is_hidden(s) {
        return Err(SegmentProblem::Hidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_dir_joins_segments_in_order() {
        let rel = record_rel_dir(&["A", "B", "dummy"]);
        assert_eq!(rel, PathBuf::from("A").join("B").join("dummy"));
    }

    #[test]
    fn payload_name_gets_csv_extension_only_when_missing() {
        assert_eq!(payload_file_name("data"), Ok("data.csv".to_string()));
        assert_eq!(payload_file_name("data.csv"), Ok("data.csv".to_string()));
        assert_eq!(payload_file_name("v1.2.csv"), Ok("v1.2.csv".to_string()));
    }

    #[test]
    fn payload_name_rejects_foreign_extensions() {
        assert_eq!(payload_file_name("prices.tsv"), Err(SegmentProblem::Extension));
        assert_eq!(payload_file_name("metadata.json"), Err(SegmentProblem::Extension));
        assert_eq!(payload_file_name(".csv"), Err(SegmentProblem::Hidden));
        assert_eq!(payload_file_name("a/b"), Err(SegmentProblem::Separator));
    }

    #[test]
    fn segment_checks() {
        assert_eq!(check_segment("2024-01-01"), Ok(()));
        assert_eq!(check_segment(""), Err(SegmentProblem::Empty));
        assert_eq!(check_segment(".."), Err(SegmentProblem::Relative));
        assert_eq!(check_segment("a/b"), Err(SegmentProblem::Separator));
        assert_eq!(check_segment("a\\b"), Err(SegmentProblem::Separator));
        assert_eq!(check_segment(".git"), Err(SegmentProblem::Hidden));
    }
}
