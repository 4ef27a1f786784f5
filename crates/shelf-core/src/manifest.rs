//! Persisted shelf configuration.
//!
//! The manifest lives at `<root>/.shelf.json` and records the field names (not
//! their default rules), attribute names and file naming conventions. The
//! aggregator reads it to learn how deep records sit without any in-memory
//! [`Shelf`](crate::Shelf).
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "fields": ["a", "b", "c"],
//!   "attributes": ["attribute"],
//!   "data_name": "data",
//!   "metadata_name": "metadata"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    error::{JsonSnafu, MalformedMetadataSnafu, MissingManifestSnafu, ShelfResult},
    layout::{self, DEFAULT_DATA_NAME, DEFAULT_METADATA_NAME},
    storage::{self, StorageError},
};

/// Current manifest format version.
///
/// Bumped only when the on-disk JSON format changes incompatibly.
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

fn default_data_name() -> String {
    DEFAULT_DATA_NAME.to_string()
}

fn default_metadata_name() -> String {
    DEFAULT_METADATA_NAME.to_string()
}

/// On-disk description of a shelf's layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfManifest {
    /// Format version of this document.
    pub format_version: u32,
    /// Field names in directory-nesting order.
    pub fields: Vec<String>,
    /// Declared metadata attribute names.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Base name of the default payload file.
    #[serde(default = "default_data_name")]
    pub data_name: String,
    /// Base name of the metadata document.
    #[serde(default = "default_metadata_name")]
    pub metadata_name: String,
}

impl ShelfManifest {
    /// Build a manifest at the current format version.
    pub fn new(
        fields: Vec<String>,
        attributes: Vec<String>,
        data_name: impl Into<String>,
        metadata_name: impl Into<String>,
    ) -> Self {
        ShelfManifest {
            format_version: MANIFEST_FORMAT_VERSION,
            fields,
            attributes,
            data_name: data_name.into(),
            metadata_name: metadata_name.into(),
        }
    }

    /// Read the manifest under `root`, if any.
    ///
    /// A present but unparseable manifest is reported as
    /// [`ShelfError::MalformedMetadata`](crate::ShelfError::MalformedMetadata).
    pub fn read(root: &Path) -> ShelfResult<Option<Self>> {
        let path = layout::manifest_path(root);
        let text = match storage::read_to_string(&path) {
            Ok(text) => text,
            Err(StorageError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let manifest = serde_json::from_str(&text).map_err(|e| {
            MalformedMetadataSnafu {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
            .build()
        })?;
        Ok(Some(manifest))
    }

    /// Like [`ShelfManifest::read`] but a missing manifest is an error.
    pub fn require(root: &Path) -> ShelfResult<Self> {
        Self::read(root)?.context(MissingManifestSnafu {
            path: layout::manifest_path(root).display().to_string(),
        })
    }

    /// Write the manifest under `root`, replacing any previous one.
    pub fn write(&self, root: &Path) -> ShelfResult<()> {
        let path = layout::manifest_path(root);
        let json = serde_json::to_vec_pretty(self).context(JsonSnafu {
            path: path.display().to_string(),
        })?;
        // Rewriting the manifest is routine, so this bypasses the overwrite policy.
        storage::replace_bytes(&path, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn write_then_read() -> TestResult {
        let tmp = TempDir::new()?;
        let manifest = ShelfManifest::new(
            vec!["a".into(), "b".into()],
            vec!["attribute".into()],
            "data",
            "metadata",
        );

        manifest.write(tmp.path())?;
        manifest.write(tmp.path())?;

        assert_eq!(ShelfManifest::read(tmp.path())?, Some(manifest));
        Ok(())
    }

    #[test]
    fn missing_manifest_reads_as_none() -> TestResult {
        let tmp = TempDir::new()?;
        assert_eq!(ShelfManifest::read(tmp.path())?, None);
        assert!(matches!(
            ShelfManifest::require(tmp.path()),
            Err(crate::ShelfError::MissingManifest { .. })
        ));
        Ok(())
    }

    #[test]
    fn optional_keys_take_defaults() -> TestResult {
        let tmp = TempDir::new()?;
        std::fs::write(
            layout::manifest_path(tmp.path()),
            r#"{"format_version": 1, "fields": ["x"]}"#,
        )?;

        let manifest = ShelfManifest::require(tmp.path())?;

        assert_eq!(manifest.fields, vec!["x".to_string()]);
        assert_eq!(manifest.data_name, DEFAULT_DATA_NAME);
        assert_eq!(manifest.metadata_name, DEFAULT_METADATA_NAME);
        Ok(())
    }

    #[test]
    fn garbage_manifest_is_malformed() -> TestResult {
        let tmp = TempDir::new()?;
        std::fs::write(layout::manifest_path(tmp.path()), "not json")?;

        assert!(matches!(
            ShelfManifest::read(tmp.path()),
            Err(crate::ShelfError::MalformedMetadata { .. })
        ));
        Ok(())
    }
}
