//! Local filesystem helpers.
//!
//! Every read and write the shelf performs goes through this module so that
//! error context (the offending path plus the backend error) is attached in
//! one place. All operations are synchronous and blocking.
//!
//! Writes here are deliberately plain `create + write` sequences: there is no
//! temp-file-and-rename step and no rollback. A failure part way through a
//! write can leave a truncated file behind; callers re-run the write to
//! repair it.

use std::{
    error::Error,
    fmt,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::{Backtrace, prelude::*};

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The raw failure behind a [`StorageError`].
///
/// Shelf roots only ever live on the local disk. Single-file operations fail
/// with a plain `io::Error`; the aggregation walk fails with a
/// `walkdir::Error`, which also reports symlink loops and the depth at which
/// the walk broke off.
#[derive(Debug)]
pub enum BackendError {
    /// A read, write or create on one path failed.
    Local(io::Error),
    /// Walking a shelf tree failed.
    Walk(walkdir::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "filesystem error: {e}"),
            BackendError::Walk(e) => write!(f, "error walking shelf tree: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
            BackendError::Walk(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying backend error that caused the failure.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The target file already exists and the overwrite policy is
    /// [`OnExisting::Error`].
    #[snafu(display("Refusing to overwrite existing file: {path}"))]
    AlreadyExists {
        /// The path that was found to already exist.
        path: String,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// An I/O error occurred on the local filesystem.
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying backend I/O error with platform-specific details.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// What to do when a write targets a file that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExisting {
    /// Overwrite the file and log a warning.
    #[default]
    Warn,
    /// Fail with [`StorageError::AlreadyExists`] and leave the file untouched.
    Error,
    /// Leave the existing file untouched and report [`WriteOutcome::Skipped`].
    Skip,
}

/// Result of a single policy-governed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No file existed at the target path.
    Created,
    /// A file existed and was replaced (a warning was logged).
    Overwritten,
    /// A file existed and was left as is.
    Skipped,
}

/// Create `dir` and all missing parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> StorageResult<()> {
    fs::create_dir_all(dir)
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: dir.display().to_string(),
        })
}

/// Returns `true` when something exists at `path`.
///
/// Errors other than "not found" are reported rather than being folded into
/// `false`.
pub fn exists(path: &Path) -> StorageResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu {
            path: path.display().to_string(),
        }),
    }
}

/// Decide whether a write to `path` may proceed under `policy`.
///
/// Returns `Ok(None)` when the write must be skipped, otherwise the outcome
/// the write will have once it completes.
fn check_existing(path: &Path, policy: OnExisting) -> StorageResult<Option<WriteOutcome>> {
    if !exists(path)? {
        return Ok(Some(WriteOutcome::Created));
    }

    match policy {
        OnExisting::Warn => {
            warn!(
                "File already exists and will be overwritten: {}",
                path.display()
            );
            Ok(Some(WriteOutcome::Overwritten))
        }
        OnExisting::Error => AlreadyExistsSnafu {
            path: path.display().to_string(),
        }
        .fail(),
        OnExisting::Skip => {
            info!("File already exists, leaving it untouched: {}", path.display());
            Ok(None)
        }
    }
}

/// Write a file through `write`, honouring the overwrite `policy`.
///
/// The callback receives a buffered writer over the truncated target file.
/// Errors raised by the callback are returned unchanged; filesystem errors
/// are mapped into `E` through `From<StorageError>`.
pub fn write_with<E, F>(path: &Path, policy: OnExisting, write: F) -> Result<WriteOutcome, E>
where
    E: From<StorageError>,
    F: FnOnce(&mut BufWriter<File>) -> Result<(), E>,
{
    let Some(outcome) = check_existing(path, policy)? else {
        return Ok(WriteOutcome::Skipped);
    };

    let path_str = path.display().to_string();
    let file = File::create(path)
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: path_str.clone(),
        })?;

    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer
        .flush()
        .map_err(BackendError::Local)
        .context(OtherIoSnafu { path: path_str })?;

    Ok(outcome)
}

/// Write `contents` to `path`, honouring the overwrite `policy`.
pub fn write_bytes(
    path: &Path,
    policy: OnExisting,
    contents: &[u8],
) -> StorageResult<WriteOutcome> {
    write_with(path, policy, |w: &mut BufWriter<File>| {
        w.write_all(contents)
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: path.display().to_string(),
            })
    })
}

/// Write `contents` to `path` unconditionally, without consulting any policy.
pub fn replace_bytes(path: &Path, contents: &[u8]) -> StorageResult<()> {
    fs::write(path, contents)
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: path.display().to_string(),
        })
}

/// Read the file at `path` into a `String`.
///
/// A missing file yields [`StorageError::NotFound`]; other problems produce
/// [`StorageError::OtherIo`].
pub fn read_to_string(path: &Path) -> StorageResult<String> {
    let path_str = path.display().to_string();
    match fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(BackendError::Local(e)).context(NotFoundSnafu { path: path_str })
        }
        Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu { path: path_str }),
    }
}

/// Open the file at `path` for reading.
pub fn open(path: &Path) -> StorageResult<File> {
    let path_str = path.display().to_string();
    match File::open(path) {
        Ok(f) => Ok(f),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(BackendError::Local(e)).context(NotFoundSnafu { path: path_str })
        }
        Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu { path: path_str }),
    }
}
