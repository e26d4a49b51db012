//! # Design
//!
//! - Every variant names the failing operation and the path it touched.
//! - Messages stay constant; context lives in fields and sources stay attached.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for storage and watch operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Storage access and directory watch failures.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// Reading, writing or creating a file failed.
    #[error("storage io failure")]
    Io {
        /// Failing operation, e.g. `fs.read`.
        operation: &'static str,
        /// File or directory touched.
        path: PathBuf,
        /// Cause.
        source: io::Error,
    },
    /// Listing a watched directory failed.
    #[error("directory scan failure")]
    Walkdir {
        /// Failing operation.
        operation: &'static str,
        /// Directory being listed.
        path: PathBuf,
        /// Cause.
        source: walkdir::Error,
    },
    /// Creating or registering the change watch failed.
    #[error("directory watch failure")]
    Watch {
        /// Failing operation.
        operation: &'static str,
        /// Directory being watched.
        path: PathBuf,
        /// Cause.
        source: notify::Error,
    },
    /// Querying free space failed.
    #[error("free space query failure")]
    Nix {
        /// Failing operation.
        operation: &'static str,
        /// Path whose filesystem was queried.
        path: PathBuf,
        /// Cause.
        source: nix::Error,
    },
    /// The path is under a root refused for storage.
    #[error("restricted storage path")]
    Restricted {
        /// Refused path.
        path: PathBuf,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn watch(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: notify::Error,
    ) -> Self {
        Self::Watch {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the failure means the path does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            Self::Nix { source, .. } => *source == nix::Error::ENOENT,
            Self::Walkdir { .. } | Self::Watch { .. } | Self::Restricted { .. } => false,
        }
    }
}
