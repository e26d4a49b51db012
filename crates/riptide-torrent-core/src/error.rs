//! Error types for torrent core services.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use riptide_events::TorrentId;
use thiserror::Error;

use crate::model::metainfo::MetaInfoError;

/// Primary error type for torrent operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// A torrent with the same info-hash is already in the session.
    #[error("torrent already exists")]
    AlreadyExists {
        /// Identifier of the existing torrent.
        torrent_id: TorrentId,
    },
    /// The download location cannot hold the torrent payload.
    #[error("not enough free space")]
    FreeSpace {
        /// Download location that was checked.
        path: PathBuf,
        /// Bytes the torrent needs.
        required: u64,
        /// Bytes available at the location.
        available: u64,
    },
    /// Torrent metadata could not be decoded.
    #[error("torrent metadata could not be decoded")]
    Decode {
        /// Underlying decode failure.
        source: MetaInfoError,
    },
    /// The torrent source file does not exist.
    #[error("torrent source not found")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// IO failed while reading or writing torrent data.
    #[error("torrent io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure, when known.
        path: Option<PathBuf>,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The session is not running.
    #[error("torrent engine is not running")]
    EngineStopped {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Metadata is not available yet for the torrent.
    #[error("torrent metadata unavailable")]
    MetadataUnavailable {
        /// Torrent whose metadata was requested.
        torrent_id: TorrentId,
    },
    /// Operation failed inside the session.
    #[error("torrent session operation failed")]
    Session {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent identifier when available.
        torrent_id: Option<TorrentId>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Coarse classification used to pick user-facing notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentErrorKind {
    /// Duplicate torrent.
    AlreadyExists,
    /// Insufficient space at the download location.
    FreeSpace,
    /// Metadata decode failure.
    Decode,
    /// Source file missing.
    NotFound,
    /// IO failure.
    Io,
    /// Anything else.
    Other,
}

impl TorrentError {
    /// Classify an IO failure, mapping missing files to [`TorrentError::NotFound`].
    #[must_use]
    pub fn io(operation: &'static str, path: Option<PathBuf>, source: io::Error) -> Self {
        match (source.kind(), path) {
            (io::ErrorKind::NotFound, Some(path)) => Self::NotFound { path },
            (_, path) => Self::Io {
                operation,
                path,
                source,
            },
        }
    }

    /// Wrap an adapter failure raised by the session.
    #[must_use]
    pub fn session(
        operation: &'static str,
        torrent_id: Option<TorrentId>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Session {
            operation,
            torrent_id,
            source: source.into(),
        }
    }

    /// Coarse classification of the error.
    #[must_use]
    pub const fn kind(&self) -> TorrentErrorKind {
        match self {
            Self::AlreadyExists { .. } => TorrentErrorKind::AlreadyExists,
            Self::FreeSpace { .. } => TorrentErrorKind::FreeSpace,
            Self::Decode { .. } => TorrentErrorKind::Decode,
            Self::NotFound { .. } => TorrentErrorKind::NotFound,
            Self::Io { .. } => TorrentErrorKind::Io,
            Self::EngineStopped { .. }
            | Self::MetadataUnavailable { .. }
            | Self::Session { .. } => TorrentErrorKind::Other,
        }
    }
}

impl From<MetaInfoError> for TorrentError {
    fn from(source: MetaInfoError) -> Self {
        Self::Decode { source }
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
