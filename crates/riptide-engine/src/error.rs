//! # Design
//!
//! - Centralize coordinator-level errors for construction and background work.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for coordinator operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Coordinator-level error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The coordinator was constructed outside a Tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime {
        /// Source runtime lookup error.
        source: tokio::runtime::TryCurrentError,
    },
    /// [`crate::EngineCoordinator::global`] was called before `install`.
    #[error("engine coordinator not installed")]
    NotInstalled,
    /// Torrent session operations failed.
    #[error("torrent operation failed")]
    Torrent {
        /// Operation identifier.
        operation: &'static str,
        /// Source torrent error.
        source: riptide_torrent_core::TorrentError,
    },
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: riptide_config::ConfigError,
    },
    /// Filesystem operations failed.
    #[error("filesystem operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: riptide_fsops::FsOpsError,
    },
    /// The streaming server refused to start.
    #[error("streaming server failed")]
    Streaming {
        /// Source streaming error.
        source: anyhow::Error,
    },
}

/// Failure resolving magnet metadata.
#[derive(Debug, Error)]
pub enum MagnetError {
    /// The session reported the fetch without metadata bytes.
    #[error("magnet metadata missing")]
    MissingData {
        /// Info-hash of the fetch.
        info_hash: riptide_torrent_core::InfoHash,
    },
    /// The fetched metadata is not a valid torrent.
    #[error("magnet metadata could not be decoded")]
    Decode {
        /// Info-hash of the fetch.
        info_hash: riptide_torrent_core::InfoHash,
        /// Source decode error.
        source: riptide_torrent_core::MetaInfoError,
    },
    /// The session went away before the metadata arrived.
    #[error("magnet fetch closed before metadata arrived")]
    Closed {
        /// Info-hash of the fetch.
        info_hash: riptide_torrent_core::InfoHash,
    },
}

impl EngineError {
    pub(crate) const fn torrent(
        operation: &'static str,
        source: riptide_torrent_core::TorrentError,
    ) -> Self {
        Self::Torrent { operation, source }
    }

    pub(crate) const fn config(
        operation: &'static str,
        source: riptide_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: riptide_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }
}
