//! Typed session events delivered to engine listeners.

use serde::{Deserialize, Serialize};

use crate::ids::{InfoHash, TorrentId};

/// Events emitted by the torrent session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The session finished starting and accepts commands.
    SessionStarted,
    /// A torrent was admitted into the session.
    TorrentAdded {
        /// Identifier of the admitted torrent.
        torrent_id: TorrentId,
    },
    /// A torrent was restored from persisted session state.
    TorrentLoaded {
        /// Identifier of the restored torrent.
        torrent_id: TorrentId,
    },
    /// Metadata for a magnet-added torrent finished downloading (or failed).
    TorrentMetadataLoaded {
        /// Identifier of the torrent whose metadata arrived.
        torrent_id: TorrentId,
        /// Failure detail when metadata could not be applied.
        error: Option<MetadataFailure>,
    },
    /// Metadata for a pending magnet fetch arrived.
    MagnetLoaded {
        /// Info-hash the fetch was keyed on.
        info_hash: InfoHash,
        /// Bencoded metadata, absent when the session could not produce it.
        metadata: Option<Vec<u8>>,
    },
    /// A torrent finished downloading all wanted pieces.
    TorrentFinished {
        /// Identifier of the finished torrent.
        torrent_id: TorrentId,
    },
    /// Storage for a torrent started moving.
    TorrentMoving {
        /// Identifier of the moving torrent.
        torrent_id: TorrentId,
    },
    /// Storage move finished.
    TorrentMoved {
        /// Identifier of the moved torrent.
        torrent_id: TorrentId,
        /// Whether the move succeeded.
        success: bool,
    },
    /// The IP filter file was parsed.
    IpFilterParsed {
        /// Whether parsing succeeded.
        success: bool,
    },
    /// The session reported a generic error.
    SessionError {
        /// Error detail from the session.
        message: String,
    },
    /// Port mapping (UPnP/NAT-PMP) failed.
    NatError {
        /// Error detail from the session.
        message: String,
    },
    /// A torrent failed to restore from persisted state.
    RestoreSessionError {
        /// Identifier of the torrent that failed to restore.
        torrent_id: TorrentId,
    },
}

impl EngineEvent {
    /// Machine-friendly discriminator used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::TorrentAdded { .. } => "torrent_added",
            Self::TorrentLoaded { .. } => "torrent_loaded",
            Self::TorrentMetadataLoaded { .. } => "torrent_metadata_loaded",
            Self::MagnetLoaded { .. } => "magnet_loaded",
            Self::TorrentFinished { .. } => "torrent_finished",
            Self::TorrentMoving { .. } => "torrent_moving",
            Self::TorrentMoved { .. } => "torrent_moved",
            Self::IpFilterParsed { .. } => "ip_filter_parsed",
            Self::SessionError { .. } => "session_error",
            Self::NatError { .. } => "nat_error",
            Self::RestoreSessionError { .. } => "restore_session_error",
        }
    }

    /// Torrent the event refers to, when it is torrent-scoped.
    #[must_use]
    pub const fn torrent_id(&self) -> Option<&TorrentId> {
        match self {
            Self::TorrentAdded { torrent_id }
            | Self::TorrentLoaded { torrent_id }
            | Self::TorrentMetadataLoaded { torrent_id, .. }
            | Self::TorrentFinished { torrent_id }
            | Self::TorrentMoving { torrent_id }
            | Self::TorrentMoved { torrent_id, .. }
            | Self::RestoreSessionError { torrent_id } => Some(torrent_id),
            Self::SessionStarted
            | Self::MagnetLoaded { .. }
            | Self::IpFilterParsed { .. }
            | Self::SessionError { .. }
            | Self::NatError { .. } => None,
        }
    }
}

/// Classification of a metadata failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFailureKind {
    /// Not enough free space for the torrent payload.
    FreeSpace,
    /// Metadata bytes could not be decoded.
    Decode,
    /// Any other failure.
    Other,
}

/// Failure attached to a [`EngineEvent::TorrentMetadataLoaded`] event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataFailure {
    /// Failure classification.
    pub kind: MetadataFailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl MetadataFailure {
    /// Construct a failure of the given kind.
    #[must_use]
    pub fn new(kind: MetadataFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
