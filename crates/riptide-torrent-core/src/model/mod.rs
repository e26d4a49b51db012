//! Torrent identity, add requests and live status types exchanged with the session.

pub mod metainfo;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use riptide_events::{InfoHash, TorrentId};
use serde::{Deserialize, Serialize};

/// Where a torrent being admitted came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TorrentSource {
    /// A `.torrent` file on disk.
    File {
        /// Location of the torrent file.
        path: PathBuf,
    },
    /// A magnet URI whose metadata was fetched by the session.
    Magnet {
        /// Magnet URI.
        uri: String,
    },
}

/// Download priority of a single file inside a torrent.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Do not download the file.
    Ignore,
    /// Below normal priority.
    Low,
    /// Normal priority.
    #[default]
    Default,
    /// Highest priority.
    High,
}

/// Parameters for admitting one torrent; consumed once by the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddTorrentParams {
    /// Where the torrent came from.
    pub source: TorrentSource,
    /// Info-hash of the torrent; also its identifier.
    pub info_hash: InfoHash,
    /// Display name.
    pub name: String,
    /// Priority per file, in metainfo order.
    pub file_priorities: Vec<Priority>,
    /// Directory the payload downloads into.
    pub download_path: PathBuf,
    #[serde(default)]
    /// Download pieces in order.
    pub sequential: bool,
    #[serde(default)]
    /// Admit the torrent paused.
    pub add_paused: bool,
}

impl AddTorrentParams {
    /// Whether the torrent was admitted from a magnet link.
    #[must_use]
    pub const fn from_magnet(&self) -> bool {
        matches!(self.source, TorrentSource::Magnet { .. })
    }
}

/// Partial update applied to a live torrent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeableParams {
    #[serde(default)]
    /// New display name.
    pub name: Option<String>,
    #[serde(default)]
    /// New download directory; changing it moves the payload.
    pub download_path: Option<PathBuf>,
    #[serde(default)]
    /// New sequential-download flag.
    pub sequential: Option<bool>,
    #[serde(default)]
    /// New per-file priorities.
    pub file_priorities: Option<Vec<Priority>>,
}

impl ChangeableParams {
    /// Update that only moves the payload to `path`.
    #[must_use]
    pub fn move_to(path: impl Into<PathBuf>) -> Self {
        Self {
            download_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.download_path.is_none()
            && self.sequential.is_none()
            && self.file_priorities.is_none()
    }
}

/// Result of parsing or starting a magnet fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MagnetInfo {
    /// Original magnet URI.
    pub uri: String,
    /// Info-hash encoded in the URI.
    pub info_hash: InfoHash,
    /// Display name from the `dn` parameter, or the hash when absent.
    pub name: String,
    #[serde(default)]
    /// File priorities encoded in the URI, if any.
    pub file_priorities: Vec<Priority>,
}

/// Persisted torrent entity owned by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Torrent {
    /// Identifier (info-hash).
    pub id: TorrentId,
    /// Display name.
    pub name: String,
    /// Directory the payload lives in.
    pub download_path: PathBuf,
    /// When the torrent was admitted.
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    /// Last error recorded for the torrent.
    pub error: Option<String>,
}

/// Lifecycle state reported by a live task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStateCode {
    /// State not reported.
    Unknown,
    /// Task is in an error state.
    Error,
    /// Downloading payload.
    Downloading,
    /// Seeding a complete payload.
    Seeding,
    /// Paused by the user or a policy.
    Paused,
    /// Stopped by the session.
    Stopped,
    /// All wanted pieces are present.
    Finished,
    /// Verifying on-disk data.
    Checking,
    /// Fetching metadata for a magnet.
    DownloadingMetadata,
    /// Allocating storage.
    Allocating,
}

impl TorrentStateCode {
    /// States in which a torrent still has work pending.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::Downloading
                | Self::Paused
                | Self::Checking
                | Self::DownloadingMetadata
                | Self::Allocating
        )
    }
}

/// Live status snapshot reported by a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatus {
    /// Current state.
    pub state: TorrentStateCode,
    /// Completion percentage, 0-100.
    pub progress: u8,
    /// Bytes received so far.
    pub received_bytes: u64,
    /// Bytes uploaded so far.
    pub uploaded_bytes: u64,
    /// Bytes wanted in total.
    pub total_wanted: u64,
    /// Current download rate in bytes per second.
    pub download_speed: u64,
    /// Current upload rate in bytes per second.
    pub upload_speed: u64,
    /// Estimated seconds to completion.
    pub eta_secs: Option<u64>,
    /// Peers known to the swarm.
    pub total_peers: u32,
    /// Peers currently connected.
    pub connected_peers: u32,
    /// Sequential-download flag.
    pub sequential: bool,
    /// Priority per file.
    pub file_priorities: Vec<Priority>,
}

/// Display snapshot combining the repository entity with live task state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TorrentInfo {
    /// Identifier (info-hash).
    pub id: TorrentId,
    /// Display name.
    pub name: String,
    /// When the torrent was admitted.
    pub date_added: DateTime<Utc>,
    /// Last recorded error.
    pub error: Option<String>,
    /// Live state, absent when no valid task exists.
    pub status: Option<TaskStatus>,
}

impl TorrentInfo {
    /// Snapshot built from the entity alone.
    #[must_use]
    pub fn basic(torrent: &Torrent) -> Self {
        Self {
            id: torrent.id.clone(),
            name: torrent.name.clone(),
            date_added: torrent.date_added,
            error: torrent.error.clone(),
            status: None,
        }
    }

    /// Snapshot enriched with the task's live status.
    #[must_use]
    pub fn with_status(torrent: &Torrent, status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::basic(torrent)
        }
    }
}

/// Detailed per-torrent statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvancedTorrentInfo {
    /// Identifier (info-hash).
    pub torrent_id: TorrentId,
    /// Seeds known to the swarm.
    pub total_seeds: u32,
    /// Seeds currently connected.
    pub connected_seeds: u32,
    /// Pieces verified on disk.
    pub downloaded_pieces: u32,
    /// Uploaded divided by downloaded.
    pub share_ratio: f64,
    /// Seconds the torrent has been active.
    pub active_time_secs: u64,
    /// Seconds the torrent has been seeding.
    pub seeding_time_secs: u64,
    /// Distributed copies across the swarm.
    pub availability: f64,
    /// Bytes received per file.
    pub files_received_bytes: Vec<u64>,
    /// Availability per file.
    pub files_availability: Vec<f64>,
}

/// Tracker health as reported by the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStatus {
    /// Last announce succeeded.
    Working,
    /// Announce in flight.
    Updating,
    /// Last announce failed.
    NotWorking,
    /// Never contacted.
    NotContacted,
}

/// Tracker entry snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerInfo {
    /// Announce URL.
    pub url: String,
    /// Tier the tracker belongs to.
    pub tier: u8,
    /// Health.
    pub status: TrackerStatus,
    /// Last message from the tracker.
    pub message: Option<String>,
}

/// Connected peer snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerInfo {
    /// Remote address (`ip:port`).
    pub address: String,
    /// Client identification string.
    pub client: String,
    /// Download rate from the peer in bytes per second.
    pub download_speed: u64,
    /// Upload rate to the peer in bytes per second.
    pub upload_speed: u64,
    /// Peer completion percentage, 0-100.
    pub progress: u8,
}

/// Session-wide transfer statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStats {
    /// Nodes in the DHT routing table.
    pub dht_nodes: u64,
    /// Total bytes downloaded this session.
    pub total_download: u64,
    /// Total bytes uploaded this session.
    pub total_upload: u64,
    /// Current aggregate download rate.
    pub download_speed: u64,
    /// Current aggregate upload rate.
    pub upload_speed: u64,
    /// Port the session listens on, once bound.
    pub listen_port: Option<u16>,
}
