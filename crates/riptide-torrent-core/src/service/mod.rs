//! Session, task, and repository traits implemented by torrent adapters.
//!
//! Session and task calls may block; callers run them off latency-sensitive
//! threads.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use riptide_events::{InfoHash, ListenerRegistry, TorrentId};

use crate::error::TorrentResult;
use crate::model::metainfo::TorrentMetaInfo;
use crate::model::{
    AddTorrentParams, AdvancedTorrentInfo, ChangeableParams, MagnetInfo, PeerInfo, SessionStats,
    TaskStatus, Torrent, TorrentStateCode, TrackerInfo,
};
use crate::settings::{PortRange, SessionSettings};

/// Torrent session: owns live tasks and emits [`riptide_events::EngineEvent`]s.
pub trait Session: Send + Sync {
    /// Begin starting the session. Completion is signalled by a
    /// `SessionStarted` event.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot begin starting.
    fn start(&self) -> TorrentResult<()>;

    /// Stop the session and release its resources.
    ///
    /// # Errors
    ///
    /// Returns an error when shutdown fails.
    fn stop(&self) -> TorrentResult<()>;

    /// Whether the session is started.
    fn is_running(&self) -> bool;

    /// Listener registry the session dispatches events through.
    fn events(&self) -> &ListenerRegistry;

    /// Admit a torrent, optionally deleting the source file afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TorrentError::AlreadyExists`] for duplicates or any
    /// other failure raised while admitting.
    fn add_torrent(&self, params: AddTorrentParams, remove_source: bool) -> TorrentResult<Torrent>;

    /// Remove a torrent, optionally deleting its payload.
    ///
    /// # Errors
    ///
    /// Returns an error when removal fails.
    fn delete_torrent(&self, id: &TorrentId, with_files: bool) -> TorrentResult<()>;

    /// Restore torrents persisted from an earlier run.
    ///
    /// # Errors
    ///
    /// Returns an error when restoration cannot start.
    fn restore_torrents(&self) -> TorrentResult<()>;

    /// Live task for a torrent, if any.
    fn task(&self, id: &TorrentId) -> Option<Arc<dyn TorrentTask>>;

    /// All live tasks.
    fn tasks(&self) -> Vec<Arc<dyn TorrentTask>>;

    /// Pause every task on behalf of a policy.
    fn pause_all(&self);

    /// Resume every task paused by a policy.
    fn resume_all(&self);

    /// Pause every task as if the user asked.
    fn pause_all_manually(&self);

    /// Resume every task as if the user asked.
    fn resume_all_manually(&self);

    /// Start fetching metadata for a magnet URI.
    ///
    /// # Errors
    ///
    /// Returns an error when the URI is malformed or the fetch cannot start.
    fn fetch_magnet(&self, uri: &str) -> TorrentResult<MagnetInfo>;

    /// Parse a magnet URI without fetching.
    ///
    /// # Errors
    ///
    /// Returns an error when the URI is malformed.
    fn parse_magnet(&self, uri: &str) -> TorrentResult<MagnetInfo>;

    /// Metadata already fetched for `hash`, if resident.
    fn loaded_magnet(&self, hash: &InfoHash) -> Option<Vec<u8>>;

    /// Abort an in-flight magnet fetch.
    fn cancel_fetch_magnet(&self, hash: &InfoHash);

    /// Current settings snapshot.
    fn settings(&self) -> SessionSettings;

    /// Replace the settings snapshot.
    fn set_settings(&self, settings: &SessionSettings);

    /// Rebind to a new listen port range.
    fn set_port_range(&self, range: PortRange);

    /// Load an IP filter file; completion arrives as `IpFilterParsed`.
    fn enable_ip_filter(&self, path: &Path);

    /// Drop the active IP filter.
    fn disable_ip_filter(&self);

    /// Session-wide statistics.
    fn stats(&self) -> SessionStats;
}

/// Live handle to one torrent inside the session.
pub trait TorrentTask: Send + Sync {
    /// Identifier of the torrent.
    fn id(&self) -> &TorrentId;

    /// Whether the underlying handle is still usable.
    fn is_valid(&self) -> bool;

    /// Whether the task is paused.
    fn is_paused(&self) -> bool;

    /// Pause on behalf of a policy.
    fn pause(&self);

    /// Resume after a policy pause.
    fn resume(&self);

    /// Pause as if the user asked.
    ///
    /// # Errors
    ///
    /// Returns an error when the session rejects the request.
    fn pause_manually(&self) -> TorrentResult<()>;

    /// Resume as if the user asked.
    ///
    /// # Errors
    ///
    /// Returns an error when the session rejects the request.
    fn resume_manually(&self) -> TorrentResult<()>;

    /// Re-verify on-disk data.
    fn force_recheck(&self);

    /// Announce to trackers immediately.
    fn request_tracker_announce(&self);

    /// Apply a partial parameter update.
    ///
    /// # Errors
    ///
    /// Returns an error when the update cannot be applied.
    fn apply_params(&self, params: &ChangeableParams) -> TorrentResult<()>;

    /// Whether a parameter update is still being applied.
    fn is_during_change_params(&self) -> bool;

    /// Current tracker URLs.
    fn trackers(&self) -> BTreeSet<String>;

    /// Replace the tracker list.
    fn replace_trackers(&self, urls: BTreeSet<String>);

    /// Append trackers.
    fn add_trackers(&self, urls: BTreeSet<String>);

    /// Build a magnet URI for the torrent.
    fn make_magnet(&self, include_priorities: bool) -> String;

    /// Decoded metadata.
    ///
    /// # Errors
    ///
    /// Returns an error while metadata is unavailable or cannot be decoded.
    fn metainfo(&self) -> TorrentResult<TorrentMetaInfo>;

    /// Bencoded torrent bytes, once metadata is known.
    fn bencode(&self) -> Option<Vec<u8>>;

    /// Piece completion bitmap.
    fn pieces(&self) -> Vec<bool>;

    /// Current lifecycle state.
    fn state(&self) -> TorrentStateCode;

    /// Live status snapshot.
    fn status(&self) -> TaskStatus;

    /// Detailed statistics.
    fn advanced_info(&self) -> AdvancedTorrentInfo;

    /// Tracker snapshots.
    fn tracker_infos(&self) -> Vec<TrackerInfo>;

    /// Connected peer snapshots.
    fn peer_infos(&self) -> Vec<PeerInfo>;

    /// Per-torrent download limit; `None` is unlimited.
    fn download_speed_limit(&self) -> Option<u64>;

    /// Set the per-torrent download limit.
    fn set_download_speed_limit(&self, limit: Option<u64>);

    /// Per-torrent upload limit; `None` is unlimited.
    fn upload_speed_limit(&self) -> Option<u64>;

    /// Set the per-torrent upload limit.
    fn set_upload_speed_limit(&self, limit: Option<u64>);

    /// Whether pieces download in order.
    fn is_sequential(&self) -> bool;
}

/// Persistent store of torrent entities.
#[async_trait]
pub trait TorrentRepository: Send + Sync {
    /// Entity lookup that may block on storage.
    fn torrent_by_id(&self, id: &TorrentId) -> Option<Torrent>;

    /// All stored entities.
    fn all_torrents(&self) -> Vec<Torrent>;

    /// Asynchronous entity lookup.
    async fn load_torrent(&self, id: &TorrentId) -> anyhow::Result<Option<Torrent>>;
}
