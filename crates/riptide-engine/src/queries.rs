//! Read-only queries. They call into the session on the caller's thread and
//! should not be used from latency-sensitive threads.

use std::sync::Arc;

use riptide_events::EngineEvent;
use riptide_torrent_core::{
    AdvancedTorrentInfo, PeerInfo, SessionStats, TorrentId, TorrentInfo, TorrentMetaInfo,
    TorrentTask, TrackerInfo,
};
use tokio_stream::{Stream, StreamExt};

use crate::coordinator::{EngineCoordinator, SpeedLimits};

impl EngineCoordinator {
    /// Live, valid task for `id` while the session runs.
    pub(crate) fn live_task(&self, id: &TorrentId) -> Option<Arc<dyn TorrentTask>> {
        if !self.session.is_running() {
            return None;
        }
        self.session.task(id).filter(|task| task.is_valid())
    }

    /// Magnet link for `id`.
    #[must_use]
    pub fn make_magnet(&self, id: &TorrentId, include_priorities: bool) -> Option<String> {
        self.live_task(id)
            .map(|task| task.make_magnet(include_priorities))
    }

    /// Metadata of `id` now and again every time it finishes loading.
    ///
    /// The stream ends when the coordinator's session goes away.
    pub fn observe_torrent_metainfo(
        &self,
        id: &TorrentId,
    ) -> impl Stream<Item = TorrentMetaInfo> + Send + Unpin + use<> {
        let wanted = id.clone();
        let loads = self.session.events().stream(move |event| match event {
            EngineEvent::TorrentMetadataLoaded {
                torrent_id,
                error: None,
            } if *torrent_id == wanted => Some(()),
            _ => None,
        });
        let initial = self.torrent_metainfo(id);

        let session = Arc::clone(&self.session);
        let id = id.clone();
        tokio_stream::iter(initial).chain(loads.filter_map(move |()| {
            session
                .task(&id)
                .and_then(|task| task.metainfo().ok())
        }))
    }

    /// Decoded metadata of `id`.
    #[must_use]
    pub fn torrent_metainfo(&self, id: &TorrentId) -> Option<TorrentMetaInfo> {
        self.live_task(id).and_then(|task| task.metainfo().ok())
    }

    /// Piece completion bitmap of `id`; empty when unknown.
    #[must_use]
    pub fn pieces(&self, id: &TorrentId) -> Vec<bool> {
        self.live_task(id)
            .map(|task| task.pieces())
            .unwrap_or_default()
    }

    /// Bencoded metadata of `id`.
    #[must_use]
    pub fn bencode(&self, id: &TorrentId) -> Option<Vec<u8>> {
        self.live_task(id).and_then(|task| task.bencode())
    }

    /// Whether `id` downloads pieces in order.
    #[must_use]
    pub fn is_sequential_download(&self, id: &TorrentId) -> bool {
        self.live_task(id)
            .is_some_and(|task| task.is_sequential())
    }

    /// Whether no torrent has work pending. Always true while stopped.
    #[must_use]
    pub fn is_torrents_finished(&self) -> bool {
        if !self.session.is_running() {
            return true;
        }
        !self
            .session
            .tasks()
            .iter()
            .any(|task| task.state().is_in_progress() || task.is_during_change_params())
    }

    /// Repository entity of `id` with its live status when running.
    #[must_use]
    pub fn make_info_sync(&self, id: &TorrentId) -> Option<TorrentInfo> {
        let torrent = self.repository.torrent_by_id(id)?;
        Some(self.live_task(id).map_or_else(
            || TorrentInfo::basic(&torrent),
            |task| TorrentInfo::with_status(&torrent, task.status()),
        ))
    }

    /// [`Self::make_info_sync`] for every stored torrent.
    #[must_use]
    pub fn make_info_list_sync(&self) -> Vec<TorrentInfo> {
        self.repository
            .all_torrents()
            .iter()
            .map(|torrent| {
                self.live_task(&torrent.id).map_or_else(
                    || TorrentInfo::basic(torrent),
                    |task| TorrentInfo::with_status(torrent, task.status()),
                )
            })
            .collect()
    }

    /// Detailed swarm and storage info for `id`.
    #[must_use]
    pub fn make_advanced_info_sync(&self, id: &TorrentId) -> Option<AdvancedTorrentInfo> {
        self.live_task(id).map(|task| task.advanced_info())
    }

    /// Trackers of `id`.
    #[must_use]
    pub fn make_tracker_info_list(&self, id: &TorrentId) -> Vec<TrackerInfo> {
        self.live_task(id)
            .map(|task| task.tracker_infos())
            .unwrap_or_default()
    }

    /// Connected peers of `id`.
    #[must_use]
    pub fn make_peer_info_list(&self, id: &TorrentId) -> Vec<PeerInfo> {
        self.live_task(id)
            .map(|task| task.peer_infos())
            .unwrap_or_default()
    }

    /// Session-wide counters; `None` while stopped.
    #[must_use]
    pub fn make_session_stats(&self) -> Option<SessionStats> {
        self.session
            .is_running()
            .then(|| self.session.stats())
    }

    /// Speed limits of `id`.
    #[must_use]
    pub fn speed_limits(&self, id: &TorrentId) -> Option<SpeedLimits> {
        self.live_task(id).map(|task| SpeedLimits {
            download: task.download_speed_limit(),
            upload: task.upload_speed_limit(),
        })
    }

    /// Cap the download speed of `id`; `None` removes the cap.
    pub fn set_download_speed_limit(&self, id: &TorrentId, limit: Option<u64>) {
        if let Some(task) = self.live_task(id) {
            task.set_download_speed_limit(limit);
        }
    }

    /// Cap the upload speed of `id`; `None` removes the cap.
    pub fn set_upload_speed_limit(&self, id: &TorrentId, limit: Option<u64>) {
        if let Some(task) = self.live_task(id) {
            task.set_upload_speed_limit(limit);
        }
    }
}
