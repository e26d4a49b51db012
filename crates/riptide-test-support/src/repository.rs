//! In-memory [`TorrentRepository`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use riptide_events::TorrentId;
use riptide_torrent_core::{Torrent, TorrentRepository};

/// Repository backed by a map, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    torrents: Mutex<BTreeMap<TorrentId, Torrent>>,
}

impl MemoryRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace an entity.
    pub fn insert(&self, torrent: Torrent) {
        self.lock().insert(torrent.id.clone(), torrent);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<TorrentId, Torrent>> {
        self.torrents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TorrentRepository for MemoryRepository {
    fn torrent_by_id(&self, id: &TorrentId) -> Option<Torrent> {
        self.lock().get(id).cloned()
    }

    fn all_torrents(&self) -> Vec<Torrent> {
        self.lock().values().cloned().collect()
    }

    async fn load_torrent(&self, id: &TorrentId) -> anyhow::Result<Option<Torrent>> {
        Ok(self.torrent_by_id(id))
    }
}
