//! Recording [`Session`] fake.
//!
//! Locks are released before any event is dispatched so listeners may call
//! back into the session.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use riptide_events::{EngineEvent, InfoHash, ListenerRegistry, TorrentId};
use riptide_torrent_core::{
    AddTorrentParams, MagnetInfo, PortRange, Session, SessionSettings, SessionStats, Torrent,
    TorrentError, TorrentRepository, TorrentResult, TorrentTask,
};
use url::Url;

use crate::repository::MemoryRepository;
use crate::task::FakeTask;

/// Calls observed by a [`FakeSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    /// `start`
    Start,
    /// `stop`
    Stop,
    /// `add_torrent`
    AddTorrent {
        /// Info-hash of the admitted params.
        info_hash: InfoHash,
        /// Whether the source file was to be removed.
        remove_source: bool,
    },
    /// `delete_torrent`
    DeleteTorrent {
        /// Target torrent.
        id: TorrentId,
        /// Whether payload files were deleted.
        with_files: bool,
    },
    /// `restore_torrents`
    RestoreTorrents,
    /// `pause_all`
    PauseAll,
    /// `resume_all`
    ResumeAll,
    /// `pause_all_manually`
    PauseAllManually,
    /// `resume_all_manually`
    ResumeAllManually,
    /// `fetch_magnet`
    FetchMagnet(String),
    /// `cancel_fetch_magnet`
    CancelFetchMagnet(InfoHash),
    /// `set_settings`
    SetSettings,
    /// `set_port_range`
    SetPortRange(PortRange),
    /// `enable_ip_filter`
    EnableIpFilter(PathBuf),
    /// `disable_ip_filter`
    DisableIpFilter,
}

#[derive(Debug)]
struct SessionState {
    running: bool,
    emit_started: bool,
    tasks: BTreeMap<TorrentId, Arc<FakeTask>>,
    magnets: HashMap<InfoHash, Vec<u8>>,
    settings: SessionSettings,
    port_range: Option<PortRange>,
    fail_next_add: Option<TorrentError>,
    calls: Vec<SessionCall>,
}

/// In-memory session that records calls and dispatches events synchronously.
pub struct FakeSession {
    events: ListenerRegistry,
    repository: Option<Arc<MemoryRepository>>,
    state: Mutex<SessionState>,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSession {
    /// Stopped session whose `start` emits `SessionStarted` immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: ListenerRegistry::new(),
            repository: None,
            state: Mutex::new(SessionState {
                running: false,
                emit_started: true,
                tasks: BTreeMap::new(),
                magnets: HashMap::new(),
                settings: SessionSettings::default(),
                port_range: None,
                fail_next_add: None,
                calls: Vec::new(),
            }),
        }
    }

    /// Mirror admitted torrents into `repository`.
    #[must_use]
    pub fn with_repository(mut self, repository: Arc<MemoryRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Make `start` wait for [`FakeSession::emit_started`].
    #[must_use]
    pub fn with_deferred_start(self) -> Self {
        self.lock().emit_started = false;
        self
    }

    /// Mark the session running and dispatch `SessionStarted`.
    pub fn emit_started(&self) {
        self.lock().running = true;
        self.emit(&EngineEvent::SessionStarted);
    }

    /// Flip the running flag without any event.
    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    /// Dispatch an arbitrary event to registered listeners.
    pub fn emit(&self, event: &EngineEvent) {
        let _ = self.events.dispatch(event);
    }

    /// Make the next `add_torrent` fail with `error`.
    pub fn fail_next_add(&self, error: TorrentError) {
        self.lock().fail_next_add = Some(error);
    }

    /// Register a live task.
    pub fn insert_task(&self, task: FakeTask) -> Arc<FakeTask> {
        let task = Arc::new(task);
        self.lock()
            .tasks
            .insert(task.id().clone(), Arc::clone(&task));
        task
    }

    /// Concrete handle to a live task.
    #[must_use]
    pub fn fake_task(&self, id: &TorrentId) -> Option<Arc<FakeTask>> {
        self.lock().tasks.get(id).cloned()
    }

    /// Store fetched metadata (when present) and dispatch `MagnetLoaded`.
    pub fn complete_magnet(&self, info_hash: &InfoHash, metadata: Option<Vec<u8>>) {
        {
            let mut state = self.lock();
            if let Some(bytes) = &metadata {
                state.magnets.insert(info_hash.clone(), bytes.clone());
                if let Some(task) = state.tasks.get(info_hash) {
                    task.set_metadata(bytes.clone());
                }
            }
        }
        self.emit(&EngineEvent::MagnetLoaded {
            info_hash: info_hash.clone(),
            metadata,
        });
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<SessionCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Last port range applied.
    #[must_use]
    pub fn port_range(&self) -> Option<PortRange> {
        self.lock().port_range
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: SessionCall) -> MutexGuard<'_, SessionState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

impl Session for FakeSession {
    fn start(&self) -> TorrentResult<()> {
        let emit = {
            let mut state = self.record(SessionCall::Start);
            if state.emit_started {
                state.running = true;
            }
            state.emit_started
        };
        if emit {
            self.emit(&EngineEvent::SessionStarted);
        }
        Ok(())
    }

    fn stop(&self) -> TorrentResult<()> {
        self.record(SessionCall::Stop).running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn events(&self) -> &ListenerRegistry {
        &self.events
    }

    fn add_torrent(&self, params: AddTorrentParams, remove_source: bool) -> TorrentResult<Torrent> {
        let torrent = {
            let mut state = self.record(SessionCall::AddTorrent {
                info_hash: params.info_hash.clone(),
                remove_source,
            });
            if !state.running {
                return Err(TorrentError::EngineStopped {
                    operation: "session.add_torrent",
                });
            }
            if let Some(error) = state.fail_next_add.take() {
                return Err(error);
            }
            if state.tasks.contains_key(&params.info_hash) {
                return Err(TorrentError::AlreadyExists {
                    torrent_id: params.info_hash,
                });
            }

            let cached = if params.from_magnet() {
                state.magnets.get(&params.info_hash).cloned()
            } else {
                None
            };
            let mut task = FakeTask::new(params.info_hash.clone(), &params.name).admitted(&params);
            if let Some(bytes) = cached {
                task = task.with_metadata(bytes);
            }
            state
                .tasks
                .insert(params.info_hash.clone(), Arc::new(task));
            drop(state);

            Torrent {
                id: params.info_hash,
                name: params.name,
                download_path: params.download_path,
                date_added: Utc::now(),
                error: None,
            }
        };

        if let Some(repository) = &self.repository {
            repository.insert(torrent.clone());
        }
        self.emit(&EngineEvent::TorrentAdded {
            torrent_id: torrent.id.clone(),
        });
        Ok(torrent)
    }

    fn delete_torrent(&self, id: &TorrentId, with_files: bool) -> TorrentResult<()> {
        self.record(SessionCall::DeleteTorrent {
            id: id.clone(),
            with_files,
        })
        .tasks
        .remove(id);
        Ok(())
    }

    fn restore_torrents(&self) -> TorrentResult<()> {
        drop(self.record(SessionCall::RestoreTorrents));
        let restored: Vec<TorrentId> = self
            .repository
            .as_ref()
            .map(|repository| {
                repository
                    .all_torrents()
                    .into_iter()
                    .map(|torrent| torrent.id)
                    .collect()
            })
            .unwrap_or_default();
        for torrent_id in restored {
            self.emit(&EngineEvent::TorrentLoaded { torrent_id });
        }
        Ok(())
    }

    fn task(&self, id: &TorrentId) -> Option<Arc<dyn TorrentTask>> {
        self.fake_task(id)
            .map(|task| task as Arc<dyn TorrentTask>)
    }

    fn tasks(&self) -> Vec<Arc<dyn TorrentTask>> {
        self.lock()
            .tasks
            .values()
            .map(|task| Arc::clone(task) as Arc<dyn TorrentTask>)
            .collect()
    }

    fn pause_all(&self) {
        let tasks: Vec<_> = self.record(SessionCall::PauseAll).tasks.values().cloned().collect();
        for task in tasks {
            task.pause();
        }
    }

    fn resume_all(&self) {
        let tasks: Vec<_> = self.record(SessionCall::ResumeAll).tasks.values().cloned().collect();
        for task in tasks {
            task.resume();
        }
    }

    fn pause_all_manually(&self) {
        drop(self.record(SessionCall::PauseAllManually));
    }

    fn resume_all_manually(&self) {
        drop(self.record(SessionCall::ResumeAllManually));
    }

    fn fetch_magnet(&self, uri: &str) -> TorrentResult<MagnetInfo> {
        drop(self.record(SessionCall::FetchMagnet(uri.to_string())));
        self.parse_magnet(uri)
    }

    fn parse_magnet(&self, uri: &str) -> TorrentResult<MagnetInfo> {
        let url = Url::parse(uri)
            .map_err(|err| TorrentError::session("session.parse_magnet", None, err))?;
        if url.scheme() != "magnet" {
            return Err(TorrentError::session(
                "session.parse_magnet",
                None,
                "not a magnet uri",
            ));
        }
        let mut info_hash = None;
        let mut name = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "xt" => {
                    if let Some(hex) = value.strip_prefix("urn:btih:") {
                        info_hash = Some(InfoHash::parse(hex).map_err(|err| {
                            TorrentError::session("session.parse_magnet", None, err)
                        })?);
                    }
                }
                "dn" => name = Some(value.into_owned()),
                _ => {}
            }
        }
        let Some(info_hash) = info_hash else {
            return Err(TorrentError::session(
                "session.parse_magnet",
                None,
                "magnet uri has no btih topic",
            ));
        };
        Ok(MagnetInfo {
            uri: uri.to_string(),
            name: name.unwrap_or_else(|| info_hash.to_string()),
            info_hash,
            file_priorities: Vec::new(),
        })
    }

    fn loaded_magnet(&self, hash: &InfoHash) -> Option<Vec<u8>> {
        self.lock().magnets.get(hash).cloned()
    }

    fn cancel_fetch_magnet(&self, hash: &InfoHash) {
        drop(self.record(SessionCall::CancelFetchMagnet(hash.clone())));
    }

    fn settings(&self) -> SessionSettings {
        self.lock().settings.clone()
    }

    fn set_settings(&self, settings: &SessionSettings) {
        self.record(SessionCall::SetSettings).settings = settings.clone();
    }

    fn set_port_range(&self, range: PortRange) {
        self.record(SessionCall::SetPortRange(range)).port_range = Some(range);
    }

    fn enable_ip_filter(&self, path: &Path) {
        drop(self.record(SessionCall::EnableIpFilter(path.to_path_buf())));
    }

    fn disable_ip_filter(&self) {
        drop(self.record(SessionCall::DisableIpFilter));
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            listen_port: self.lock().port_range.map(|range| range.first),
            ..SessionStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TorrentFixture;
    use riptide_torrent_core::{Priority, TorrentSource};

    fn params(fixture: &TorrentFixture) -> anyhow::Result<AddTorrentParams> {
        Ok(AddTorrentParams {
            source: TorrentSource::File {
                path: PathBuf::from("/tmp/x.torrent"),
            },
            info_hash: fixture.info_hash()?,
            name: fixture.name().to_string(),
            file_priorities: vec![Priority::Default; fixture.file_count()],
            download_path: PathBuf::from("/downloads"),
            sequential: false,
            add_paused: false,
        })
    }

    #[test]
    fn add_requires_running_and_rejects_duplicates() -> anyhow::Result<()> {
        let repository = Arc::new(MemoryRepository::new());
        let session = FakeSession::new().with_repository(Arc::clone(&repository));
        let fixture = TorrentFixture::single("linux.iso", 10);

        assert!(matches!(
            session.add_torrent(params(&fixture)?, false),
            Err(TorrentError::EngineStopped { .. })
        ));

        session.start()?;
        let torrent = session.add_torrent(params(&fixture)?, false)?;
        assert_eq!(torrent.id, fixture.info_hash()?);
        assert!(repository.torrent_by_id(&torrent.id).is_some());
        assert!(matches!(
            session.add_torrent(params(&fixture)?, false),
            Err(TorrentError::AlreadyExists { .. })
        ));
        assert_eq!(session.tasks().len(), 1);
        Ok(())
    }

    #[test]
    fn start_emits_session_started_to_listeners() -> anyhow::Result<()> {
        let session = Arc::new(FakeSession::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.events().add(Arc::new(move |event: &EngineEvent| -> anyhow::Result<()> {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.kind());
            Ok(())
        }));

        session.start()?;
        assert!(session.is_running());
        assert_eq!(
            *seen.lock().unwrap_or_else(PoisonError::into_inner),
            vec!["session_started"]
        );
        Ok(())
    }

    #[test]
    fn magnets_parse_and_complete() -> anyhow::Result<()> {
        let session = FakeSession::new();
        let fixture = TorrentFixture::single("movie.mkv", 99);
        let info = session.fetch_magnet(&fixture.magnet_uri()?)?;
        assert_eq!(info.info_hash, fixture.info_hash()?);
        assert_eq!(info.name, "movie.mkv");
        assert!(session.loaded_magnet(&info.info_hash).is_none());

        session.complete_magnet(&info.info_hash, Some(fixture.info_bytes()?));
        assert!(session.loaded_magnet(&info.info_hash).is_some());
        assert!(session.parse_magnet("https://example.org").is_err());
        assert!(session.parse_magnet("magnet:?dn=nothing").is_err());
        Ok(())
    }
}
