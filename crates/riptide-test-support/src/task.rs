//! Recording [`TorrentTask`] fake.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use riptide_events::TorrentId;
use riptide_torrent_core::{
    AddTorrentParams, AdvancedTorrentInfo, ChangeableParams, PeerInfo, Priority, TaskStatus,
    TorrentError, TorrentMetaInfo, TorrentResult, TorrentStateCode, TorrentTask, TrackerInfo,
    TrackerStatus,
};

/// Calls observed by a [`FakeTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCall {
    /// Policy pause.
    Pause,
    /// Policy resume.
    Resume,
    /// User pause.
    PauseManually,
    /// User resume.
    ResumeManually,
    /// Recheck request.
    ForceRecheck,
    /// Tracker announce request.
    Announce,
    /// Parameter update.
    ApplyParams(ChangeableParams),
    /// Tracker list replaced.
    ReplaceTrackers(BTreeSet<String>),
    /// Trackers appended.
    AddTrackers(BTreeSet<String>),
}

#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
struct TaskState {
    name: String,
    state: TorrentStateCode,
    paused: bool,
    valid: bool,
    changing_params: bool,
    download_path: PathBuf,
    sequential: bool,
    file_priorities: Vec<Priority>,
    trackers: BTreeSet<String>,
    metadata: Option<Vec<u8>>,
    download_limit: Option<u64>,
    upload_limit: Option<u64>,
    calls: Vec<TaskCall>,
}

/// In-memory task that records every call.
#[derive(Debug)]
pub struct FakeTask {
    id: TorrentId,
    state: Mutex<TaskState>,
}

impl FakeTask {
    /// Downloading task with no metadata.
    #[must_use]
    pub fn new(id: TorrentId, name: &str) -> Self {
        Self {
            id,
            state: Mutex::new(TaskState {
                name: name.to_string(),
                state: TorrentStateCode::Downloading,
                paused: false,
                valid: true,
                changing_params: false,
                download_path: PathBuf::new(),
                sequential: false,
                file_priorities: Vec::new(),
                trackers: BTreeSet::new(),
                metadata: None,
                download_limit: None,
                upload_limit: None,
                calls: Vec::new(),
            }),
        }
    }

    /// Set the lifecycle state.
    #[must_use]
    pub fn with_state(self, state: TorrentStateCode) -> Self {
        self.set_state(state);
        self
    }

    /// Attach bencoded metadata.
    #[must_use]
    pub fn with_metadata(self, bytes: Vec<u8>) -> Self {
        self.lock().metadata = Some(bytes);
        self
    }

    /// Seed the tracker list.
    #[must_use]
    pub fn with_trackers(self, trackers: &[&str]) -> Self {
        self.lock().trackers = trackers.iter().map(|url| (*url).to_string()).collect();
        self
    }

    /// Seed location, order and priorities from admission params.
    #[must_use]
    pub fn admitted(self, params: &AddTorrentParams) -> Self {
        {
            let mut state = self.lock();
            state.download_path.clone_from(&params.download_path);
            state.sequential = params.sequential;
            state.file_priorities.clone_from(&params.file_priorities);
            state.paused = params.add_paused;
        }
        self
    }

    /// Start paused.
    #[must_use]
    pub fn paused(self) -> Self {
        self.lock().paused = true;
        self
    }

    /// Set the lifecycle state.
    pub fn set_state(&self, state: TorrentStateCode) {
        self.lock().state = state;
    }

    /// Attach metadata after the fact, as a magnet fetch would.
    pub fn set_metadata(&self, bytes: Vec<u8>) {
        self.lock().metadata = Some(bytes);
    }

    /// Mark a parameter update as in progress.
    pub fn set_changing_params(&self, changing: bool) {
        self.lock().changing_params = changing;
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<TaskCall> {
        self.lock().calls.clone()
    }

    /// Current download path.
    #[must_use]
    pub fn download_path(&self) -> PathBuf {
        self.lock().download_path.clone()
    }

    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: TaskCall) -> MutexGuard<'_, TaskState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

impl TorrentTask for FakeTask {
    fn id(&self) -> &TorrentId {
        &self.id
    }

    fn is_valid(&self) -> bool {
        self.lock().valid
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn pause(&self) {
        self.record(TaskCall::Pause).paused = true;
    }

    fn resume(&self) {
        self.record(TaskCall::Resume).paused = false;
    }

    fn pause_manually(&self) -> TorrentResult<()> {
        let mut state = self.record(TaskCall::PauseManually);
        state.paused = true;
        state.state = TorrentStateCode::Paused;
        Ok(())
    }

    fn resume_manually(&self) -> TorrentResult<()> {
        let mut state = self.record(TaskCall::ResumeManually);
        state.paused = false;
        if state.state == TorrentStateCode::Paused {
            state.state = TorrentStateCode::Downloading;
        }
        Ok(())
    }

    fn force_recheck(&self) {
        self.record(TaskCall::ForceRecheck).state = TorrentStateCode::Checking;
    }

    fn request_tracker_announce(&self) {
        drop(self.record(TaskCall::Announce));
    }

    fn apply_params(&self, params: &ChangeableParams) -> TorrentResult<()> {
        let mut state = self.record(TaskCall::ApplyParams(params.clone()));
        if let Some(name) = &params.name {
            state.name.clone_from(name);
        }
        if let Some(path) = &params.download_path {
            state.download_path.clone_from(path);
        }
        if let Some(sequential) = params.sequential {
            state.sequential = sequential;
        }
        if let Some(priorities) = &params.file_priorities {
            state.file_priorities.clone_from(priorities);
        }
        Ok(())
    }

    fn is_during_change_params(&self) -> bool {
        self.lock().changing_params
    }

    fn trackers(&self) -> BTreeSet<String> {
        self.lock().trackers.clone()
    }

    fn replace_trackers(&self, urls: BTreeSet<String>) {
        let mut state = self.record(TaskCall::ReplaceTrackers(urls.clone()));
        state.trackers = urls;
    }

    fn add_trackers(&self, urls: BTreeSet<String>) {
        let mut state = self.record(TaskCall::AddTrackers(urls.clone()));
        state.trackers.extend(urls);
    }

    fn make_magnet(&self, include_priorities: bool) -> String {
        let state = self.lock();
        let mut uri = format!("magnet:?xt=urn:btih:{}&dn={}", self.id, state.name);
        if include_priorities && !state.file_priorities.is_empty() {
            let selected: Vec<String> = state
                .file_priorities
                .iter()
                .enumerate()
                .filter(|(_, priority)| **priority != Priority::Ignore)
                .map(|(index, _)| index.to_string())
                .collect();
            uri.push_str("&so=");
            uri.push_str(&selected.join(","));
        }
        uri
    }

    fn metainfo(&self) -> TorrentResult<TorrentMetaInfo> {
        match &self.lock().metadata {
            Some(bytes) => Ok(TorrentMetaInfo::from_bytes(bytes)?),
            None => Err(TorrentError::MetadataUnavailable {
                torrent_id: self.id.clone(),
            }),
        }
    }

    fn bencode(&self) -> Option<Vec<u8>> {
        self.lock().metadata.clone()
    }

    fn pieces(&self) -> Vec<bool> {
        self.metainfo()
            .map(|info| vec![false; info.piece_count])
            .unwrap_or_default()
    }

    fn state(&self) -> TorrentStateCode {
        self.lock().state
    }

    fn status(&self) -> TaskStatus {
        let state = self.lock();
        TaskStatus {
            state: state.state,
            progress: 0,
            received_bytes: 0,
            uploaded_bytes: 0,
            total_wanted: 0,
            download_speed: 0,
            upload_speed: 0,
            eta_secs: None,
            total_peers: 0,
            connected_peers: 0,
            sequential: state.sequential,
            file_priorities: state.file_priorities.clone(),
        }
    }

    fn advanced_info(&self) -> AdvancedTorrentInfo {
        AdvancedTorrentInfo {
            torrent_id: self.id.clone(),
            total_seeds: 0,
            connected_seeds: 0,
            downloaded_pieces: 0,
            share_ratio: 0.0,
            active_time_secs: 0,
            seeding_time_secs: 0,
            availability: 0.0,
            files_received_bytes: Vec::new(),
            files_availability: Vec::new(),
        }
    }

    fn tracker_infos(&self) -> Vec<TrackerInfo> {
        self.lock()
            .trackers
            .iter()
            .map(|url| TrackerInfo {
                url: url.clone(),
                tier: 0,
                status: TrackerStatus::NotContacted,
                message: None,
            })
            .collect()
    }

    fn peer_infos(&self) -> Vec<PeerInfo> {
        Vec::new()
    }

    fn download_speed_limit(&self) -> Option<u64> {
        self.lock().download_limit
    }

    fn set_download_speed_limit(&self, limit: Option<u64>) {
        self.lock().download_limit = limit;
    }

    fn upload_speed_limit(&self) -> Option<u64> {
        self.lock().upload_limit
    }

    fn set_upload_speed_limit(&self, limit: Option<u64>) {
        self.lock().upload_limit = limit;
    }

    fn is_sequential(&self) -> bool {
        self.lock().sequential
    }
}
