//! Engine façade: lifecycle, settings propagation, policy and torrent control.
//!
//! # Design
//! - One coordinator per process, installed through a one-time-init global;
//!   tests construct private instances with [`EngineCoordinator::new`].
//! - Mutating operations are submitted to the [`TaskExecutor`] and return
//!   immediately. Queries run on the caller's thread.
//! - Background units hold a `Weak` handle, so queued work never keeps a
//!   dropped coordinator alive.
//! - First-run initialization steps fail independently; one failing step is
//!   logged and the rest still run.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use once_cell::sync::OnceCell;
use riptide_config::{ConfigStore, SettingKey, SettingsChange, SettingsStream};
use riptide_events::ListenerId;
use riptide_fsops::{DirectoryWatcher, FileSystem, FsOpsError, TorrentSink};
use riptide_telemetry::Metrics;
use riptide_torrent_core::{
    ChangeableParams, InfoHash, MagnetInfo, PortRange, Session, TorrentError, TorrentId,
    TorrentRepository, TorrentResult,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collaborators::{Notice, Notifier, ServiceHost, StreamingServer};
use crate::error::{EngineError, EngineResult};
use crate::executor::TaskExecutor;
use crate::magnet::{MagnetResolutionBridge, MetadataFuture};
use crate::policy::{DeviceSignal, DeviceState, PolicyInputs, PolicySubscriptions};
use crate::reactions::CoordinatorListener;
use crate::settings_bridge::{SettingsChangeBridge, SideEffect};
use crate::settings_store::SessionSettingsStore;

static GLOBAL: OnceCell<Arc<EngineCoordinator>> = OnceCell::new();

/// Lifecycle of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Session not running.
    Stopped,
    /// Session start requested; first-run initialization pending.
    Starting,
    /// Session running and initialized.
    Running,
    /// Shutdown in progress.
    Stopping,
}

/// Collaborators the coordinator is built from.
pub struct EngineDeps {
    /// Torrent session.
    pub session: Arc<dyn Session>,
    /// Preference store.
    pub config: Arc<dyn ConfigStore>,
    /// Persisted torrent entities.
    pub repository: Arc<dyn TorrentRepository>,
    /// User notification sink.
    pub notifier: Arc<dyn Notifier>,
    /// Filesystem access.
    pub fs: Arc<dyn FileSystem>,
    /// Power and connectivity probes.
    pub device: Arc<dyn DeviceState>,
    /// Payload streaming server.
    pub streaming: Arc<dyn StreamingServer>,
    /// Hosting service.
    pub host: Arc<dyn ServiceHost>,
    /// Metrics registry.
    pub metrics: Metrics,
}

/// Per-torrent speed limits in bytes per second; `None` is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeedLimits {
    /// Download limit.
    pub download: Option<u64>,
    /// Upload limit.
    pub upload: Option<u64>,
}

/// Façade coordinating the session with preferences, storage and policy.
pub struct EngineCoordinator {
    this: Weak<Self>,
    pub(crate) session: Arc<dyn Session>,
    pub(crate) config: Arc<dyn ConfigStore>,
    pub(crate) repository: Arc<dyn TorrentRepository>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) fs: Arc<dyn FileSystem>,
    device: Arc<dyn DeviceState>,
    streaming: Arc<dyn StreamingServer>,
    pub(crate) host: Arc<dyn ServiceHost>,
    pub(crate) metrics: Metrics,
    executor: TaskExecutor,
    settings: SettingsChangeBridge,
    pub(crate) magnets: MagnetResolutionBridge,
    subscriptions: Mutex<PolicySubscriptions>,
    watcher: Mutex<Option<DirectoryWatcher>>,
    state: Mutex<EngineState>,
    listener: Mutex<Option<ListenerId>>,
    settings_task: Mutex<Option<JoinHandle<()>>>,
    /// Held while settings side effects or session initialization run.
    effects: Mutex<()>,
}

impl EngineCoordinator {
    /// Build a coordinator, register its session listener and start consuming
    /// preference changes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] outside a Tokio runtime.
    pub fn new(deps: EngineDeps) -> EngineResult<Arc<Self>> {
        let executor = TaskExecutor::current(deps.metrics.clone())?;
        let store = Arc::new(SessionSettingsStore::new(Arc::clone(&deps.session)));
        let settings =
            SettingsChangeBridge::new(Arc::clone(&deps.config), store, deps.metrics.clone());
        let magnets = MagnetResolutionBridge::new(Arc::clone(&deps.session));
        let changes = deps.config.subscribe();

        let engine = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            session: deps.session,
            config: deps.config,
            repository: deps.repository,
            notifier: deps.notifier,
            fs: deps.fs,
            device: deps.device,
            streaming: deps.streaming,
            host: deps.host,
            metrics: deps.metrics,
            executor,
            settings,
            magnets,
            subscriptions: Mutex::new(PolicySubscriptions::new()),
            watcher: Mutex::new(None),
            state: Mutex::new(EngineState::Stopped),
            listener: Mutex::new(None),
            settings_task: Mutex::new(None),
            effects: Mutex::new(()),
        });

        let listener = engine
            .session
            .events()
            .add(Arc::new(CoordinatorListener::new(Arc::downgrade(&engine))));
        *lock(&engine.listener) = Some(listener);
        let task = engine
            .executor
            .handle()
            .spawn(settings_loop(Arc::downgrade(&engine), changes));
        *lock(&engine.settings_task) = Some(task);

        info!(listener = listener.get(), "engine coordinator ready");
        Ok(engine)
    }

    /// Install the process-wide coordinator, building it on first call.
    ///
    /// Later calls return the installed instance and drop `deps`.
    ///
    /// # Errors
    ///
    /// Returns the construction error of the first successful attempt.
    pub fn install(deps: EngineDeps) -> EngineResult<&'static Arc<Self>> {
        GLOBAL.get_or_try_init(|| Self::new(deps))
    }

    /// The installed coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInstalled`] before [`Self::install`].
    pub fn global() -> EngineResult<&'static Arc<Self>> {
        GLOBAL.get().ok_or(EngineError::NotInstalled)
    }

    /// Executor running background work.
    #[must_use]
    pub const fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    /// Whether the session accepts commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Start the session; initialization completes once it reports started.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Torrent`] when the session refuses to start.
    pub fn start(&self) -> EngineResult<()> {
        if self.session.is_running() {
            debug!("session already running");
            return Ok(());
        }
        self.set_state(EngineState::Starting);
        info!("starting session");
        self.session.start().map_err(|source| {
            self.set_state(EngineState::Stopped);
            EngineError::torrent("start", source)
        })
    }

    /// Stop the session and everything riding on it. Every step is
    /// best-effort.
    pub fn stop(&self) {
        if !self.session.is_running() {
            debug!("session not running");
            return;
        }
        self.set_state(EngineState::Stopping);
        info!("stopping session");

        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.stop();
        }
        self.streaming.stop();
        if let Err(err) = self.session.stop() {
            warn!(error = %err, "session stop failed");
        }
        if let Err(err) = self.fs.clean_temp_dir() {
            warn!(error = %err, "temp storage cleanup failed");
        }
        lock(&self.subscriptions).clear();

        self.set_state(EngineState::Stopped);
        info!("session stopped");
    }

    pub(crate) fn set_state(&self, state: EngineState) {
        *lock(&self.state) = state;
    }

    /// Run `work` against this coordinator on the executor.
    pub(crate) fn submit<F>(&self, operation: &'static str, work: F)
    where
        F: FnOnce(&Self) -> anyhow::Result<()> + Send + 'static,
    {
        let engine = self.this.clone();
        self.executor.submit(operation, move || {
            let Some(engine) = engine.upgrade() else {
                debug!(operation, "engine dropped before work ran");
                return Ok(());
            };
            work(&engine)
        });
    }

    pub(crate) fn downgrade(&self) -> Weak<Self> {
        self.this.clone()
    }

    /// First-run initialization once the session reports started.
    pub(crate) fn initialize_session(&self) {
        let _effects = lock(&self.effects);
        self.settings.push_initial();
        let prefs = self.config.snapshot();

        if let Err(err) = self.apply_port_range(prefs.network.use_random_port) {
            warn!(step = "port_range", error = ?err, "session initialization step failed");
        }
        if let Err(err) = self.apply_pending_proxy(true) {
            warn!(step = "proxy", error = ?err, "session initialization step failed");
        }
        self.apply_ip_filter();
        if let Err(err) = self.restart_watch() {
            warn!(step = "watch_dir", error = ?err, "session initialization step failed");
        }
        if let Err(err) = self.restart_streaming() {
            warn!(step = "streaming", error = ?err, "session initialization step failed");
        }

        let evaluate_now = lock(&self.subscriptions).sync(&prefs);
        self.set_state(EngineState::Running);
        info!(battery_level_subscribed = evaluate_now, "session initialized");
        self.reschedule_torrents();
    }

    fn on_settings_change(&self, change: &SettingsChange) {
        if !self.session.is_running() {
            debug!(?change, "session not running; settings change deferred to start");
            return;
        }
        let _effects = lock(&self.effects);
        match change {
            SettingsChange::Lagged => {
                warn!("settings notifications lagged; resyncing");
                self.settings.resync();
                lock(&self.subscriptions).sync(&self.config.snapshot());
                self.reschedule_torrents();
            }
            SettingsChange::Key(token) => {
                let Some(reaction) = self.settings.handle_token(token) else {
                    return;
                };
                if let Some(effect) = reaction.effect {
                    self.apply_effect(reaction.key, effect);
                }
                if reaction.reschedule {
                    self.reschedule_torrents();
                }
            }
        }
    }

    fn apply_effect(&self, key: SettingKey, effect: SideEffect) {
        debug!(key = key.as_str(), ?effect, "applying settings side effect");
        let result = match effect {
            SideEffect::PolicySubscriptions => {
                self.resubscribe_policy(key);
                Ok(())
            }
            SideEffect::RandomPort => {
                let random = self.config.snapshot().network.use_random_port;
                self.apply_port_range(random)
            }
            SideEffect::PortRange => self.apply_port_range(false),
            SideEffect::IpFilter => {
                self.apply_ip_filter();
                Ok(())
            }
            SideEffect::ApplyProxy => self.apply_pending_proxy(false).map(|applied| {
                if applied {
                    self.notifier.notify(Notice::ProxyApplied);
                }
            }),
            SideEffect::WatchDir => self.restart_watch(),
            SideEffect::Streaming => self.restart_streaming(),
        };
        if let Err(err) = result {
            warn!(key = key.as_str(), error = ?err, "settings side effect failed");
        }
    }

    fn resubscribe_policy(&self, key: SettingKey) {
        let prefs = self.config.snapshot();
        let evaluate_now = {
            let mut subscriptions = lock(&self.subscriptions);
            let started = subscriptions.sync(&prefs);
            started
                || (key == SettingKey::CustomBatteryControlValue
                    && subscriptions.is_subscribed(DeviceSignal::BatteryLevel))
        };
        if evaluate_now {
            self.reschedule_torrents();
        }
    }

    /// Bind the configured range, or draw a random one and persist it.
    fn apply_port_range(&self, random: bool) -> EngineResult<()> {
        if !random {
            let network = self.config.snapshot().network;
            let range = PortRange::new(network.port_range_first, network.port_range_second);
            debug!(first = range.first, second = range.second, "binding port range");
            self.session.set_port_range(range);
            return Ok(());
        }

        let range = PortRange::random(&mut rand::rng());
        info!(first = range.first, second = range.second, "binding random port range");
        self.session.set_port_range(range);
        self.config
            .update(SettingKey::PortRangeFirst, &|prefs| {
                prefs.network.port_range_first = range.first;
                prefs.network.port_range_second = range.second;
            })
            .map_err(|source| EngineError::config("persist_port_range", source))
    }

    /// Push pending proxy preferences. At startup `proxy_changed` counts as
    /// pending too. Returns whether anything was pushed.
    fn apply_pending_proxy(&self, startup: bool) -> EngineResult<bool> {
        let proxy = self.config.snapshot().proxy;
        let pending = proxy.apply_proxy || (startup && proxy.proxy_changed);
        if !pending {
            return Ok(false);
        }
        self.config
            .update(SettingKey::ApplyProxy, &|prefs| {
                prefs.proxy.apply_proxy = false;
                prefs.proxy.proxy_changed = false;
            })
            .map_err(|source| EngineError::config("reset_proxy_flags", source))?;
        self.settings.push_proxy();
        info!(kind = ?proxy.kind, "proxy settings applied");
        Ok(true)
    }

    fn apply_ip_filter(&self) {
        let network = self.config.snapshot().network;
        match (network.enable_ip_filtering, network.ip_filtering_file) {
            (true, Some(path)) => {
                info!(path = %path.display(), "enabling ip filter");
                self.session.enable_ip_filter(&path);
            }
            (true, None) => debug!("ip filtering enabled without a filter file"),
            (false, _) => self.session.disable_ip_filter(),
        }
    }

    /// Stop the directory watch and start it again when enabled.
    fn restart_watch(&self) -> EngineResult<()> {
        let mut watcher = lock(&self.watcher);
        if let Some(previous) = watcher.take() {
            previous.stop();
        }

        let storage = self.config.snapshot().storage;
        if !storage.watch_dir {
            return Ok(());
        }
        let Some(dir) = storage.dir_to_watch else {
            debug!("directory watch enabled without a directory");
            return Ok(());
        };
        if self.fs.is_restricted(&dir) {
            return Err(EngineError::fsops(
                "watch_dir",
                FsOpsError::Restricted { path: dir },
            ));
        }

        let engine = self.downgrade();
        let sink: TorrentSink = Arc::new(move |path| {
            if let Some(engine) = engine.upgrade() {
                engine.add_torrent_file(path, false);
            }
        });
        *watcher = Some(
            DirectoryWatcher::start(&dir, sink)
                .map_err(|source| EngineError::fsops("watch_dir", source))?,
        );
        drop(watcher);
        Ok(())
    }

    /// Stop the streaming server and start it again when enabled.
    fn restart_streaming(&self) -> EngineResult<()> {
        self.streaming.stop();
        let streaming = self.config.snapshot().streaming;
        if !streaming.enable_streaming {
            return Ok(());
        }
        match self.streaming.start(&streaming.hostname, streaming.port) {
            Ok(()) => {
                info!(host = %streaming.hostname, port = streaming.port, "streaming server started");
                Ok(())
            }
            Err(source) => {
                self.notifier.notify(Notice::StreamingFailed {
                    message: format!("{source:#}"),
                });
                Err(EngineError::Streaming { source })
            }
        }
    }

    /// Whether the power and connectivity policy currently demands a pause.
    #[must_use]
    pub fn should_pause_for_policy(&self) -> bool {
        PolicyInputs::capture(&self.config.snapshot(), self.device.as_ref()).should_pause()
    }

    /// Re-evaluate the policy and pause or resume every torrent.
    pub fn reschedule_torrents(&self) {
        self.submit("reschedule_torrents", |engine| {
            if !engine.session.is_running() {
                engine.metrics.inc_policy_reschedule("stopped");
                return Ok(());
            }
            if engine.should_pause_for_policy() {
                debug!("policy pauses all torrents");
                engine.session.pause_all();
                engine.metrics.inc_policy_reschedule("pause");
            } else {
                debug!("policy resumes all torrents");
                engine.session.resume_all();
                engine.metrics.inc_policy_reschedule("resume");
            }
            Ok(())
        });
    }

    /// Platform broadcast entry point.
    pub fn on_device_state_changed(&self, signal: DeviceSignal) {
        if lock(&self.subscriptions).is_subscribed(signal) {
            self.reschedule_torrents();
        } else {
            debug!(?signal, "ignoring unsubscribed device signal");
        }
    }

    /// Pause `id` under the policy, when the policy says so.
    pub(crate) fn pause_for_policy(&self, id: &TorrentId) {
        if let Some(task) = self.session.task(id)
            && self.should_pause_for_policy()
        {
            debug!(torrent_id = %id, "policy pauses new torrent");
            task.pause();
        }
    }

    /// Toggle the manual pause of `id`.
    pub fn pause_resume_torrent(&self, id: TorrentId) {
        self.submit("pause_resume_torrent", move |engine| {
            let Some(task) = engine.live_task(&id) else {
                return Ok(());
            };
            if task.is_paused() {
                task.resume_manually()?;
            } else {
                task.pause_manually()?;
            }
            Ok(())
        });
    }

    /// Recheck the payload of every torrent in `ids`.
    pub fn force_recheck_torrents(&self, ids: Vec<TorrentId>) {
        self.submit("force_recheck_torrents", move |engine| {
            for task in ids.iter().filter_map(|id| engine.live_task(id)) {
                task.force_recheck();
            }
            Ok(())
        });
    }

    /// Announce every torrent in `ids` to its trackers.
    pub fn force_announce_torrents(&self, ids: Vec<TorrentId>) {
        self.submit("force_announce_torrents", move |engine| {
            for task in ids.iter().filter_map(|id| engine.live_task(id)) {
                task.request_tracker_announce();
            }
            Ok(())
        });
    }

    /// Remove torrents, optionally deleting downloaded files.
    pub fn delete_torrents(&self, ids: Vec<TorrentId>, with_files: bool) {
        self.submit("delete_torrents", move |engine| {
            if !engine.session.is_running() {
                return Ok(());
            }
            for id in &ids {
                if let Err(err) = engine.session.delete_torrent(id, with_files) {
                    warn!(torrent_id = %id, error = %err, "delete torrent failed");
                }
            }
            Ok(())
        });
    }

    /// Pause every torrent at the user's request.
    pub fn pause_all(&self) {
        self.submit("pause_all", |engine| {
            if engine.session.is_running() {
                engine.session.pause_all_manually();
            }
            Ok(())
        });
    }

    /// Resume every torrent at the user's request.
    pub fn resume_all(&self) {
        self.submit("resume_all", |engine| {
            if engine.session.is_running() {
                engine.session.resume_all_manually();
            }
            Ok(())
        });
    }

    /// Apply a partial parameter update to `id`.
    pub fn change_params(&self, id: TorrentId, params: ChangeableParams) {
        self.submit("change_params", move |engine| {
            if let Some(task) = engine.live_task(&id) {
                task.apply_params(&params)?;
            }
            Ok(())
        });
    }

    /// Restore saved torrents into the running session.
    pub fn load_torrents(&self) {
        self.submit("load_torrents", |engine| {
            if !engine.session.is_running() {
                return Ok(());
            }
            engine.session.restore_torrents()?;
            Ok(())
        });
    }

    /// Start fetching `uri` and wait for its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::EngineStopped`] when the session is not running
    /// and the session error when the fetch cannot start.
    pub fn fetch_magnet(&self, uri: &str) -> TorrentResult<(MagnetInfo, MetadataFuture)> {
        if !self.session.is_running() {
            return Err(TorrentError::EngineStopped {
                operation: "fetch_magnet",
            });
        }
        self.magnets.fetch_magnet(uri)
    }

    /// Wait for the metadata of an already started fetch.
    pub fn fetch_metadata(&self, info_hash: &InfoHash) -> MetadataFuture {
        self.magnets.fetch_metadata(info_hash)
    }

    /// Parse `uri` without starting a fetch.
    ///
    /// # Errors
    ///
    /// Returns the session error for malformed links.
    pub fn parse_magnet(&self, uri: &str) -> TorrentResult<MagnetInfo> {
        self.session.parse_magnet(uri)
    }

    /// Stop fetching `info_hash`; a no-op when stopped.
    pub fn cancel_fetch_magnet(&self, info_hash: &InfoHash) {
        if self.session.is_running() {
            self.magnets.cancel(info_hash);
        }
    }

    /// Add trackers to `id`.
    pub fn add_trackers(&self, id: &TorrentId, urls: BTreeSet<String>) {
        if let Some(task) = self.live_task(id) {
            task.add_trackers(urls);
        }
    }

    /// Replace the tracker list of `id`.
    pub fn replace_trackers(&self, id: &TorrentId, urls: BTreeSet<String>) {
        if let Some(task) = self.live_task(id) {
            task.replace_trackers(urls);
        }
    }

    /// Remove `urls` from the tracker list of `id`.
    pub fn delete_trackers(&self, id: &TorrentId, urls: &BTreeSet<String>) {
        if let Some(task) = self.live_task(id) {
            let remaining = task.trackers().difference(urls).cloned().collect();
            task.replace_trackers(remaining);
        }
    }
}

impl Drop for EngineCoordinator {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = listener {
            self.session.events().remove(id);
        }
        let task = self
            .settings_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

async fn settings_loop(engine: Weak<EngineCoordinator>, mut changes: SettingsStream) {
    while let Some(change) = changes.next().await {
        let Some(strong) = engine.upgrade() else {
            break;
        };
        let executor = strong.executor.clone();
        drop(strong);
        let target = engine.clone();
        executor
            .run("settings_change", move || {
                if let Some(engine) = target.upgrade() {
                    engine.on_settings_change(&change);
                }
                Ok(())
            })
            .await;
    }
    debug!("settings change stream closed");
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
