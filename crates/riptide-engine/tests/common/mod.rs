//! Harness shared by the coordinator integration suites.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use riptide_config::{MemoryConfigStore, Preferences};
use riptide_engine::{
    DeviceState, EngineCoordinator, EngineDeps, EngineState, Notice, Notifier, ServiceHost,
    StreamingServer,
};
use riptide_fsops::{FileSystem, FsOpsResult, LocalFileSystem};
use riptide_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};
use riptide_test_support::{FakeSession, MemoryRepository, SessionCall, TorrentFixture};
use riptide_torrent_core::{AddTorrentParams, Priority, Torrent, TorrentSource};
use tempfile::TempDir;

const POLL_STEP: Duration = Duration::from_millis(10);
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds or the timeout elapses.
pub async fn eventually<F>(what: &str, mut condition: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(POLL_STEP).await;
    }
    bail!("timed out waiting for {what}")
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[derive(Default)]
pub struct RecordingStreaming {
    pub fail: AtomicBool,
    starts: Mutex<Vec<(String, u16)>>,
    pub stops: AtomicUsize,
    /// Time each `start` takes, in milliseconds.
    pub bind_delay_ms: AtomicU64,
    /// `start` calls that began while another was still binding.
    pub overlapping_starts: AtomicUsize,
    /// `start` calls made while the server was already running.
    pub starts_while_running: AtomicUsize,
    running: AtomicBool,
    binding: AtomicUsize,
}

impl RecordingStreaming {
    pub fn starts(&self) -> Vec<(String, u16)> {
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StreamingServer for RecordingStreaming {
    fn start(&self, host: &str, port: u16) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("address in use");
        }
        if self.binding.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapping_starts.fetch_add(1, Ordering::SeqCst);
        }
        if self.running.load(Ordering::SeqCst) {
            self.starts_while_running.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::sleep(Duration::from_millis(
            self.bind_delay_ms.load(Ordering::SeqCst),
        ));
        self.running.store(true, Ordering::SeqCst);
        self.binding.fetch_sub(1, Ordering::SeqCst);
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((host.to_string(), port));
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct CountingHost {
    pub started: AtomicUsize,
}

impl ServiceHost for CountingHost {
    fn ensure_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeDevice {
    pub roaming: AtomicBool,
    pub metered: AtomicBool,
    pub charging: AtomicBool,
    pub percent: AtomicU8,
    pub low: AtomicBool,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            roaming: AtomicBool::new(false),
            metered: AtomicBool::new(false),
            charging: AtomicBool::new(true),
            percent: AtomicU8::new(100),
            low: AtomicBool::new(false),
        }
    }
}

impl DeviceState for FakeDevice {
    fn is_roaming(&self) -> bool {
        self.roaming.load(Ordering::SeqCst)
    }

    fn is_metered(&self) -> bool {
        self.metered.load(Ordering::SeqCst)
    }

    fn is_charging(&self) -> bool {
        self.charging.load(Ordering::SeqCst)
    }

    fn battery_percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    fn is_battery_low(&self) -> bool {
        self.low.load(Ordering::SeqCst)
    }
}

/// Local filesystem reporting a configurable amount of free space.
pub struct TestFs {
    inner: LocalFileSystem,
    pub available: AtomicU64,
}

impl FileSystem for TestFs {
    fn read(&self, path: &Path) -> FsOpsResult<Vec<u8>> {
        self.inner.read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> FsOpsResult<()> {
        self.inner.write(path, bytes)
    }

    fn create_file(&self, dir: &Path, name: &str, replace: bool) -> FsOpsResult<PathBuf> {
        self.inner.create_file(dir, name, replace)
    }

    fn available_bytes(&self, _path: &Path) -> FsOpsResult<u64> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    fn is_restricted(&self, path: &Path) -> bool {
        self.inner.is_restricted(path)
    }

    fn clean_temp_dir(&self) -> FsOpsResult<()> {
        self.inner.clean_temp_dir()
    }
}

pub struct Harness {
    pub scratch: TempDir,
    pub session: Arc<FakeSession>,
    pub config: Arc<MemoryConfigStore>,
    pub repository: Arc<MemoryRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub fs: Arc<TestFs>,
    pub device: Arc<FakeDevice>,
    pub streaming: Arc<RecordingStreaming>,
    pub host: Arc<CountingHost>,
    pub engine: Arc<EngineCoordinator>,
}

/// Preferences with deterministic ports and storage under `scratch`.
pub fn base_preferences(scratch: &Path) -> Preferences {
    let mut prefs = Preferences::default();
    prefs.network.use_random_port = false;
    prefs.storage.save_torrents_in = scratch.join("downloads");
    prefs
}

impl Harness {
    /// Coordinator over a stopped session with default test preferences.
    pub fn new() -> Result<Self> {
        Self::with_preferences(|_, _| {})
    }

    /// Coordinator over a stopped session; `tune` adjusts the preferences.
    pub fn with_preferences<F>(tune: F) -> Result<Self>
    where
        F: FnOnce(&mut Preferences, &Path),
    {
        let _ = init_logging(&LoggingConfig {
            level: "riptide_engine=debug",
            format: LogFormat::Pretty,
            build_sha: "test",
        });
        let scratch = tempfile::tempdir()?;
        let mut prefs = base_preferences(scratch.path());
        tune(&mut prefs, scratch.path());

        let repository = Arc::new(MemoryRepository::new());
        let session = Arc::new(FakeSession::new().with_repository(Arc::clone(&repository)));
        let config = Arc::new(MemoryConfigStore::new(prefs));
        let notifier = Arc::new(RecordingNotifier::default());
        let fs = Arc::new(TestFs {
            inner: LocalFileSystem::new(scratch.path().join("tmp")),
            available: AtomicU64::new(u64::MAX),
        });
        let device = Arc::new(FakeDevice::default());
        let streaming = Arc::new(RecordingStreaming::default());
        let host = Arc::new(CountingHost::default());

        let engine = EngineCoordinator::new(EngineDeps {
            session: session.clone(),
            config: config.clone(),
            repository: repository.clone(),
            notifier: notifier.clone(),
            fs: fs.clone(),
            device: device.clone(),
            streaming: streaming.clone(),
            host: host.clone(),
            metrics: Metrics::new()?,
        })?;

        Ok(Self {
            scratch,
            session,
            config,
            repository,
            notifier,
            fs,
            device,
            streaming,
            host,
            engine,
        })
    }

    /// Fresh dependency set sharing this harness's fakes.
    pub fn deps(&self) -> Result<EngineDeps> {
        Ok(EngineDeps {
            session: self.session.clone(),
            config: self.config.clone(),
            repository: self.repository.clone(),
            notifier: self.notifier.clone(),
            fs: self.fs.clone(),
            device: self.device.clone(),
            streaming: self.streaming.clone(),
            host: self.host.clone(),
            metrics: Metrics::new()?,
        })
    }

    /// Start the session and wait for first-run initialization.
    pub async fn start(&self) -> Result<()> {
        self.engine.start()?;
        eventually("engine running", || {
            self.engine.state() == EngineState::Running
        })
        .await?;
        self.settle().await;
        Ok(())
    }

    /// Wait for queued units, including ones queued by settings changes.
    pub async fn settle(&self) {
        self.engine.executor().wait_idle().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.engine.executor().wait_idle().await;
    }

    pub fn calls_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&SessionCall) -> bool,
    {
        self.session
            .calls()
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notifier.notices()
    }

    pub fn host_starts(&self) -> usize {
        self.host.started.load(Ordering::SeqCst)
    }
}

/// Admission params for `fixture` downloading under `dir`.
pub fn params_for(fixture: &TorrentFixture, dir: &Path) -> Result<AddTorrentParams> {
    Ok(AddTorrentParams {
        source: TorrentSource::File {
            path: dir.join(format!("{}.torrent", fixture.name())),
        },
        info_hash: fixture.info_hash()?,
        name: fixture.name().to_string(),
        file_priorities: vec![Priority::Default; fixture.file_count()],
        download_path: dir.to_path_buf(),
        sequential: false,
        add_paused: false,
    })
}

/// Repository entity for `fixture`.
pub fn stored(fixture: &TorrentFixture, dir: &Path) -> Result<Torrent> {
    Ok(Torrent {
        id: fixture.info_hash()?,
        name: fixture.name().to_string(),
        download_path: dir.to_path_buf(),
        date_added: Utc::now(),
        error: None,
    })
}
