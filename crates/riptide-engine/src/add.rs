//! Add-torrent pipeline.
//!
//! # Design
//! - Every entry point wakes the service host first.
//! - Asynchronous paths drop requests while the session is stopped; the
//!   synchronous path reports [`TorrentError::EngineStopped`] instead.
//! - Duplicates raise one informational notice and are not failures.

use std::io;
use std::path::{Path, PathBuf};

use riptide_config::Preferences;
use riptide_fsops::{FileSystem, FsOpsError};
use riptide_torrent_core::{
    AddTorrentParams, Priority, Torrent, TorrentError, TorrentMetaInfo, TorrentResult,
    TorrentSource,
};
use tracing::{debug, info, warn};

use crate::collaborators::{AddFailure, Notice};
use crate::coordinator::EngineCoordinator;

/// Build admission params for the `.torrent` file at `path`.
///
/// Every file gets [`Priority::Default`] and the payload goes to the
/// configured download directory, which must have room for it.
///
/// # Errors
///
/// Returns [`TorrentError::NotFound`] or [`TorrentError::Io`] when the file
/// cannot be read, [`TorrentError::Decode`] for malformed metadata and
/// [`TorrentError::FreeSpace`] when the payload does not fit.
pub fn params_from_file(
    fs: &dyn FileSystem,
    prefs: &Preferences,
    path: &Path,
) -> TorrentResult<AddTorrentParams> {
    let meta = read_metainfo(fs, path)?;
    params_for_metainfo(fs, prefs, path, meta)
}

fn read_metainfo(fs: &dyn FileSystem, path: &Path) -> TorrentResult<TorrentMetaInfo> {
    let bytes = fs
        .read(path)
        .map_err(|err| storage_error("read_torrent_file", path, err))?;
    Ok(TorrentMetaInfo::from_bytes(&bytes)?)
}

fn params_for_metainfo(
    fs: &dyn FileSystem,
    prefs: &Preferences,
    path: &Path,
    meta: TorrentMetaInfo,
) -> TorrentResult<AddTorrentParams> {
    let download_path = prefs.storage.save_torrents_in.clone();
    let available = fs
        .available_bytes(&download_path)
        .map_err(|err| storage_error("check_free_space", &download_path, err))?;
    if available < meta.total_size {
        return Err(TorrentError::FreeSpace {
            path: download_path,
            required: meta.total_size,
            available,
        });
    }

    Ok(AddTorrentParams {
        source: TorrentSource::File {
            path: path.to_path_buf(),
        },
        file_priorities: vec![Priority::Default; meta.file_count()],
        info_hash: meta.info_hash,
        name: meta.name,
        download_path,
        sequential: false,
        add_paused: false,
    })
}

fn storage_error(operation: &'static str, path: &Path, err: FsOpsError) -> TorrentError {
    if err.is_not_found() {
        TorrentError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        TorrentError::io(operation, Some(path.to_path_buf()), io::Error::other(err))
    }
}

impl EngineCoordinator {
    /// Add one torrent in the background.
    pub fn add_torrent(&self, params: AddTorrentParams, remove_source: bool) {
        self.host.ensure_started();
        self.submit("add_torrent", move |engine| {
            engine.admit(params, remove_source)
        });
    }

    /// Add several torrents in the background; one failure does not stop the
    /// rest.
    pub fn add_torrents(&self, batch: Vec<AddTorrentParams>, remove_source: bool) {
        self.host.ensure_started();
        self.submit("add_torrents", move |engine| {
            let total = batch.len();
            let failed = batch
                .into_iter()
                .filter_map(|params| engine.admit(params, remove_source).err())
                .count();
            if failed > 0 {
                anyhow::bail!("{failed} of {total} torrents failed to add");
            }
            Ok(())
        });
    }

    /// Decode the `.torrent` file at `path` and add it in the background.
    pub fn add_torrent_file(&self, path: PathBuf, remove_source: bool) {
        self.host.ensure_started();
        self.submit("add_torrent_file", move |engine| {
            if !engine.session.is_running() {
                debug!(path = %path.display(), "session not running; dropping add request");
                engine.metrics.inc_torrent_added("skipped");
                return Ok(());
            }
            let meta = match read_metainfo(engine.fs.as_ref(), &path) {
                Ok(meta) => meta,
                Err(err) => {
                    engine.report_add_failure(&path.display().to_string(), &err);
                    return Err(err.into());
                }
            };
            let name = meta.name.clone();
            let prefs = engine.config.snapshot();
            let params = match params_for_metainfo(engine.fs.as_ref(), &prefs, &path, meta) {
                Ok(params) => params,
                Err(err) => {
                    engine.report_add_failure(&name, &err);
                    return Err(err.into());
                }
            };
            engine.admit(params, remove_source)
        });
    }

    /// Add one torrent on the caller's thread.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::EngineStopped`] when the session is not running
    /// and the session error otherwise.
    pub fn add_torrent_sync(
        &self,
        params: AddTorrentParams,
        remove_source: bool,
    ) -> TorrentResult<Torrent> {
        self.host.ensure_started();
        if !self.session.is_running() {
            return Err(TorrentError::EngineStopped {
                operation: "add_torrent_sync",
            });
        }
        let torrent = self.session.add_torrent(params, remove_source)?;
        self.metrics.inc_torrent_added("added");
        Ok(torrent)
    }

    fn admit(&self, params: AddTorrentParams, remove_source: bool) -> anyhow::Result<()> {
        if !self.session.is_running() {
            debug!(torrent_id = %params.info_hash, "session not running; dropping add request");
            self.metrics.inc_torrent_added("skipped");
            return Ok(());
        }

        let name = params.name.clone();
        match self.session.add_torrent(params, remove_source) {
            Ok(torrent) => {
                info!(torrent_id = %torrent.id, name = %torrent.name, "torrent added");
                self.metrics.inc_torrent_added("added");
                Ok(())
            }
            Err(err) => {
                let duplicate = AddFailure::classify(err.kind()).is_none();
                self.report_add_failure(&name, &err);
                if duplicate { Ok(()) } else { Err(err.into()) }
            }
        }
    }

    fn report_add_failure(&self, name: &str, err: &TorrentError) {
        match AddFailure::classify(err.kind()) {
            None => {
                info!(name, "torrent already added");
                self.metrics.inc_torrent_added("exists");
                self.notifier.notify(Notice::TorrentExists {
                    name: name.to_string(),
                });
            }
            Some(reason) => {
                warn!(name, ?reason, error = %err, "adding torrent failed");
                self.metrics.inc_torrent_added("failed");
                self.notifier.notify(Notice::AddFailed {
                    name: name.to_string(),
                    reason,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_fsops::{FsOpsResult, LocalFileSystem};
    use riptide_test_support::TorrentFixture;

    struct FixedSpace {
        inner: LocalFileSystem,
        available: u64,
    }

    impl FileSystem for FixedSpace {
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
            Ok(self.available)
        }

        fn is_restricted(&self, path: &Path) -> bool {
            self.inner.is_restricted(path)
        }

        fn clean_temp_dir(&self) -> FsOpsResult<()> {
            self.inner.clean_temp_dir()
        }
    }

    fn fs(scratch: &Path, available: u64) -> FixedSpace {
        FixedSpace {
            inner: LocalFileSystem::new(scratch.join("tmp")),
            available,
        }
    }

    #[test]
    fn params_carry_default_priorities_and_download_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let fixture = TorrentFixture::multi("album", &[("a.flac", 300), ("b.flac", 200)]);
        let path = fixture.write_to(dir.path(), "album.torrent")?;
        let mut prefs = Preferences::default();
        prefs.storage.save_torrents_in = dir.path().join("downloads");

        let params = params_from_file(&fs(dir.path(), 10_000), &prefs, &path)?;
        assert_eq!(params.info_hash, fixture.info_hash()?);
        assert_eq!(params.name, "album");
        assert_eq!(params.file_priorities, vec![Priority::Default; 2]);
        assert_eq!(params.download_path, dir.path().join("downloads"));
        assert!(!params.from_magnet());
        Ok(())
    }

    #[test]
    fn payload_larger_than_free_space_is_refused() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = TorrentFixture::single("big.iso", 5_000).write_to(dir.path(), "big.torrent")?;

        let err = params_from_file(&fs(dir.path(), 4_999), &Preferences::default(), &path)
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected a free space error"))?;
        assert!(matches!(
            err,
            TorrentError::FreeSpace {
                required: 5_000,
                available: 4_999,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn missing_and_malformed_files_are_classified() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let filesystem = fs(dir.path(), u64::MAX);
        let prefs = Preferences::default();

        let missing = params_from_file(&filesystem, &prefs, &dir.path().join("gone.torrent"));
        assert!(matches!(missing, Err(TorrentError::NotFound { .. })));

        let garbage = dir.path().join("garbage.torrent");
        std::fs::write(&garbage, b"definitely not bencode")?;
        let malformed = params_from_file(&filesystem, &prefs, &garbage);
        assert!(matches!(malformed, Err(TorrentError::Decode { .. })));
        Ok(())
    }
}
