//! Directory watch feeding `.torrent` files to the engine.
//!
//! # Design
//! - Files already present are reported by a synchronous, non-recursive scan.
//! - New files arrive through a debounced `notify` watch on the same directory.
//! - The scan and the watch may both report one file; consumers tolerate duplicates.
//! - Dropping the watcher stops delivery; work already handed to the sink continues.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Default debounce window for watch events.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Suffix of files the watcher reports.
pub const TORRENT_EXTENSION: &str = "torrent";

/// Callback receiving each discovered torrent file.
pub type TorrentSink = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Active watch over one directory.
pub struct DirectoryWatcher {
    dir: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl DirectoryWatcher {
    /// Scan `dir` and keep watching it with the default debounce window.
    ///
    /// # Errors
    ///
    /// Returns an error when `dir` cannot be scanned or watched.
    pub fn start(dir: &Path, sink: TorrentSink) -> FsOpsResult<Self> {
        Self::start_with_debounce(dir, Duration::from_millis(DEFAULT_DEBOUNCE_MS), sink)
    }

    /// Scan `dir` and keep watching it, coalescing events within `debounce`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Walkdir`] when the initial scan fails and
    /// [`FsOpsError::Watch`] when the watch cannot be registered.
    pub fn start_with_debounce(
        dir: &Path,
        debounce: Duration,
        sink: TorrentSink,
    ) -> FsOpsResult<Self> {
        let found = scan(dir)?;
        debug!(dir = %dir.display(), count = found.len(), "initial torrent scan");
        for path in found {
            sink(path);
        }

        let watched = dir.to_path_buf();
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let mut seen = HashSet::new();
                    for event in events {
                        if !is_arrival(event.kind) {
                            continue;
                        }
                        for path in &event.paths {
                            if is_torrent_file(path)
                                && path.is_file()
                                && seen.insert(path.clone())
                            {
                                sink(path.clone());
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!(error = %error, dir = %watched.display(), "directory watch error");
                    }
                }
            }
        })
        .map_err(|source| FsOpsError::watch("watch.create", dir, source))?;
        debouncer
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| FsOpsError::watch("watch.register", dir, source))?;

        info!(dir = %dir.display(), "watching directory for torrent files");
        Ok(Self {
            dir: dir.to_path_buf(),
            _debouncer: debouncer,
        })
    }

    /// Directory being watched.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stop watching.
    pub fn stop(self) {
        info!(dir = %self.dir.display(), "stopped watching directory");
    }
}

/// `.torrent` files directly inside `dir`.
///
/// # Errors
///
/// Returns [`FsOpsError::Walkdir`] when `dir` cannot be listed.
pub fn scan(dir: &Path) -> FsOpsResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| FsOpsError::walkdir("watch.scan", dir, source))?;
        if entry.file_type().is_file() && is_torrent_file(entry.path()) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

fn is_torrent_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TORRENT_EXTENSION))
}

const fn is_arrival(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RenameMode};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_is_flat_and_filters_by_suffix() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("b.torrent"), b"x")?;
        fs::write(temp.path().join("a.TORRENT"), b"x")?;
        fs::write(temp.path().join("notes.txt"), b"x")?;
        fs::create_dir_all(temp.path().join("nested"))?;
        fs::write(temp.path().join("nested").join("c.torrent"), b"x")?;

        let found = scan(temp.path())?;
        assert_eq!(
            found,
            vec![temp.path().join("a.TORRENT"), temp.path().join("b.torrent")]
        );
        Ok(())
    }

    #[test]
    fn scan_of_missing_directory_fails() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        assert!(matches!(
            scan(&temp.path().join("missing")),
            Err(FsOpsError::Walkdir { .. })
        ));
        Ok(())
    }

    #[test]
    fn arrival_kinds_cover_create_rename_and_close_write() {
        assert!(is_arrival(EventKind::Create(CreateKind::File)));
        assert!(is_arrival(EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(is_arrival(EventKind::Access(AccessKind::Close(
            AccessMode::Write
        ))));
        assert!(!is_arrival(EventKind::Access(AccessKind::Open(
            AccessMode::Any
        ))));
        assert!(!is_arrival(EventKind::Remove(notify::event::RemoveKind::File)));
    }
}
