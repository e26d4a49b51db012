//! Storage access used by the engine.
//!
//! # Design
//! - A narrow trait so the engine can run against scratch directories in tests.
//! - Free space comes from `statvfs`, counting only blocks available to unprivileged users.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use nix::sys::statvfs::statvfs;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

/// Filesystem operations the engine depends on.
pub trait FileSystem: Send + Sync {
    /// Read a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] when the file cannot be read.
    fn read(&self, path: &Path) -> FsOpsResult<Vec<u8>>;

    /// Write `bytes` to `path`, truncating any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] when the file cannot be written.
    fn write(&self, path: &Path, bytes: &[u8]) -> FsOpsResult<()>;

    /// Create `name` inside `dir`, creating `dir` when missing.
    ///
    /// An existing file is reused when `replace` is set and refused otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Restricted`] for restricted directories and
    /// [`FsOpsError::Io`] when creation fails.
    fn create_file(&self, dir: &Path, name: &str, replace: bool) -> FsOpsResult<PathBuf>;

    /// Bytes available to the process on the filesystem holding `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Nix`] when the filesystem cannot be queried.
    fn available_bytes(&self, path: &Path) -> FsOpsResult<u64>;

    /// Whether `path` lies under a root the process may not use for storage.
    fn is_restricted(&self, path: &Path) -> bool;

    /// Remove everything inside the scratch directory.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] when the directory cannot be listed.
    fn clean_temp_dir(&self) -> FsOpsResult<()>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    temp_dir: PathBuf,
    restricted_roots: Vec<PathBuf>,
}

impl LocalFileSystem {
    /// Use `temp_dir` as scratch space with no restricted roots.
    #[must_use]
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            restricted_roots: Vec::new(),
        }
    }

    /// Refuse storage under `root`.
    #[must_use]
    pub fn with_restricted_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.restricted_roots.push(root.into());
        self
    }

    /// Scratch directory cleaned on shutdown.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

impl FileSystem for LocalFileSystem {
    fn read(&self, path: &Path) -> FsOpsResult<Vec<u8>> {
        fs::read(path).map_err(|source| FsOpsError::io("fs.read", path, source))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> FsOpsResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| FsOpsError::io("fs.write.open", path, source))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|source| FsOpsError::io("fs.write", path, source))
    }

    fn create_file(&self, dir: &Path, name: &str, replace: bool) -> FsOpsResult<PathBuf> {
        if self.is_restricted(dir) {
            return Err(FsOpsError::Restricted {
                path: dir.to_path_buf(),
            });
        }
        fs::create_dir_all(dir).map_err(|source| FsOpsError::io("fs.create_dir", dir, source))?;

        let path = dir.join(name);
        let mut options = OpenOptions::new();
        options.write(true);
        if replace {
            options.create(true).truncate(false);
        } else {
            options.create_new(true);
        }
        options
            .open(&path)
            .map_err(|source| FsOpsError::io("fs.create_file", &path, source))?;
        debug!(path = %path.display(), "created file");
        Ok(path)
    }

    #[allow(clippy::useless_conversion)]
    fn available_bytes(&self, path: &Path) -> FsOpsResult<u64> {
        let stat = statvfs(path).map_err(|source| FsOpsError::Nix {
            operation: "fs.statvfs",
            path: path.to_path_buf(),
            source,
        })?;
        Ok(u64::from(stat.blocks_available()).saturating_mul(u64::from(stat.fragment_size())))
    }

    fn is_restricted(&self, path: &Path) -> bool {
        let candidate = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.restricted_roots.iter().any(|root| {
            path.starts_with(root)
                || fs::canonicalize(root).is_ok_and(|resolved| candidate.starts_with(resolved))
        })
    }

    fn clean_temp_dir(&self) -> FsOpsResult<()> {
        let entries = match fs::read_dir(&self.temp_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(FsOpsError::io("fs.clean_temp.list", &self.temp_dir, source)),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(err) = result {
                warn!(error = %err, path = %path.display(), "failed to remove temp entry");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_file_respects_replace_flag() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let storage = LocalFileSystem::new(temp.path().join("tmp"));
        let dir = temp.path().join("torrents");

        let path = storage.create_file(&dir, "ubuntu.torrent", false)?;
        storage.write(&path, b"d4:infod4:name3:abcee")?;
        assert_eq!(storage.read(&path)?, b"d4:infod4:name3:abcee");

        assert!(matches!(
            storage.create_file(&dir, "ubuntu.torrent", false),
            Err(FsOpsError::Io { .. })
        ));
        assert_eq!(storage.create_file(&dir, "ubuntu.torrent", true)?, path);
        Ok(())
    }

    #[test]
    fn restricted_roots_are_refused() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let locked = temp.path().join("locked");
        fs::create_dir_all(&locked)?;
        let storage = LocalFileSystem::new(temp.path().join("tmp")).with_restricted_root(&locked);

        assert!(storage.is_restricted(&locked.join("nested")));
        assert!(!storage.is_restricted(temp.path()));
        assert!(matches!(
            storage.create_file(&locked, "a.torrent", true),
            Err(FsOpsError::Restricted { .. })
        ));
        Ok(())
    }

    #[test]
    fn available_bytes_reports_space_and_missing_paths() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let storage = LocalFileSystem::new(temp.path());
        assert!(storage.available_bytes(temp.path())? > 0);

        let missing = storage.available_bytes(&temp.path().join("missing"));
        assert!(matches!(missing, Err(ref err) if err.is_not_found()));
        Ok(())
    }

    #[test]
    fn clean_temp_dir_empties_scratch_space() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(scratch.join("nested"))?;
        fs::write(scratch.join("part.bin"), b"partial")?;
        let storage = LocalFileSystem::new(&scratch);

        storage.clean_temp_dir()?;
        assert_eq!(fs::read_dir(&scratch)?.count(), 0);

        LocalFileSystem::new(temp.path().join("absent")).clean_temp_dir()?;
        Ok(())
    }
}
