//! Coordinator reactions to session events.
//!
//! The listener runs on the dispatching thread and only hands the event to
//! the executor; all session and storage work happens in the submitted unit.

use std::sync::Weak;

use riptide_events::{EngineEvent, EngineListener, MetadataFailureKind};
use riptide_torrent_core::{ChangeableParams, TorrentId, TorrentResult};
use tracing::{debug, info, warn};

use crate::collaborators::Notice;
use crate::coordinator::EngineCoordinator;
use crate::error::{EngineError, EngineResult};

/// Session listener owned by the coordinator.
pub(crate) struct CoordinatorListener {
    engine: Weak<EngineCoordinator>,
}

impl CoordinatorListener {
    pub(crate) const fn new(engine: Weak<EngineCoordinator>) -> Self {
        Self { engine }
    }
}

impl EngineListener for CoordinatorListener {
    fn on_event(&self, event: &EngineEvent) -> anyhow::Result<()> {
        let Some(engine) = self.engine.upgrade() else {
            return Ok(());
        };
        engine.metrics.record_dispatch(event.kind(), 0);
        let event = event.clone();
        engine.submit(event.kind(), move |engine| engine.react(&event));
        Ok(())
    }
}

impl EngineCoordinator {
    fn react(&self, event: &EngineEvent) -> anyhow::Result<()> {
        match event {
            EngineEvent::SessionStarted => self.initialize_session(),
            EngineEvent::TorrentAdded { torrent_id } => {
                self.keep_torrent_file(torrent_id);
                self.pause_for_policy(torrent_id);
            }
            EngineEvent::TorrentLoaded { torrent_id } => self.pause_for_policy(torrent_id),
            EngineEvent::TorrentMetadataLoaded { torrent_id, error } => {
                match error {
                    Some(failure) if failure.kind == MetadataFailureKind::FreeSpace => {
                        warn!(torrent_id = %torrent_id, "not enough space for torrent payload");
                        self.notifier.notify(Notice::FreeSpace {
                            torrent_id: torrent_id.clone(),
                            name: self.display_name(torrent_id),
                        });
                    }
                    Some(failure) => {
                        warn!(
                            torrent_id = %torrent_id,
                            kind = ?failure.kind,
                            error = %failure.message,
                            "torrent metadata failed to load"
                        );
                    }
                    None => self.keep_torrent_file(torrent_id),
                }
                self.pause_for_policy(torrent_id);
            }
            EngineEvent::MagnetLoaded { .. } => {}
            EngineEvent::TorrentFinished { torrent_id } => {
                info!(torrent_id = %torrent_id, "torrent finished");
                if let Some(torrent) = self.repository.torrent_by_id(torrent_id) {
                    self.notifier.notify(Notice::Finished {
                        torrent_id: torrent_id.clone(),
                        name: torrent.name,
                    });
                } else {
                    debug!(torrent_id = %torrent_id, "finished torrent not stored; no notice");
                }
                self.move_finished(torrent_id)?;
            }
            EngineEvent::TorrentMoving { torrent_id } => {
                self.notifier.notify(Notice::Moving {
                    torrent_id: torrent_id.clone(),
                    name: self.display_name(torrent_id),
                });
            }
            EngineEvent::TorrentMoved {
                torrent_id,
                success,
            } => {
                self.notifier.notify(Notice::Moved {
                    torrent_id: torrent_id.clone(),
                    name: self.display_name(torrent_id),
                    success: *success,
                });
            }
            EngineEvent::IpFilterParsed { success } => {
                self.notifier
                    .notify(Notice::IpFilterParsed { success: *success });
            }
            EngineEvent::SessionError { message } => {
                warn!(error = %message, "session error");
                self.notifier.notify(Notice::SessionError {
                    message: message.clone(),
                });
            }
            EngineEvent::NatError { message } => {
                debug!(error = %message, "port mapping error");
                if self.config.snapshot().network.show_nat_errors {
                    self.notifier.notify(Notice::NatError {
                        message: message.clone(),
                    });
                }
            }
            EngineEvent::RestoreSessionError { torrent_id } => {
                warn!(torrent_id = %torrent_id, "torrent could not be restored");
                self.notifier.notify(Notice::RestoreFailed {
                    torrent_id: torrent_id.clone(),
                    name: self.display_name(torrent_id),
                });
            }
        }
        Ok(())
    }

    /// Repository name of `id`, or the id itself when unknown.
    pub(crate) fn display_name(&self, id: &TorrentId) -> String {
        self.repository
            .torrent_by_id(id)
            .map_or_else(|| id.to_string(), |torrent| torrent.name)
    }

    fn keep_torrent_file(&self, id: &TorrentId) {
        if let Err(err) = self.save_torrent_file(id) {
            warn!(torrent_id = %id, error = ?err, "saving torrent file failed");
        }
    }

    /// Copy the bencoded metadata of `id` into the configured directory.
    fn save_torrent_file(&self, id: &TorrentId) -> EngineResult<()> {
        let storage = self.config.snapshot().storage;
        if !storage.save_torrent_files {
            return Ok(());
        }
        let Some(dir) = storage.save_torrent_files_in else {
            debug!(torrent_id = %id, "no directory configured for torrent files");
            return Ok(());
        };
        let Some(bytes) = self.session.task(id).and_then(|task| task.bencode()) else {
            debug!(torrent_id = %id, "metadata not available yet");
            return Ok(());
        };

        let file_name = format!("{}.torrent", self.display_name(id).replace(['/', '\\'], "_"));
        let path = self
            .fs
            .create_file(&dir, &file_name, true)
            .map_err(|source| EngineError::fsops("save_torrent_file", source))?;
        self.fs
            .write(&path, &bytes)
            .map_err(|source| EngineError::fsops("save_torrent_file", source))?;
        info!(torrent_id = %id, path = %path.display(), "saved torrent file");
        Ok(())
    }

    /// Move a finished payload when move-after-download is configured.
    fn move_finished(&self, id: &TorrentId) -> TorrentResult<()> {
        let storage = self.config.snapshot().storage;
        if !storage.move_after_download {
            return Ok(());
        }
        let Some(destination) = storage.move_after_download_in else {
            return Ok(());
        };
        let Some(task) = self.session.task(id) else {
            return Ok(());
        };
        let current = self
            .repository
            .torrent_by_id(id)
            .map(|torrent| torrent.download_path);
        if current.as_deref() == Some(destination.as_path()) {
            return Ok(());
        }
        info!(torrent_id = %id, destination = %destination.display(), "moving finished torrent");
        task.apply_params(&ChangeableParams::move_to(destination))
    }
}
