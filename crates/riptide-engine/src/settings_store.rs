//! Single mutation entry point for the session settings snapshot.
//!
//! The session only accepts whole snapshots. Every change here is fetch,
//! mutate, push under one mutex, so two writers in this process cannot lose
//! each other's field.

use std::sync::{Arc, Mutex, PoisonError};

use riptide_torrent_core::{Session, SessionSettings};

/// Serialized read-modify-write access to [`SessionSettings`].
pub struct SessionSettingsStore {
    session: Arc<dyn Session>,
    pushes: Mutex<u64>,
}

impl SessionSettingsStore {
    /// Store writing through to `session`.
    #[must_use]
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            pushes: Mutex::new(0),
        }
    }

    /// Current snapshot as reported by the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSettings {
        self.session.settings()
    }

    /// Fetch the snapshot, apply `mutate` and push the result.
    pub fn apply<F>(&self, mutate: F)
    where
        F: FnOnce(SessionSettings) -> SessionSettings,
    {
        let mut pushes = self.pushes.lock().unwrap_or_else(PoisonError::into_inner);
        let next = mutate(self.session.settings());
        self.session.set_settings(&next);
        *pushes += 1;
    }

    /// Number of snapshots pushed so far.
    #[must_use]
    pub fn pushes(&self) -> u64 {
        *self.pushes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_test_support::{FakeSession, SessionCall};
    use std::thread;

    #[test]
    fn concurrent_writers_keep_both_fields() {
        let session = Arc::new(FakeSession::new());
        let store = Arc::new(SessionSettingsStore::new(
            Arc::clone(&session) as Arc<dyn Session>
        ));

        let handles: Vec<_> = (0..8_u64)
            .map(|index| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.apply(|mut settings| {
                        if index % 2 == 0 {
                            settings.download_rate_limit += 1;
                        } else {
                            settings.upload_rate_limit += 1;
                        }
                        settings
                    });
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let settings = store.snapshot();
        assert_eq!(settings.download_rate_limit, 4);
        assert_eq!(settings.upload_rate_limit, 4);
        assert_eq!(store.pushes(), 8);
        assert_eq!(
            session
                .calls()
                .iter()
                .filter(|call| **call == SessionCall::SetSettings)
                .count(),
            8
        );
    }
}
