//! Preference storage and change notifications.
//!
//! # Design
//! - Writers validate the candidate document before it replaces the stored one.
//! - Every accepted write publishes the written key's token on a broadcast channel.
//! - Slow subscribers observe [`SettingsChange::Lagged`] instead of silently missing keys.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::defaults::CHANGE_CHANNEL_CAPACITY;
use crate::error::{ConfigError, ConfigResult};
use crate::keys::SettingKey;
use crate::model::Preferences;
use crate::validate::validate_preferences;

/// Source of truth for engine preferences.
pub trait ConfigStore: Send + Sync {
    /// Copy of the current preference document.
    fn snapshot(&self) -> Preferences;

    /// Mutate the document and publish `key` once the result validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the mutated document is
    /// rejected; the stored document is left untouched.
    fn update(&self, key: SettingKey, apply: &dyn Fn(&mut Preferences)) -> ConfigResult<()>;

    /// Subscribe to change-key tokens published after this call.
    fn subscribe(&self) -> SettingsStream;

    /// Publish a token without writing anything.
    fn notify_changed(&self, token: &str);
}

/// Item produced by a [`SettingsStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    /// A single key was written.
    Key(String),
    /// The subscriber fell behind and some tokens were dropped.
    Lagged,
}

/// Receiving half of the change-key channel.
pub struct SettingsStream {
    receiver: broadcast::Receiver<String>,
}

impl SettingsStream {
    /// Wait for the next change, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<SettingsChange> {
        match self.receiver.recv().await {
            Ok(token) => Some(SettingsChange::Key(token)),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "settings subscriber lagged; resync required");
                Some(SettingsChange::Lagged)
            }
            Err(RecvError::Closed) => None,
        }
    }
}

struct StoreInner {
    prefs: Mutex<Preferences>,
    changes: broadcast::Sender<String>,
}

/// In-process [`ConfigStore`] holding the document behind a mutex.
#[derive(Clone)]
pub struct MemoryConfigStore {
    inner: Arc<StoreInner>,
}

impl MemoryConfigStore {
    /// Wrap an initial document. The document is not validated.
    #[must_use]
    pub fn new(prefs: Preferences) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                prefs: Mutex::new(prefs),
                changes,
            }),
        }
    }

    /// Load and validate a JSON preference document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not a valid document, or the
    /// validation error for the first rejected field.
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| ConfigError::Io {
                operation: "config.load",
                path: path.to_path_buf(),
                source,
            })?;
        let prefs: Preferences =
            serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        validate_preferences(&prefs)?;
        debug!(path = %path.display(), "loaded preferences");
        Ok(Self::new(prefs))
    }

    fn lock(&self) -> MutexGuard<'_, Preferences> {
        self.inner
            .prefs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn snapshot(&self) -> Preferences {
        self.lock().clone()
    }

    fn update(&self, key: SettingKey, apply: &dyn Fn(&mut Preferences)) -> ConfigResult<()> {
        {
            let mut guard = self.lock();
            let mut candidate = guard.clone();
            apply(&mut candidate);
            if candidate == *guard {
                return Ok(());
            }
            validate_preferences(&candidate)?;
            *guard = candidate;
        }
        self.notify_changed(key.as_str());
        Ok(())
    }

    fn subscribe(&self) -> SettingsStream {
        SettingsStream {
            receiver: self.inner.changes.subscribe(),
        }
    }

    fn notify_changed(&self, token: &str) {
        // No receivers is not an error; the write is already stored.
        let _ = self.inner.changes.send(token.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_publishes_key_after_storing() -> anyhow::Result<()> {
        let store = MemoryConfigStore::default();
        let mut stream = store.subscribe();

        store.update(SettingKey::MaxDownloadSpeed, &|prefs| {
            prefs.limits.max_download_speed = 1_024;
        })?;

        assert_eq!(
            stream.next().await,
            Some(SettingsChange::Key("max_download_speed".into()))
        );
        assert_eq!(store.snapshot().limits.max_download_speed, 1_024);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_update_keeps_document_and_stays_silent() -> anyhow::Result<()> {
        let store = MemoryConfigStore::default();
        let mut stream = store.subscribe();

        let result = store.update(SettingKey::CustomBatteryControlValue, &|prefs| {
            prefs.policy.custom_battery_control_value = 150;
        });
        assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
        assert_eq!(store.snapshot(), Preferences::default());

        store.notify_changed("watch_dir");
        assert_eq!(
            stream.next().await,
            Some(SettingsChange::Key("watch_dir".into()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn unchanged_write_is_not_published() -> anyhow::Result<()> {
        let store = MemoryConfigStore::default();
        let mut stream = store.subscribe();

        store.update(SettingKey::EnableDht, &|prefs| prefs.network.enable_dht = true)?;
        store.notify_changed("sentinel");

        assert_eq!(
            stream.next().await,
            Some(SettingsChange::Key("sentinel".into()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_to_resync() -> anyhow::Result<()> {
        let store = MemoryConfigStore::default();
        let mut stream = store.subscribe();
        for _ in 0..=CHANGE_CHANNEL_CAPACITY {
            store.notify_changed("enable_dht");
        }
        assert_eq!(stream.next().await, Some(SettingsChange::Lagged));
        Ok(())
    }
}
