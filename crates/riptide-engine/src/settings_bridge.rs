//! Preference keys mapped onto session settings.
//!
//! # Design
//! - `action_for` is one exhaustive table: every key maps to exactly one
//!   [`SettingAction`].
//! - Settings mutations are pure functions of the current snapshot and the
//!   preferences. They go through [`SessionSettingsStore::apply`] only.
//! - The startup snapshot folds the same mutations over defaults, so the
//!   startup mapping and the live mapping share one table.

use std::sync::Arc;

use riptide_config::{ConfigStore, EncryptionPolicy, Preferences, ProxyKind, SettingKey};
use riptide_telemetry::Metrics;
use riptide_torrent_core::{EncryptMode, ProxySettings, ProxyType, SessionSettings};
use tracing::debug;

use crate::settings_store::SessionSettingsStore;

/// Pure update of one logical settings field.
pub type SettingsMutation = fn(SessionSettings, &Preferences) -> SessionSettings;

/// Work the coordinator performs for a key that is not a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Re-evaluate which device signals the policy listens to.
    PolicySubscriptions,
    /// Pick a random port range or fall back to the configured one.
    RandomPort,
    /// Rebind to the configured port range.
    PortRange,
    /// Enable or drop the IP filter.
    IpFilter,
    /// Push pending proxy preferences to the session.
    ApplyProxy,
    /// Stop the directory watch and start it again when enabled.
    WatchDir,
    /// Stop the streaming server and start it again when enabled.
    Streaming,
}

/// Handling for one preference key.
#[derive(Debug, Clone, Copy)]
pub enum SettingAction {
    /// Read lazily where it is used.
    Ignore,
    /// Coordinator side effect.
    Effect(SideEffect),
    /// Settings snapshot mutation.
    Apply(SettingsMutation),
}

/// The action taken for `key`.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn action_for(key: SettingKey) -> SettingAction {
    use SettingAction::{Apply, Effect, Ignore};

    match key {
        SettingKey::UnmeteredConnectionsOnly
        | SettingKey::EnableRoaming
        | SettingKey::DownloadOnlyWhenCharging
        | SettingKey::BatteryControl
        | SettingKey::CustomBatteryControl
        | SettingKey::CustomBatteryControlValue => Effect(SideEffect::PolicySubscriptions),
        SettingKey::MaxDownloadSpeed => Apply(|mut settings, prefs| {
            settings.download_rate_limit = prefs.limits.max_download_speed;
            settings
        }),
        SettingKey::MaxUploadSpeed => Apply(|mut settings, prefs| {
            settings.upload_rate_limit = prefs.limits.max_upload_speed;
            settings
        }),
        SettingKey::MaxConnections => Apply(|mut settings, prefs| {
            settings.connections_limit = prefs.limits.max_connections;
            settings.max_peer_list_size = prefs.limits.max_connections;
            settings
        }),
        SettingKey::MaxConnectionsPerTorrent => Apply(|mut settings, prefs| {
            settings.max_connections_per_torrent = prefs.limits.max_connections_per_torrent;
            settings
        }),
        SettingKey::MaxUploadsPerTorrent => Apply(|mut settings, prefs| {
            settings.max_uploads_per_torrent = prefs.limits.max_uploads_per_torrent;
            settings
        }),
        SettingKey::MaxActiveDownloads => Apply(|mut settings, prefs| {
            settings.active_downloads = prefs.limits.max_active_downloads;
            settings
        }),
        SettingKey::MaxActiveUploads => Apply(|mut settings, prefs| {
            settings.active_seeds = prefs.limits.max_active_uploads;
            settings
        }),
        SettingKey::MaxActiveTorrents => Apply(|mut settings, prefs| {
            settings.active_limit = prefs.limits.max_active_torrents;
            settings
        }),
        SettingKey::EnableDht => Apply(|mut settings, prefs| {
            settings.dht_enabled = prefs.network.enable_dht;
            settings
        }),
        SettingKey::EnableLsd => Apply(|mut settings, prefs| {
            settings.lsd_enabled = prefs.network.enable_lsd;
            settings
        }),
        SettingKey::EnableUtp => Apply(|mut settings, prefs| {
            settings.utp_enabled = prefs.network.enable_utp;
            settings
        }),
        SettingKey::EnableUpnp => Apply(|mut settings, prefs| {
            settings.upnp_enabled = prefs.network.enable_upnp;
            settings
        }),
        SettingKey::EnableNatPmp => Apply(|mut settings, prefs| {
            settings.natpmp_enabled = prefs.network.enable_natpmp;
            settings
        }),
        SettingKey::EncryptMode => Apply(|mut settings, prefs| {
            settings.encrypt_mode = encrypt_mode(prefs.network.encryption);
            settings
        }),
        SettingKey::EncryptInConnections => Apply(|mut settings, prefs| {
            let enabled = prefs.network.encrypt_in_connections;
            settings.encrypt_in_connections = enabled;
            settings.encrypt_mode = directional_mode(enabled, prefs);
            settings
        }),
        SettingKey::EncryptOutConnections => Apply(|mut settings, prefs| {
            let enabled = prefs.network.encrypt_out_connections;
            settings.encrypt_out_connections = enabled;
            settings.encrypt_mode = directional_mode(enabled, prefs);
            settings
        }),
        SettingKey::AutoManage => Apply(|mut settings, prefs| {
            settings.auto_managed = prefs.network.auto_manage;
            settings
        }),
        SettingKey::UseRandomPort => Effect(SideEffect::RandomPort),
        SettingKey::PortRangeFirst | SettingKey::PortRangeSecond => Effect(SideEffect::PortRange),
        SettingKey::EnableIpFiltering | SettingKey::IpFilteringFile => {
            Effect(SideEffect::IpFilter)
        }
        SettingKey::ApplyProxy => Effect(SideEffect::ApplyProxy),
        SettingKey::WatchDir | SettingKey::DirToWatch => Effect(SideEffect::WatchDir),
        SettingKey::EnableStreaming | SettingKey::StreamingHostname | SettingKey::StreamingPort => {
            Effect(SideEffect::Streaming)
        }
        // Proxy fields stay pending until `apply_proxy` is set.
        SettingKey::ProxyType
        | SettingKey::ProxyAddress
        | SettingKey::ProxyPort
        | SettingKey::ProxyPeers
        | SettingKey::ProxyRequiresAuth
        | SettingKey::ProxyLogin
        | SettingKey::ProxyPassword
        | SettingKey::ProxyChanged
        | SettingKey::ShowNatErrors
        | SettingKey::SaveTorrentsIn
        | SettingKey::SaveTorrentFiles
        | SettingKey::SaveTorrentFilesIn
        | SettingKey::MoveAfterDownload
        | SettingKey::MoveAfterDownloadIn => Ignore,
    }
}

/// Whether handling `key` is followed by one policy evaluation.
///
/// Custom battery keys are absent: the level subscription forces its own
/// evaluation when it starts.
#[must_use]
pub const fn requires_reschedule(key: SettingKey) -> bool {
    matches!(
        key,
        SettingKey::UnmeteredConnectionsOnly
            | SettingKey::EnableRoaming
            | SettingKey::DownloadOnlyWhenCharging
            | SettingKey::BatteryControl
    )
}

/// Fold every settings mutation over `base`.
#[must_use]
pub fn apply_all(base: SessionSettings, prefs: &Preferences) -> SessionSettings {
    let settings = SettingKey::ALL
        .iter()
        .fold(base, |settings, key| match action_for(*key) {
            SettingAction::Apply(mutation) => mutation(settings, prefs),
            SettingAction::Ignore | SettingAction::Effect(_) => settings,
        });
    with_proxy(settings, prefs)
}

/// Snapshot pushed when the session starts.
#[must_use]
pub fn initial_settings(prefs: &Preferences) -> SessionSettings {
    apply_all(SessionSettings::default(), prefs)
}

/// Copy proxy preferences into the snapshot.
#[must_use]
pub fn with_proxy(mut settings: SessionSettings, prefs: &Preferences) -> SessionSettings {
    let proxy = &prefs.proxy;
    settings.proxy = ProxySettings {
        kind: match proxy.kind {
            ProxyKind::None => ProxyType::None,
            ProxyKind::Socks4 => ProxyType::Socks4,
            ProxyKind::Socks5 => ProxyType::Socks5,
            ProxyKind::Http => ProxyType::Http,
        },
        address: proxy.address.clone(),
        port: proxy.port,
        proxy_peers: proxy.proxy_peers,
        requires_auth: proxy.requires_auth,
        login: proxy.login.clone(),
        password: proxy.password.clone(),
    };
    settings
}

const fn encrypt_mode(policy: EncryptionPolicy) -> EncryptMode {
    match policy {
        EncryptionPolicy::Disabled => EncryptMode::Disabled,
        EncryptionPolicy::Enabled => EncryptMode::Enabled,
        EncryptionPolicy::Forced => EncryptMode::Forced,
    }
}

const fn directional_mode(enabled: bool, prefs: &Preferences) -> EncryptMode {
    if enabled {
        encrypt_mode(prefs.network.encryption)
    } else {
        EncryptMode::Disabled
    }
}

/// What the coordinator still owes after the bridge handled a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    /// Key that changed.
    pub key: SettingKey,
    /// Side effect to run, if any.
    pub effect: Option<SideEffect>,
    /// Whether one policy evaluation should follow.
    pub reschedule: bool,
}

/// Applies preference changes to the session settings snapshot.
pub struct SettingsChangeBridge {
    config: Arc<dyn ConfigStore>,
    store: Arc<SessionSettingsStore>,
    metrics: Metrics,
}

impl SettingsChangeBridge {
    /// Bridge reading `config` and writing through `store`.
    #[must_use]
    pub fn new(
        config: Arc<dyn ConfigStore>,
        store: Arc<SessionSettingsStore>,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            store,
            metrics,
        }
    }

    /// Parse and handle a raw key token; unknown tokens are ignored.
    pub fn handle_token(&self, token: &str) -> Option<Reaction> {
        match token.parse::<SettingKey>() {
            Ok(key) => Some(self.handle(key)),
            Err(_) => {
                debug!(token, "ignoring unknown settings key");
                None
            }
        }
    }

    /// Apply the settings mutation for `key`, if any, and report the rest.
    pub fn handle(&self, key: SettingKey) -> Reaction {
        let effect = match action_for(key) {
            SettingAction::Ignore => None,
            SettingAction::Effect(effect) => Some(effect),
            SettingAction::Apply(mutation) => {
                let prefs = self.config.snapshot();
                self.store.apply(|settings| mutation(settings, &prefs));
                self.metrics.inc_settings_applied(key.as_str());
                None
            }
        };
        Reaction {
            key,
            effect,
            reschedule: requires_reschedule(key),
        }
    }

    /// Push the startup snapshot.
    pub fn push_initial(&self) {
        let prefs = self.config.snapshot();
        self.store.apply(|_| initial_settings(&prefs));
    }

    /// Re-apply every mutation after missed change notifications.
    pub fn resync(&self) {
        let prefs = self.config.snapshot();
        self.store.apply(|settings| apply_all(settings, &prefs));
    }

    /// Push the proxy preferences.
    pub fn push_proxy(&self) {
        let prefs = self.config.snapshot();
        self.store.apply(|settings| with_proxy(settings, &prefs));
    }
}
