//! Typed preference sections.
//!
//! Every section deserializes with `#[serde(default)]`, so partial documents
//! fill the gaps from [`crate::defaults`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Full preference document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Preferences {
    /// Rate, connection, and queue limits.
    pub limits: LimitPreferences,
    /// Protocol features, ports, and filtering.
    pub network: NetworkPreferences,
    /// Proxy configuration and apply flags.
    pub proxy: ProxyPreferences,
    /// Conditions under which torrents pause automatically.
    pub policy: PolicyPreferences,
    /// Download, persistence, and watch locations.
    pub storage: StoragePreferences,
    /// Local streaming server.
    pub streaming: StreamingPreferences,
}

/// Rate, connection, and queue limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitPreferences {
    /// Global download limit in bytes per second; `0` is unlimited.
    pub max_download_speed: u64,
    /// Global upload limit in bytes per second; `0` is unlimited.
    pub max_upload_speed: u64,
    /// Global connection cap; also bounds the peer list size.
    pub max_connections: u32,
    /// Connection cap per torrent.
    pub max_connections_per_torrent: u32,
    /// Upload slots per torrent.
    pub max_uploads_per_torrent: u32,
    /// Concurrently downloading torrents.
    pub max_active_downloads: u32,
    /// Concurrently seeding torrents.
    pub max_active_uploads: u32,
    /// Concurrently active torrents.
    pub max_active_torrents: u32,
}

impl Default for LimitPreferences {
    fn default() -> Self {
        Self {
            max_download_speed: 0,
            max_upload_speed: 0,
            max_connections: defaults::MAX_CONNECTIONS,
            max_connections_per_torrent: defaults::MAX_CONNECTIONS_PER_TORRENT,
            max_uploads_per_torrent: defaults::MAX_UPLOADS_PER_TORRENT,
            max_active_downloads: defaults::MAX_ACTIVE_DOWNLOADS,
            max_active_uploads: defaults::MAX_ACTIVE_UPLOADS,
            max_active_torrents: defaults::MAX_ACTIVE_TORRENTS,
        }
    }
}

/// Encryption preference as stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionPolicy {
    /// Never encrypt.
    Disabled,
    /// Encrypt when the peer supports it.
    #[default]
    Enabled,
    /// Refuse unencrypted peers.
    Forced,
}

/// Protocol features, ports, and filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct NetworkPreferences {
    /// Distributed hash table.
    pub enable_dht: bool,
    /// Local service discovery.
    pub enable_lsd: bool,
    /// uTP transport.
    pub enable_utp: bool,
    /// UPnP port mapping.
    pub enable_upnp: bool,
    /// NAT-PMP port mapping.
    pub enable_natpmp: bool,
    /// Encryption policy.
    pub encryption: EncryptionPolicy,
    /// Encrypt incoming connections.
    pub encrypt_in_connections: bool,
    /// Encrypt outgoing connections.
    pub encrypt_out_connections: bool,
    /// Pick a random listen range on every session start.
    pub use_random_port: bool,
    /// First listen port.
    pub port_range_first: u16,
    /// Last listen port.
    pub port_range_second: u16,
    /// Load the IP filter file.
    pub enable_ip_filtering: bool,
    /// IP filter file.
    pub ip_filtering_file: Option<PathBuf>,
    /// Let the session queue torrents automatically.
    pub auto_manage: bool,
    /// Surface port-mapping failures to the user.
    pub show_nat_errors: bool,
}

impl Default for NetworkPreferences {
    fn default() -> Self {
        Self {
            enable_dht: true,
            enable_lsd: true,
            enable_utp: true,
            enable_upnp: true,
            enable_natpmp: true,
            encryption: EncryptionPolicy::default(),
            encrypt_in_connections: true,
            encrypt_out_connections: true,
            use_random_port: true,
            port_range_first: defaults::PORT_RANGE_FIRST,
            port_range_second: defaults::PORT_RANGE_SECOND,
            enable_ip_filtering: false,
            ip_filtering_file: None,
            auto_manage: false,
            show_nat_errors: false,
        }
    }
}

/// Proxy protocol as stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    /// No proxy.
    #[default]
    None,
    /// SOCKS4.
    Socks4,
    /// SOCKS5.
    Socks5,
    /// HTTP CONNECT.
    Http,
}

/// Proxy configuration plus the flags that gate applying it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProxyPreferences {
    /// Proxy protocol.
    pub kind: ProxyKind,
    /// Proxy host.
    pub address: String,
    /// Proxy port.
    pub port: u16,
    /// Route peer connections through the proxy too.
    pub proxy_peers: bool,
    /// Authenticate against the proxy.
    pub requires_auth: bool,
    /// Proxy user name.
    pub login: String,
    /// Proxy password.
    pub password: String,
    /// Set by the UI to request applying the proxy now.
    pub apply_proxy: bool,
    /// Set when proxy fields changed while the session was stopped.
    pub proxy_changed: bool,
}

/// Conditions under which torrents pause automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PolicyPreferences {
    /// Only transfer on unmetered networks.
    pub unmetered_connections_only: bool,
    /// Keep transferring while roaming.
    pub enable_roaming: bool,
    /// Only transfer while charging.
    pub download_only_when_charging: bool,
    /// Pause when the platform reports a low battery.
    pub battery_control: bool,
    /// Pause at or below a custom battery percentage instead.
    pub custom_battery_control: bool,
    /// Threshold for custom battery control, 0-100.
    pub custom_battery_control_value: u8,
}

impl Default for PolicyPreferences {
    fn default() -> Self {
        Self {
            unmetered_connections_only: false,
            enable_roaming: true,
            download_only_when_charging: false,
            battery_control: false,
            custom_battery_control: false,
            custom_battery_control_value: defaults::CUSTOM_BATTERY_THRESHOLD,
        }
    }
}

/// Download, persistence, and watch locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoragePreferences {
    /// Directory new torrents download into.
    pub save_torrents_in: PathBuf,
    /// Keep a copy of every added `.torrent`.
    pub save_torrent_files: bool,
    /// Directory `.torrent` copies go to.
    pub save_torrent_files_in: Option<PathBuf>,
    /// Move payloads once finished.
    pub move_after_download: bool,
    /// Destination for finished payloads.
    pub move_after_download_in: Option<PathBuf>,
    /// Add `.torrent` files that appear in a watched directory.
    pub watch_dir: bool,
    /// Directory to watch.
    pub dir_to_watch: Option<PathBuf>,
}

impl Default for StoragePreferences {
    fn default() -> Self {
        Self {
            save_torrents_in: PathBuf::from(defaults::SAVE_TORRENTS_IN),
            save_torrent_files: false,
            save_torrent_files_in: None,
            move_after_download: false,
            move_after_download_in: None,
            watch_dir: false,
            dir_to_watch: None,
        }
    }
}

/// Local streaming server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamingPreferences {
    /// Run the streaming server.
    pub enable_streaming: bool,
    /// Bind host.
    pub hostname: String,
    /// Bind port.
    pub port: u16,
}

impl Default for StreamingPreferences {
    fn default() -> Self {
        Self {
            enable_streaming: true,
            hostname: defaults::STREAMING_HOSTNAME.to_string(),
            port: defaults::STREAMING_PORT,
        }
    }
}
