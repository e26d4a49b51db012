//! Session-wide settings snapshot.
//!
//! The session only accepts whole snapshots; callers fetch the current value,
//! change one logical field, and push the result back.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lowest port a random listen range may start at.
pub const RANDOM_PORT_MIN: u16 = 37_000;
/// Width of the window random ranges are drawn from.
pub const RANDOM_PORT_SPAN: u16 = 20_000;
/// Ports covered by one random range beyond its first port.
pub const RANDOM_PORT_WIDTH: u16 = 10;

/// Inclusive listen port range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortRange {
    /// First port of the range.
    pub first: u16,
    /// Last port of the range.
    pub second: u16,
}

impl PortRange {
    /// Construct a range, swapping the bounds when given in reverse.
    #[must_use]
    pub const fn new(first: u16, second: u16) -> Self {
        if first <= second {
            Self { first, second }
        } else {
            Self {
                first: second,
                second: first,
            }
        }
    }

    /// Draw a fresh range inside the random window.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = RANDOM_PORT_MIN + rng.random_range(0..RANDOM_PORT_SPAN);
        Self::new(first, first + RANDOM_PORT_WIDTH)
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self::new(6_881, 6_891)
    }
}

/// Protocol encryption policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncryptMode {
    /// Plaintext only.
    Disabled,
    /// Prefer encryption, fall back to plaintext.
    #[default]
    Enabled,
    /// Require encryption.
    Forced,
}

/// Proxy protocol.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    /// No proxy.
    #[default]
    None,
    /// SOCKS4 proxy.
    Socks4,
    /// SOCKS5 proxy.
    Socks5,
    /// HTTP CONNECT proxy.
    Http,
}

/// Proxy configuration pushed to the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy protocol.
    pub kind: ProxyType,
    /// Proxy host.
    pub address: String,
    /// Proxy port.
    pub port: u16,
    /// Route peer connections through the proxy as well as trackers.
    pub proxy_peers: bool,
    /// Authenticate against the proxy.
    pub requires_auth: bool,
    /// Proxy user name.
    pub login: String,
    /// Proxy password.
    pub password: String,
}

/// Every tunable the session exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionSettings {
    /// Global download limit in bytes per second; `0` is unlimited.
    pub download_rate_limit: u64,
    /// Global upload limit in bytes per second; `0` is unlimited.
    pub upload_rate_limit: u64,
    /// Global connection cap.
    pub connections_limit: u32,
    /// Peers remembered per torrent.
    pub max_peer_list_size: u32,
    /// Connection cap per torrent.
    pub max_connections_per_torrent: u32,
    /// Upload slot cap per torrent.
    pub max_uploads_per_torrent: u32,
    /// Concurrently downloading torrents.
    pub active_downloads: u32,
    /// Concurrently seeding torrents.
    pub active_seeds: u32,
    /// Concurrently active torrents of any kind.
    pub active_limit: u32,
    /// Distributed hash table.
    pub dht_enabled: bool,
    /// Local service discovery.
    pub lsd_enabled: bool,
    /// uTP transport.
    pub utp_enabled: bool,
    /// UPnP port mapping.
    pub upnp_enabled: bool,
    /// NAT-PMP port mapping.
    pub natpmp_enabled: bool,
    /// Encryption policy.
    pub encrypt_mode: EncryptMode,
    /// Encrypt incoming connections.
    pub encrypt_in_connections: bool,
    /// Encrypt outgoing connections.
    pub encrypt_out_connections: bool,
    /// Proxy configuration.
    pub proxy: ProxySettings,
    /// Listen port range.
    pub port_range: PortRange,
    /// Let the session queue torrents automatically.
    pub auto_managed: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            download_rate_limit: 0,
            upload_rate_limit: 0,
            connections_limit: 200,
            max_peer_list_size: 200,
            max_connections_per_torrent: 40,
            max_uploads_per_torrent: 4,
            active_downloads: 4,
            active_seeds: 4,
            active_limit: 6,
            dht_enabled: true,
            lsd_enabled: true,
            utp_enabled: true,
            upnp_enabled: true,
            natpmp_enabled: true,
            encrypt_mode: EncryptMode::default(),
            encrypt_in_connections: true,
            encrypt_out_connections: true,
            proxy: ProxySettings::default(),
            port_range: PortRange::default(),
            auto_managed: false,
        }
    }
}
