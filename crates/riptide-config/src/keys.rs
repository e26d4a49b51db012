//! Change-key tokens published whenever a preference is written.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ConfigError;

/// Identity of one preference, published on the change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    /// `policy.unmetered_connections_only`
    UnmeteredConnectionsOnly,
    /// `policy.enable_roaming`
    EnableRoaming,
    /// `policy.download_only_when_charging`
    DownloadOnlyWhenCharging,
    /// `policy.battery_control`
    BatteryControl,
    /// `policy.custom_battery_control`
    CustomBatteryControl,
    /// `policy.custom_battery_control_value`
    CustomBatteryControlValue,
    /// `limits.max_download_speed`
    MaxDownloadSpeed,
    /// `limits.max_upload_speed`
    MaxUploadSpeed,
    /// `limits.max_connections`
    MaxConnections,
    /// `limits.max_connections_per_torrent`
    MaxConnectionsPerTorrent,
    /// `limits.max_uploads_per_torrent`
    MaxUploadsPerTorrent,
    /// `limits.max_active_downloads`
    MaxActiveDownloads,
    /// `limits.max_active_uploads`
    MaxActiveUploads,
    /// `limits.max_active_torrents`
    MaxActiveTorrents,
    /// `network.enable_dht`
    EnableDht,
    /// `network.enable_lsd`
    EnableLsd,
    /// `network.enable_utp`
    EnableUtp,
    /// `network.enable_upnp`
    EnableUpnp,
    /// `network.enable_natpmp`
    EnableNatPmp,
    /// `network.encryption`
    EncryptMode,
    /// `network.encrypt_in_connections`
    EncryptInConnections,
    /// `network.encrypt_out_connections`
    EncryptOutConnections,
    /// `network.use_random_port`
    UseRandomPort,
    /// `network.port_range_first`
    PortRangeFirst,
    /// `network.port_range_second`
    PortRangeSecond,
    /// `network.enable_ip_filtering`
    EnableIpFiltering,
    /// `network.ip_filtering_file`
    IpFilteringFile,
    /// `network.auto_manage`
    AutoManage,
    /// `network.show_nat_errors`
    ShowNatErrors,
    /// `proxy.kind`
    ProxyType,
    /// `proxy.address`
    ProxyAddress,
    /// `proxy.port`
    ProxyPort,
    /// `proxy.proxy_peers`
    ProxyPeers,
    /// `proxy.requires_auth`
    ProxyRequiresAuth,
    /// `proxy.login`
    ProxyLogin,
    /// `proxy.password`
    ProxyPassword,
    /// `proxy.apply_proxy`
    ApplyProxy,
    /// `proxy.proxy_changed`
    ProxyChanged,
    /// `storage.save_torrents_in`
    SaveTorrentsIn,
    /// `storage.save_torrent_files`
    SaveTorrentFiles,
    /// `storage.save_torrent_files_in`
    SaveTorrentFilesIn,
    /// `storage.move_after_download`
    MoveAfterDownload,
    /// `storage.move_after_download_in`
    MoveAfterDownloadIn,
    /// `storage.watch_dir`
    WatchDir,
    /// `storage.dir_to_watch`
    DirToWatch,
    /// `streaming.enable_streaming`
    EnableStreaming,
    /// `streaming.hostname`
    StreamingHostname,
    /// `streaming.port`
    StreamingPort,
}

impl SettingKey {
    /// Every key, in declaration order.
    pub const ALL: [Self; 48] = [
        Self::UnmeteredConnectionsOnly,
        Self::EnableRoaming,
        Self::DownloadOnlyWhenCharging,
        Self::BatteryControl,
        Self::CustomBatteryControl,
        Self::CustomBatteryControlValue,
        Self::MaxDownloadSpeed,
        Self::MaxUploadSpeed,
        Self::MaxConnections,
        Self::MaxConnectionsPerTorrent,
        Self::MaxUploadsPerTorrent,
        Self::MaxActiveDownloads,
        Self::MaxActiveUploads,
        Self::MaxActiveTorrents,
        Self::EnableDht,
        Self::EnableLsd,
        Self::EnableUtp,
        Self::EnableUpnp,
        Self::EnableNatPmp,
        Self::EncryptMode,
        Self::EncryptInConnections,
        Self::EncryptOutConnections,
        Self::UseRandomPort,
        Self::PortRangeFirst,
        Self::PortRangeSecond,
        Self::EnableIpFiltering,
        Self::IpFilteringFile,
        Self::AutoManage,
        Self::ShowNatErrors,
        Self::ProxyType,
        Self::ProxyAddress,
        Self::ProxyPort,
        Self::ProxyPeers,
        Self::ProxyRequiresAuth,
        Self::ProxyLogin,
        Self::ProxyPassword,
        Self::ApplyProxy,
        Self::ProxyChanged,
        Self::SaveTorrentsIn,
        Self::SaveTorrentFiles,
        Self::SaveTorrentFilesIn,
        Self::MoveAfterDownload,
        Self::MoveAfterDownloadIn,
        Self::WatchDir,
        Self::DirToWatch,
        Self::EnableStreaming,
        Self::StreamingHostname,
        Self::StreamingPort,
    ];

    /// Token published on the change stream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnmeteredConnectionsOnly => "unmetered_connections_only",
            Self::EnableRoaming => "enable_roaming",
            Self::DownloadOnlyWhenCharging => "download_and_upload_only_when_charging",
            Self::BatteryControl => "battery_control",
            Self::CustomBatteryControl => "custom_battery_control",
            Self::CustomBatteryControlValue => "custom_battery_control_value",
            Self::MaxDownloadSpeed => "max_download_speed",
            Self::MaxUploadSpeed => "max_upload_speed",
            Self::MaxConnections => "max_connections",
            Self::MaxConnectionsPerTorrent => "max_connections_per_torrent",
            Self::MaxUploadsPerTorrent => "max_uploads_per_torrent",
            Self::MaxActiveDownloads => "max_active_downloads",
            Self::MaxActiveUploads => "max_active_uploads",
            Self::MaxActiveTorrents => "max_active_torrents",
            Self::EnableDht => "enable_dht",
            Self::EnableLsd => "enable_lsd",
            Self::EnableUtp => "enable_utp",
            Self::EnableUpnp => "enable_upnp",
            Self::EnableNatPmp => "enable_natpmp",
            Self::EncryptMode => "enc_mode",
            Self::EncryptInConnections => "enc_in_connections",
            Self::EncryptOutConnections => "enc_out_connections",
            Self::UseRandomPort => "use_random_port",
            Self::PortRangeFirst => "port_range_first",
            Self::PortRangeSecond => "port_range_second",
            Self::EnableIpFiltering => "enable_ip_filtering",
            Self::IpFilteringFile => "ip_filtering_file",
            Self::AutoManage => "auto_manage",
            Self::ShowNatErrors => "show_nat_errors",
            Self::ProxyType => "proxy_type",
            Self::ProxyAddress => "proxy_address",
            Self::ProxyPort => "proxy_port",
            Self::ProxyPeers => "proxy_peers_too",
            Self::ProxyRequiresAuth => "proxy_requires_auth",
            Self::ProxyLogin => "proxy_login",
            Self::ProxyPassword => "proxy_password",
            Self::ApplyProxy => "apply_proxy",
            Self::ProxyChanged => "proxy_changed",
            Self::SaveTorrentsIn => "save_torrents_in",
            Self::SaveTorrentFiles => "save_torrent_files",
            Self::SaveTorrentFilesIn => "save_torrent_files_in",
            Self::MoveAfterDownload => "move_after_download",
            Self::MoveAfterDownloadIn => "move_after_download_in",
            Self::WatchDir => "watch_dir",
            Self::DirToWatch => "dir_to_watch",
            Self::EnableStreaming => "enable_streaming",
            Self::StreamingHostname => "streaming_hostname",
            Self::StreamingPort => "streaming_port",
        }
    }
}

impl Display for SettingKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| ConfigError::UnknownKey {
                key: value.to_string(),
            })
    }
}
