//! Default values for engine preferences.
//!
//! # Design
//! - Centralize defaults so the serde model and validation agree.

/// First port of the default listen range.
pub const PORT_RANGE_FIRST: u16 = 6_881;
/// Last port of the default listen range.
pub const PORT_RANGE_SECOND: u16 = 6_891;
/// Battery percentage at or below which custom battery control pauses.
pub const CUSTOM_BATTERY_THRESHOLD: u8 = 15;
/// Global connection cap.
pub const MAX_CONNECTIONS: u32 = 200;
/// Connection cap per torrent.
pub const MAX_CONNECTIONS_PER_TORRENT: u32 = 40;
/// Upload slots per torrent.
pub const MAX_UPLOADS_PER_TORRENT: u32 = 4;
/// Concurrently downloading torrents.
pub const MAX_ACTIVE_DOWNLOADS: u32 = 4;
/// Concurrently seeding torrents.
pub const MAX_ACTIVE_UPLOADS: u32 = 4;
/// Concurrently active torrents.
pub const MAX_ACTIVE_TORRENTS: u32 = 6;
/// Directory new torrents download into.
pub const SAVE_TORRENTS_IN: &str = "downloads";
/// Host the streaming server binds to.
pub const STREAMING_HOSTNAME: &str = "127.0.0.1";
/// Port the streaming server binds to.
pub const STREAMING_PORT: u16 = 8_800;
/// Capacity of the change-key broadcast channel.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;
