#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Engine-agnostic torrent interfaces and DTOs.
//!
//! Layout: `model/` (admission params, entities, status snapshots, metainfo
//! decoding), `settings.rs` (session settings snapshot), `service/` (session,
//! task, and repository traits implemented by adapters), `error.rs`.

pub mod error;
pub mod model;
pub mod service;
pub mod settings;

pub use error::{TorrentError, TorrentErrorKind, TorrentResult};
pub use model::metainfo::{MetaFile, MetaInfoError, TorrentMetaInfo};
pub use model::{
    AddTorrentParams, AdvancedTorrentInfo, ChangeableParams, MagnetInfo, PeerInfo, Priority,
    SessionStats, TaskStatus, Torrent, TorrentInfo, TorrentSource, TorrentStateCode, TrackerInfo,
    TrackerStatus,
};
pub use riptide_events::{InfoHash, TorrentId};
pub use service::{Session, TorrentRepository, TorrentTask};
pub use settings::{EncryptMode, PortRange, ProxySettings, ProxyType, SessionSettings};
