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

//! Storage access and directory watching for the torrent engine.
//!
//! Layout: `filesystem.rs` (`FileSystem` trait + local implementation),
//! `watcher.rs` (scan + debounced watch for `.torrent` files), `error.rs`.

pub mod error;
pub mod filesystem;
pub mod watcher;

pub use error::{FsOpsError, FsOpsResult};
pub use filesystem::{FileSystem, LocalFileSystem};
pub use watcher::{DirectoryWatcher, TorrentSink};
