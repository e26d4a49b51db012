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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (bencoded torrent builders), session.rs (recording
//! session fake), task.rs (recording task fake), repository.rs (in-memory
//! torrent repository).

pub mod fixtures;
pub mod repository;
pub mod session;
pub mod task;

pub use fixtures::TorrentFixture;
pub use repository::MemoryRepository;
pub use session::{FakeSession, SessionCall};
pub use task::{FakeTask, TaskCall};
