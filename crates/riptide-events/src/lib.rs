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

//! Engine event taxonomy and listener fan-out for the Riptide coordinator.
//!
//! Layout: `ids.rs` (info-hash identifiers), `payloads.rs` (typed session
//! events), `registry.rs` (listener registration and synchronous dispatch),
//! `correlate.rs` (one-shot and streaming subscriptions keyed by a matcher),
//! `error.rs` (identifier and subscription errors).

pub mod correlate;
pub mod error;
pub mod ids;
pub mod payloads;
pub mod registry;

pub use correlate::{Correlated, Subscription};
pub use error::{InfoHashError, SubscriptionClosed};
pub use ids::{INFO_HASH_LEN, InfoHash, TorrentId};
pub use payloads::{EngineEvent, MetadataFailure, MetadataFailureKind};
pub use registry::{DispatchOutcome, EngineListener, ListenerId, ListenerRegistry};
