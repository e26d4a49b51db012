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

//! Engine coordinator: the façade between the torrent session and the rest of
//! the application.
//!
//! Layout: `coordinator.rs` (lifecycle, settings effects, policy, control
//! operations), `add.rs` (add-torrent pipeline), `queries.rs` (read-only
//! snapshots), `reactions.rs` (session event handling), `executor.rs`
//! (background units), `settings_bridge.rs` and `settings_store.rs`
//! (preference propagation), `magnet.rs` (metadata resolution), `policy.rs`
//! (power and connectivity rules), `collaborators.rs` (outward seams),
//! `error.rs`.

pub mod add;
pub mod collaborators;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod magnet;
pub mod policy;
mod queries;
mod reactions;
pub mod settings_bridge;
pub mod settings_store;

pub use add::params_from_file;
pub use collaborators::{AddFailure, Notice, Notifier, ServiceHost, StreamingServer};
pub use coordinator::{EngineCoordinator, EngineDeps, EngineState, SpeedLimits};
pub use error::{EngineError, EngineResult, MagnetError};
pub use executor::TaskExecutor;
pub use magnet::{MagnetResolutionBridge, MetadataFuture};
pub use policy::{DeviceSignal, DeviceState, PolicyInputs, PolicySubscriptions};
pub use settings_bridge::{
    Reaction, SettingAction, SettingsChangeBridge, SettingsMutation, SideEffect, action_for,
    requires_reschedule,
};
pub use settings_store::SessionSettingsStore;
