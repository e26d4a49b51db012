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

//! Live-reloadable engine preferences.
//!
//! Layout: `model.rs` (typed preference sections), `keys.rs` (change-key
//! tokens), `validate.rs` (field validation), `store.rs` (`ConfigStore` +
//! in-memory implementation and change stream), `defaults.rs`, `error.rs`.

pub mod defaults;
pub mod error;
pub mod keys;
pub mod model;
pub mod store;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use keys::SettingKey;
pub use model::{
    EncryptionPolicy, LimitPreferences, NetworkPreferences, PolicyPreferences, Preferences,
    ProxyKind, ProxyPreferences, StoragePreferences, StreamingPreferences,
};
pub use store::{ConfigStore, MemoryConfigStore, SettingsChange, SettingsStream};
pub use validate::validate_preferences;
