//! cdnsync core library: domain types, sync options, errors.
//!
//! Public API surface:
//! - [`types`]: assets, remote keys, digests, filters
//! - [`options`]: raw option parsing and validation into [`SyncOptions`]
//! - [`error`]: [`ConfigError`]

pub mod error;
pub mod options;
pub mod types;

pub use error::ConfigError;
pub use options::{RawOptions, SyncOptions, Zone};
pub use types::{
    Asset, AssetEntry, CacheSnapshot, ContentDigest, Filter, FilterSpec, Manifest, RemoteKey,
};
