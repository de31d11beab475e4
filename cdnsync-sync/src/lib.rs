//! # cdnsync-sync
//!
//! Incremental sync of build output to an object store and its CDN.
//!
//! Build a [`SyncEngine`] with validated options, a [`RemoteService`] and a
//! [`CacheStore`], then call [`SyncEngine::run`] with the emitted assets.

pub mod auth;
pub mod batch;
pub mod cache_store;
pub mod delete;
pub mod detect;
pub mod error;
pub mod filter;
pub mod hasher;
pub mod pipeline;
pub mod refresh;
pub mod remote;
pub mod upload;

pub use auth::Credentials;
pub use cache_store::{CacheBackend, CacheStore, FileBackend, MemoryBackend};
pub use detect::{Candidate, Detection};
pub use error::{Phase, RemoteError, SyncError};
pub use pipeline::{SyncEngine, SyncReport, SyncState};
pub use remote::{BatchDeleteResponse, BatchOpResult, RefreshResponse, RemoteService};
pub use upload::{Progress, UploadReport, Uploader};
