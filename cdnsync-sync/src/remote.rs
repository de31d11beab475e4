//! Remote object store / CDN boundary.
//!
//! The engine never speaks the wire protocol itself; it calls a
//! [`RemoteService`] and interprets the returned status values.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use cdnsync_core::RemoteKey;

use crate::error::RemoteError;

/// Per-operation outcome inside a batch call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchOpResult {
    pub code: u16,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Response of one multi-key delete call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDeleteResponse {
    /// 200 on full success, 298 on partial success.
    pub status: u16,
    pub results: Vec<BatchOpResult>,
}

impl BatchDeleteResponse {
    /// Any 2xx status (full or partial success).
    pub fn is_success(&self) -> bool {
        self.status / 100 == 2
    }

    /// Number of operations reported as failed within the batch.
    pub fn failed_ops(&self) -> usize {
        self.results.iter().filter(|r| r.code != 200).count()
    }
}

/// Response of one cache-invalidation call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(skip)]
    pub status: u16,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RefreshResponse {
    /// HTTP 200 plus `code == 200` or `error == "success"` in the body.
    pub fn is_success(&self) -> bool {
        self.status == 200 && (self.code == Some(200) || self.error.as_deref() == Some("success"))
    }
}

/// Calls the engine needs from the object store and CDN.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Store the file at `local_path` under `key`, authorized by `token`.
    /// Returns the HTTP status.
    async fn put_object(
        &self,
        token: &str,
        key: &RemoteKey,
        local_path: &Path,
    ) -> Result<u16, RemoteError>;

    /// Delete all `keys` from `bucket` in one call.
    async fn batch_delete(
        &self,
        bucket: &str,
        keys: &[RemoteKey],
    ) -> Result<BatchDeleteResponse, RemoteError>;

    /// Invalidate CDN caches for `urls` in one call.
    async fn refresh_urls(&self, urls: &[String]) -> Result<RefreshResponse, RemoteError>;
}

/// Bound a remote call by `limit`; elapsed calls become [`RemoteError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: std::future::Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}
