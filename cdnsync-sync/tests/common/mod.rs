//! Shared fixtures for cdnsync-sync integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cdnsync_core::{Asset, RawOptions, RemoteKey, SyncOptions};
use cdnsync_sync::{
    BatchDeleteResponse, BatchOpResult, RefreshResponse, RemoteError, RemoteService,
};
use tempfile::TempDir;

/// Scripted in-memory remote that records every call.
#[derive(Default)]
pub struct FakeRemote {
    pub puts: Mutex<Vec<(String, RemoteKey)>>,
    pub deletes: Mutex<Vec<Vec<RemoteKey>>>,
    pub refreshes: Mutex<Vec<Vec<String>>>,
    /// Keys whose upload fails with a transport error.
    pub fail_keys: Mutex<BTreeSet<RemoteKey>>,
    /// Status returned for successful-transport uploads.
    pub put_status: Mutex<Option<u16>>,
    /// Status returned per delete call, consumed in order; default 200.
    pub delete_statuses: Mutex<Vec<u16>>,
    /// Refresh responses consumed in order; default success.
    pub refresh_responses: Mutex<Vec<RefreshResponse>>,
    /// Artificial latency per upload.
    pub put_delay: Mutex<Option<Duration>>,
    /// Artificial latency per batch delete or refresh call.
    pub management_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upload(&self, key: &str) {
        self.fail_keys.lock().unwrap().insert(RemoteKey::from(key));
    }

    pub fn put_keys(&self) -> BTreeSet<RemoteKey> {
        self.puts.lock().unwrap().iter().map(|(_, k)| k.clone()).collect()
    }

    pub fn delete_calls(&self) -> Vec<Vec<RemoteKey>> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn refresh_calls(&self) -> Vec<Vec<String>> {
        self.refreshes.lock().unwrap().clone()
    }

    async fn management_latency(&self) {
        let delay = *self.management_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn reset_calls(&self) {
        self.puts.lock().unwrap().clear();
        self.deletes.lock().unwrap().clear();
        self.refreshes.lock().unwrap().clear();
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn put_object(
        &self,
        token: &str,
        key: &RemoteKey,
        local_path: &Path,
    ) -> Result<u16, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.put_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if !local_path.exists() {
            return Err(RemoteError::Io {
                path: local_path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        if self.fail_keys.lock().unwrap().contains(key) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        self.puts
            .lock()
            .unwrap()
            .push((token.to_string(), key.clone()));
        Ok(self.put_status.lock().unwrap().unwrap_or(200))
    }

    async fn batch_delete(
        &self,
        _bucket: &str,
        keys: &[RemoteKey],
    ) -> Result<BatchDeleteResponse, RemoteError> {
        self.management_latency().await;
        self.deletes.lock().unwrap().push(keys.to_vec());
        let mut statuses = self.delete_statuses.lock().unwrap();
        let status = if statuses.is_empty() {
            200
        } else {
            statuses.remove(0)
        };
        Ok(BatchDeleteResponse {
            status,
            results: keys
                .iter()
                .map(|_| BatchOpResult {
                    code: 200,
                    data: None,
                })
                .collect(),
        })
    }

    async fn refresh_urls(&self, urls: &[String]) -> Result<RefreshResponse, RemoteError> {
        self.management_latency().await;
        self.refreshes.lock().unwrap().push(urls.to_vec());
        let mut responses = self.refresh_responses.lock().unwrap();
        if responses.is_empty() {
            Ok(RefreshResponse {
                status: 200,
                code: Some(200),
                error: Some("success".into()),
            })
        } else {
            Ok(responses.remove(0))
        }
    }
}

/// Validated options with delete and refresh switched on.
pub fn options() -> SyncOptions {
    RawOptions {
        access_key: Some("ak".into()),
        secret_key: Some("sk".into()),
        bucket: Some("assets".into()),
        cdn: Some("https://cdn.example.com".into()),
        zone: Some("z0".into()),
        refresh: true,
        delete: true,
        ..RawOptions::default()
    }
    .validate()
    .expect("valid options")
}

/// Build output directory with helpers to write and list assets.
pub struct BuildDir {
    pub dir: TempDir,
}

impl BuildDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, content).expect("write asset");
        path
    }

    pub fn remove(&self, name: &str) {
        std::fs::remove_file(self.dir.path().join(name)).expect("remove asset");
    }

    pub fn assets(&self, names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .map(|n| Asset::new(*n, self.dir.path().join(n)))
            .collect()
    }
}
