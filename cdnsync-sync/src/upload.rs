//! Concurrency-bounded upload of changed candidates.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use cdnsync_core::RemoteKey;

use crate::auth::Credentials;
use crate::detect::Candidate;
use crate::error::SyncError;
use crate::remote::{with_timeout, RemoteService};

/// Observer for upload progress. `completed` only ever increases.
pub trait Progress: Send + Sync {
    fn advance(&self, completed: usize, total: usize);
}

/// Keys written by a fully successful upload phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: BTreeSet<RemoteKey>,
}

/// Pushes files to the object store with bounded concurrency.
pub struct Uploader {
    remote: Arc<dyn RemoteService>,
    credentials: Credentials,
    bucket: String,
    max_concurrency: usize,
    timeout: Duration,
    progress: Option<Arc<dyn Progress>>,
}

impl Uploader {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        credentials: Credentials,
        bucket: impl Into<String>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            remote,
            credentials,
            bucket: bucket.into(),
            max_concurrency: max_concurrency.max(1),
            timeout,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Upload every candidate.
    ///
    /// A failed file never cancels its siblings; once all uploads have
    /// settled, any failure turns the phase into [`SyncError::Upload`].
    pub async fn upload_all(&self, changed: &[Candidate]) -> Result<UploadReport, SyncError> {
        let total = changed.len();
        tracing::info!(total, max_concurrency = self.max_concurrency, "uploading");
        if total == 0 {
            return Ok(UploadReport::default());
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set: JoinSet<(RemoteKey, Result<(), String>)> = JoinSet::new();

        for candidate in changed {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Join(format!("upload semaphore closed: {e}")))?;

            let remote = self.remote.clone();
            let token = self
                .credentials
                .upload_token(&format!("{}:{}", self.bucket, candidate.key));
            let key = candidate.key.clone();
            let path = candidate.asset.local_path.clone();
            let timeout = self.timeout;

            join_set.spawn(async move {
                let _permit = permit;
                let outcome = match with_timeout(timeout, remote.put_object(&token, &key, &path))
                    .await
                {
                    Ok(status) if (200..300).contains(&status) => Ok(()),
                    Ok(status) => Err(format!("unexpected status {status}")),
                    Err(err) => Err(err.to_string()),
                };
                (key, outcome)
            });
        }

        let mut report = UploadReport::default();
        let mut failures = BTreeSet::new();
        let mut panicked = Vec::new();
        let mut completed = 0;
        while let Some(joined) = join_set.join_next().await {
            completed += 1;
            match joined {
                Ok((key, Ok(()))) => {
                    tracing::debug!(key = %key, "uploaded");
                    report.uploaded.insert(key);
                }
                Ok((key, Err(reason))) => {
                    tracing::warn!(key = %key, error = %reason, "upload failed");
                    failures.insert(key);
                }
                Err(err) => panicked.push(err.to_string()),
            }
            if let Some(progress) = &self.progress {
                progress.advance(completed, total);
            }
        }

        if !panicked.is_empty() {
            return Err(SyncError::Join(panicked.join("; ")));
        }
        if !failures.is_empty() {
            return Err(SyncError::Upload { failures });
        }
        tracing::info!(uploaded = report.uploaded.len(), "upload complete");
        Ok(report)
    }
}
