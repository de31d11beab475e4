//! Sync pipeline: detect → upload → delete → refresh → persist.
//!
//! Each phase is a full barrier. The first failing phase moves the engine to
//! [`SyncState::Failed`] and the new cache snapshot is not persisted, so a
//! re-run re-derives the same work.

use std::collections::BTreeSet;
use std::sync::Arc;

use cdnsync_core::{Asset, RemoteKey, SyncOptions};

use crate::auth::Credentials;
use crate::cache_store::CacheStore;
use crate::delete::{delete_keys, deletion_set};
use crate::detect::{detect_changes, Candidate};
use crate::error::{Phase, SyncError};
use crate::filter;
use crate::refresh::{refresh, refresh_urls};
use crate::remote::RemoteService;
use crate::upload::{Progress, Uploader};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Detecting,
    Uploading,
    Deleting,
    Refreshing,
    Persisting,
    Done,
    Failed(Phase),
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Candidates after filtering.
    pub candidates: usize,
    /// Keys uploaded (or that would be, on a dry run).
    pub uploaded: Vec<RemoteKey>,
    pub unchanged: usize,
    /// Keys deleted (or that would be).
    pub deleted: Vec<RemoteKey>,
    /// URLs invalidated (or that would be).
    pub refreshed: Vec<String>,
    pub dry_run: bool,
}

/// Runs the sync pipeline against one remote service and cache store.
pub struct SyncEngine {
    options: SyncOptions,
    remote: Arc<dyn RemoteService>,
    store: CacheStore,
    progress: Option<Arc<dyn Progress>>,
    state: SyncState,
}

impl SyncEngine {
    pub fn new(options: SyncOptions, remote: Arc<dyn RemoteService>, store: CacheStore) -> Self {
        Self {
            options,
            remote,
            store,
            progress: None,
            state: SyncState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// State reached by the most recent run.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run the pipeline over the emitted build assets.
    pub async fn run(&mut self, assets: Vec<Asset>) -> Result<SyncReport, SyncError> {
        let result = self.run_phases(assets).await;
        match &result {
            Ok(_) => self.state = SyncState::Done,
            Err(err) => {
                let phase = match self.state {
                    SyncState::Detecting => Phase::Detecting,
                    SyncState::Uploading => Phase::Uploading,
                    SyncState::Deleting => Phase::Deleting,
                    SyncState::Refreshing => Phase::Refreshing,
                    SyncState::Persisting => Phase::Persisting,
                    _ => err.phase().unwrap_or(Phase::Detecting),
                };
                tracing::error!(phase = %phase, error = %err, "sync failed");
                self.state = SyncState::Failed(phase);
            }
        }
        result
    }

    async fn run_phases(&mut self, assets: Vec<Asset>) -> Result<SyncReport, SyncError> {
        self.state = SyncState::Detecting;
        let candidates: Vec<Candidate> =
            filter::select(assets, &self.options.include, &self.options.exclude)
                .into_iter()
                .map(|asset| Candidate {
                    key: self.options.remote_key(&asset.name),
                    asset,
                })
                .collect();
        let previous = self.store.load();
        let detection = detect_changes(candidates, &previous).await?;

        let mut report = SyncReport {
            candidates: detection.snapshot.len(),
            uploaded: detection.changed.iter().map(|c| c.key.clone()).collect(),
            unchanged: detection
                .snapshot
                .len()
                .saturating_sub(detection.changed.len()),
            dry_run: self.options.dry_run,
            ..SyncReport::default()
        };

        if self.options.dry_run {
            let changed_keys: BTreeSet<RemoteKey> = report.uploaded.iter().cloned().collect();
            if self.options.delete {
                report.deleted = deletion_set(&previous, &detection.snapshot, &changed_keys);
            }
            if self.options.refresh {
                report.refreshed = refresh_urls(&detection.changed, &self.options);
            }
            tracing::info!("dry run: no remote calls made, cache left untouched");
            return Ok(report);
        }

        self.state = SyncState::Uploading;
        let mut uploader = Uploader::new(
            self.remote.clone(),
            Credentials::new(&self.options.access_key, &self.options.secret_key),
            &self.options.bucket,
            self.options.max_concurrency,
            self.options.timeout,
        );
        if let Some(progress) = &self.progress {
            uploader = uploader.with_progress(progress.clone());
        }
        let uploaded = uploader.upload_all(&detection.changed).await?;

        self.state = SyncState::Deleting;
        if self.options.delete {
            let keys = deletion_set(&previous, &detection.snapshot, &uploaded.uploaded);
            if keys.is_empty() {
                tracing::info!("no stale objects to delete");
            } else {
                delete_keys(
                    self.remote.as_ref(),
                    &self.options.bucket,
                    &keys,
                    self.options.timeout,
                )
                .await?;
                report.deleted = keys;
            }
        }

        self.state = SyncState::Refreshing;
        if self.options.refresh {
            let urls = refresh_urls(&detection.changed, &self.options);
            if urls.is_empty() {
                tracing::info!("no cdn urls to refresh");
            } else {
                refresh(self.remote.as_ref(), &urls, self.options.timeout).await?;
                report.refreshed = urls;
            }
        }

        self.state = SyncState::Persisting;
        self.store.save(&detection.snapshot)?;

        tracing::info!(
            uploaded = report.uploaded.len(),
            unchanged = report.unchanged,
            deleted = report.deleted.len(),
            refreshed = report.refreshed.len(),
            "sync complete"
        );
        Ok(report)
    }
}
