//! Removal of remote objects no longer produced by the build.

use std::collections::BTreeSet;
use std::time::Duration;

use cdnsync_core::{CacheSnapshot, RemoteKey};

use crate::batch::chunk;
use crate::error::SyncError;
use crate::remote::{with_timeout, RemoteService};

/// Maximum keys per batch delete call.
pub const MAX_DELETE: usize = 1000;

/// Keys present in `old` that are missing from `new` or carry a different
/// digest there. Sorted.
pub fn stale_keys(old: &CacheSnapshot, new: &CacheSnapshot) -> Vec<RemoteKey> {
    old.iter()
        .filter(|(key, digest)| new.get(*key) != Some(*digest))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Stale keys minus those just rewritten in place by the upload phase.
///
/// A changed file keeps its key, so its stale entry names the object that
/// was overwritten moments ago; deleting it would remove the new content.
pub fn deletion_set(
    old: &CacheSnapshot,
    new: &CacheSnapshot,
    replaced: &BTreeSet<RemoteKey>,
) -> Vec<RemoteKey> {
    stale_keys(old, new)
        .into_iter()
        .filter(|key| !replaced.contains(key))
        .collect()
}

/// Delete `keys` from `bucket` in batches of [`MAX_DELETE`].
///
/// Batches run in order. Full (200) or partial (298) success continues; any
/// other status, transport error, or timeout aborts the remaining batches.
pub async fn delete_keys(
    remote: &dyn RemoteService,
    bucket: &str,
    keys: &[RemoteKey],
    timeout: Duration,
) -> Result<usize, SyncError> {
    tracing::info!(count = keys.len(), "deleting stale objects");
    let mut deleted = 0;
    for (index, batch) in chunk(keys, MAX_DELETE).into_iter().enumerate() {
        let response = with_timeout(timeout, remote.batch_delete(bucket, batch))
            .await
            .map_err(|err| SyncError::Delete {
                status: None,
                message: err.to_string(),
            })?;
        if !response.is_success() {
            return Err(SyncError::Delete {
                status: Some(response.status),
                message: format!("batch {} of {} keys rejected", index + 1, batch.len()),
            });
        }
        let failed = response.failed_ops();
        if failed > 0 {
            tracing::warn!(batch = index + 1, failed, "batch delete partially succeeded");
        }
        deleted += batch.len();
    }
    Ok(deleted)
}
