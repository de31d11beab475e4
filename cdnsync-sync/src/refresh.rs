//! CDN cache invalidation for changed files.

use std::time::Duration;

use cdnsync_core::SyncOptions;

use crate::batch::chunk;
use crate::detect::Candidate;
use crate::error::SyncError;
use crate::filter::passes;
use crate::remote::{with_timeout, RemoteService};

/// Maximum URLs per refresh call.
pub const MAX_REFRESH: usize = 100;

/// Public URLs of changed candidates that pass the refresh filters.
pub fn refresh_urls(changed: &[Candidate], options: &SyncOptions) -> Vec<String> {
    changed
        .iter()
        .filter(|c| passes(&c.asset.name, &options.refresh_filters, true))
        .map(|c| options.public_url(&c.key))
        .collect()
}

/// Invalidate `urls` in batches of [`MAX_REFRESH`].
///
/// Stops at the first batch that is not acknowledged; batches already
/// invalidated stay invalidated.
pub async fn refresh(
    remote: &dyn RemoteService,
    urls: &[String],
    timeout: Duration,
) -> Result<usize, SyncError> {
    tracing::info!(count = urls.len(), "refreshing cdn urls");
    let mut refreshed = 0;
    for (index, batch) in chunk(urls, MAX_REFRESH).into_iter().enumerate() {
        let response = with_timeout(timeout, remote.refresh_urls(batch))
            .await
            .map_err(|err| SyncError::Refresh {
                status: None,
                message: err.to_string(),
            })?;
        if !response.is_success() {
            return Err(SyncError::Refresh {
                status: Some(response.status),
                message: format!(
                    "batch {} not acknowledged (code {:?}, error {:?})",
                    index + 1,
                    response.code,
                    response.error
                ),
            });
        }
        refreshed += batch.len();
    }
    Ok(refreshed)
}
