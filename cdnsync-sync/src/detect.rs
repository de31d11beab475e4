//! Change detection: hash every candidate and compare with the previous
//! snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use cdnsync_core::{Asset, CacheSnapshot, RemoteKey};

use crate::error::SyncError;
use crate::hasher::hash_file;

/// An asset paired with the remote key it syncs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: RemoteKey,
    pub asset: Asset,
}

/// Outcome of change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Candidates whose digest differs from (or is missing in) the previous
    /// snapshot, in input order.
    pub changed: Vec<Candidate>,
    /// Digest of every candidate, changed or not.
    pub snapshot: CacheSnapshot,
}

/// Hash all candidates concurrently and partition them against `previous`.
///
/// A single unreadable file aborts detection with [`SyncError::Digest`].
/// Two candidates sharing a remote key abort it with
/// [`SyncError::DuplicateKey`] before anything is hashed.
pub async fn detect_changes(
    candidates: Vec<Candidate>,
    previous: &CacheSnapshot,
) -> Result<Detection, SyncError> {
    ensure_unique_keys(&candidates)?;

    let snapshot = Arc::new(Mutex::new(CacheSnapshot::new()));
    let mut join_set: JoinSet<Result<(), SyncError>> = JoinSet::new();

    for candidate in &candidates {
        let key = candidate.key.clone();
        let name = candidate.asset.name.clone();
        let path = candidate.asset.local_path.clone();
        let snapshot = snapshot.clone();
        join_set.spawn_blocking(move || {
            let digest = hash_file(&path).map_err(|err| match err {
                SyncError::Io { path, source } => SyncError::Digest { name, path, source },
                other => other,
            })?;
            tracing::debug!(key = %key, digest = %digest, "hashed");
            snapshot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(key, digest);
            Ok(())
        });
    }

    while let Some(joined) = join_set.join_next().await {
        joined.map_err(|e| SyncError::Join(e.to_string()))??;
    }

    let snapshot = match Arc::try_unwrap(snapshot) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(shared) => shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone(),
    };

    let changed: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| previous.get(&c.key) != snapshot.get(&c.key))
        .collect();

    tracing::info!(
        candidates = snapshot.len(),
        changed = changed.len(),
        "change detection complete"
    );
    Ok(Detection { changed, snapshot })
}

fn ensure_unique_keys(candidates: &[Candidate]) -> Result<(), SyncError> {
    let mut seen: BTreeMap<&RemoteKey, &str> = BTreeMap::new();
    for candidate in candidates {
        if let Some(first) = seen.insert(&candidate.key, &candidate.asset.name) {
            return Err(SyncError::DuplicateKey {
                key: candidate.key.clone(),
                first: first.to_owned(),
                second: candidate.asset.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdnsync_core::ContentDigest;
    use tempfile::TempDir;

    fn candidate(dir: &TempDir, name: &str, content: &str) -> Candidate {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        Candidate {
            key: RemoteKey::from(name),
            asset: Asset::new(name, path),
        }
    }

    #[tokio::test]
    async fn missing_key_counts_as_changed() {
        let dir = TempDir::new().unwrap();
        let c = candidate(&dir, "a.js", "a");
        let detection = detect_changes(vec![c.clone()], &CacheSnapshot::new())
            .await
            .unwrap();
        assert_eq!(detection.changed, vec![c]);
        assert_eq!(detection.snapshot.len(), 1);
    }

    #[tokio::test]
    async fn unchanged_files_are_skipped_but_snapshotted() {
        let dir = TempDir::new().unwrap();
        let a = candidate(&dir, "a.js", "same");
        let b = candidate(&dir, "b.js", "new");

        let mut previous = CacheSnapshot::new();
        previous.insert(a.key.clone(), hash_file(&a.asset.local_path).unwrap());
        previous.insert(b.key.clone(), ContentDigest::from("stale"));

        let detection = detect_changes(vec![a.clone(), b.clone()], &previous)
            .await
            .unwrap();
        assert_eq!(detection.changed, vec![b]);
        assert_eq!(detection.snapshot.len(), 2);
        assert_eq!(detection.snapshot.get(&a.key), previous.get(&a.key));
    }

    #[tokio::test]
    async fn changed_list_preserves_input_order() {
        let dir = TempDir::new().unwrap();
        let names = ["z.js", "m.js", "a.js", "q.js", "b.js"];
        let candidates: Vec<_> = names.iter().map(|n| candidate(&dir, n, n)).collect();
        let detection = detect_changes(candidates.clone(), &CacheSnapshot::new())
            .await
            .unwrap();
        assert_eq!(detection.changed, candidates);
    }

    #[tokio::test]
    async fn unreadable_file_aborts_detection() {
        let dir = TempDir::new().unwrap();
        let ok = candidate(&dir, "a.js", "a");
        let missing = Candidate {
            key: RemoteKey::from("gone.js"),
            asset: Asset::new("gone.js", dir.path().join("gone.js")),
        };
        let err = detect_changes(vec![ok, missing], &CacheSnapshot::new())
            .await
            .unwrap_err();
        match err {
            SyncError::Digest { name, .. } => assert_eq!(name, "gone.js"),
            other => panic!("expected digest error, got {other}"),
        }
    }

    #[tokio::test]
    async fn colliding_keys_are_rejected_before_hashing() {
        let dir = TempDir::new().unwrap();
        let a = candidate(&dir, "a.js", "one");
        let other = Candidate {
            key: RemoteKey::from("a.js"),
            asset: Asset::new("/a.js", dir.path().join("missing.js")),
        };
        let err = detect_changes(vec![a, other], &CacheSnapshot::new())
            .await
            .unwrap_err();
        match err {
            SyncError::DuplicateKey { key, first, second } => {
                assert_eq!(key.as_str(), "a.js");
                assert_eq!(first, "a.js");
                assert_eq!(second, "/a.js");
            }
            other => panic!("expected duplicate key error, got {other}"),
        }
    }
}
