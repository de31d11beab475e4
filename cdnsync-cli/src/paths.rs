//! Default on-disk locations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Directory namespace under the platform cache dir.
pub const CACHE_NAMESPACE: &str = "cdnsync";
pub const CACHE_FILE: &str = "cacheData.json";
pub const DEFAULT_CONFIG: &str = "cdnsync.yaml";

/// `<cache_root>/cdnsync/cacheData.json`
pub fn cache_path_at(cache_root: &Path) -> PathBuf {
    cache_root.join(CACHE_NAMESPACE).join(CACHE_FILE)
}

/// Cache file under the platform cache dir (`dirs::cache_dir()`).
pub fn default_cache_path() -> Result<PathBuf> {
    let root = dirs::cache_dir().context("could not determine cache directory")?;
    Ok(cache_path_at(&root))
}

/// `--cache-file` if given, otherwise the platform default.
pub fn resolve_cache_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_cache_path(),
    }
}
