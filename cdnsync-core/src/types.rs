//! Domain types for cdnsync.
//!
//! All local file locations use `PathBuf`; remote identifiers are newtypes
//! over `String` so the two never get mixed up.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Path under which an asset is stored in the remote object store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteKey(pub String);

impl RemoteKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Lowercase hex digest of a file's full byte stream. Change detection only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(pub String);

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContentDigest {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentDigest {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Persisted mapping from remote key to the digest uploaded under it.
pub type CacheSnapshot = BTreeMap<RemoteKey, ContentDigest>;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A build output candidate for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Build-output name, `/`-separated.
    pub name: String,
    pub local_path: PathBuf,
}

impl Asset {
    pub fn new(name: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
        }
    }
}

/// One entry of the build manifest handed over by the build tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub name: String,
    pub local_path: PathBuf,
    #[serde(default = "default_emitted")]
    pub emitted: bool,
}

fn default_emitted() -> bool {
    true
}

/// Ordered build manifest. Only emitted entries become candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub entries: Vec<AssetEntry>,
}

impl Manifest {
    /// Load a JSON manifest (an array of `{name, localPath, emitted}`).
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Emitted entries as assets, in manifest order.
    pub fn emitted(&self) -> Vec<Asset> {
        self.entries
            .iter()
            .filter(|e| e.emitted)
            .map(|e| Asset::new(e.name.clone(), e.local_path.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// A single name filter.
#[derive(Clone)]
pub enum Filter {
    /// Exact string equality against the candidate name.
    Literal(String),
    /// Regular expression search against the candidate name.
    Pattern(Regex),
    /// Arbitrary caller-supplied predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Filter {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Filter::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// Serialized form of a filter in an options file.
///
/// A plain string is a literal; `{ pattern: "..." }` is a regex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    Literal(String),
    Pattern { pattern: String },
}

impl FilterSpec {
    pub fn compile(&self) -> Result<Filter, ConfigError> {
        match self {
            FilterSpec::Literal(s) => Ok(Filter::literal(s.clone())),
            FilterSpec::Pattern { pattern } => Filter::pattern(pattern),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
