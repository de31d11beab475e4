//! Sync options: raw (as written in a YAML file) and validated.
//!
//! [`RawOptions`] mirrors the on-disk camelCase keys; every field is
//! optional so a missing option can be reported by name. [`RawOptions::validate`]
//! applies defaults and normalization and yields a [`SyncOptions`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Filter, FilterSpec, RemoteKey};

pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// Regional endpoint selection for the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Z0,
    Z1,
    Z2,
    Na0,
    As0,
}

impl Zone {
    /// Form-upload host for this zone.
    pub fn upload_host(self) -> &'static str {
        match self {
            Zone::Z0 => "up.qiniup.com",
            Zone::Z1 => "up-z1.qiniup.com",
            Zone::Z2 => "up-z2.qiniup.com",
            Zone::Na0 => "up-na0.qiniup.com",
            Zone::As0 => "up-as0.qiniup.com",
        }
    }

    /// Resource-management host (batch operations) for this zone.
    pub fn rs_host(self) -> &'static str {
        match self {
            Zone::Z0 => "rs.qiniu.com",
            Zone::Z1 => "rs-z1.qiniu.com",
            Zone::Z2 => "rs-z2.qiniu.com",
            Zone::Na0 => "rs-na0.qiniu.com",
            Zone::As0 => "rs-as0.qiniu.com",
        }
    }
}

impl FromStr for Zone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z0" => Ok(Zone::Z0),
            "z1" => Ok(Zone::Z1),
            "z2" => Ok(Zone::Z2),
            "na0" => Ok(Zone::Na0),
            "as0" => Ok(Zone::As0),
            _ => Err(ConfigError::UnknownZone(s.to_owned())),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Z0 => write!(f, "z0"),
            Zone::Z1 => write!(f, "z1"),
            Zone::Z2 => write!(f, "z2"),
            Zone::Na0 => write!(f, "na0"),
            Zone::As0 => write!(f, "as0"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw options
// ---------------------------------------------------------------------------

/// Options as read from a config file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOptions {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub cdn: Option<String>,
    pub zone: Option<String>,
    /// Per remote call timeout in milliseconds.
    pub timeout: Option<u64>,
    pub include: Vec<FilterSpec>,
    pub exclude: Vec<FilterSpec>,
    pub refresh: bool,
    pub refresh_filters: Vec<FilterSpec>,
    pub delete: bool,
    pub prefix: Option<String>,
    pub max_concurrency: Option<usize>,
    pub dry_run: bool,
}

impl RawOptions {
    /// Load raw options from a YAML file.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check required options, apply defaults and normalize.
    pub fn validate(self) -> Result<SyncOptions, ConfigError> {
        let access_key = required(self.access_key, "accessKey")?;
        let secret_key = required(self.secret_key, "secretKey")?;
        let mut cdn = required(self.cdn, "cdn")?;
        let zone: Zone = required(self.zone, "zone")?.parse()?;
        let bucket = required(self.bucket, "bucket")?;

        if !(cdn.starts_with("http://") || cdn.starts_with("https://")) {
            return Err(ConfigError::InvalidCdn(cdn));
        }
        if !cdn.ends_with('/') {
            cdn.push('/');
        }

        let timeout_ms = self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::Zero("timeout"));
        }
        let max_concurrency = self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(ConfigError::Zero("maxConcurrency"));
        }

        Ok(SyncOptions {
            access_key,
            secret_key,
            bucket,
            cdn,
            zone,
            timeout: Duration::from_millis(timeout_ms),
            include: compile_all(&self.include)?,
            exclude: compile_all(&self.exclude)?,
            refresh: self.refresh,
            refresh_filters: compile_all(&self.refresh_filters)?,
            delete: self.delete,
            prefix: normalize_prefix(self.prefix.as_deref().unwrap_or_default()),
            max_concurrency,
            dry_run: self.dry_run,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn compile_all(specs: &[FilterSpec]) -> Result<Vec<Filter>, ConfigError> {
    specs.iter().map(FilterSpec::compile).collect()
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}

// ---------------------------------------------------------------------------
// Validated options
// ---------------------------------------------------------------------------

/// Validated, normalized options consumed by the sync engine.
#[derive(Clone)]
pub struct SyncOptions {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Public CDN base URL, always ending with `/`.
    pub cdn: String,
    pub zone: Zone,
    pub timeout: Duration,
    pub include: Vec<Filter>,
    pub exclude: Vec<Filter>,
    pub refresh: bool,
    pub refresh_filters: Vec<Filter>,
    pub delete: bool,
    /// Remote key prefix, empty or ending with `/`.
    pub prefix: String,
    pub max_concurrency: usize,
    pub dry_run: bool,
}

impl SyncOptions {
    /// Remote key for a build-output name.
    pub fn remote_key(&self, name: &str) -> RemoteKey {
        RemoteKey(format!("{}{}", self.prefix, name.trim_start_matches('/')))
    }

    /// Public URL of a remote key behind the CDN.
    pub fn public_url(&self, key: &RemoteKey) -> String {
        format!("{}{}", self.cdn, key.0)
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("cdn", &self.cdn)
            .field("zone", &self.zone)
            .field("timeout", &self.timeout)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("refresh", &self.refresh)
            .field("refresh_filters", &self.refresh_filters)
            .field("delete", &self.delete)
            .field("prefix", &self.prefix)
            .field("max_concurrency", &self.max_concurrency)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
