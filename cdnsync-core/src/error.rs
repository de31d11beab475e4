//! Error types for cdnsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Missing or invalid configuration. Always raised before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option was not supplied (or was empty).
    #[error("{0} is required")]
    Missing(&'static str),

    /// The CDN base URL lacks an `http://` or `https://` scheme.
    #[error("cdn: \"{0}\" must have http or https prefix")]
    InvalidCdn(String),

    /// The zone name does not map to a known regional endpoint.
    #[error("unknown zone '{0}'; expected one of: z0, z1, z2, na0, as0")]
    UnknownZone(String),

    /// A pattern filter failed to compile.
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A numeric tuning option was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// Underlying I/O failure while reading a config or manifest file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse options at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON parse error for a build manifest.
    #[error("failed to parse manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
