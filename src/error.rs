//! Error types for detector configuration and sample sources.
//!
//! Nothing on the per-sample path returns an error: bad samples degrade to
//! "not shaking" for that tick. Errors only surface at configuration time
//! and when reading recorded streams.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("unknown sensitivity {0:?} (expected low, medium or high)")]
    UnknownSensitivity(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file malformed: {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sample source I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern segment {0:?} (expected still:<ms> or shake:<ms>)")]
    InvalidSegment(String),

    #[error("pattern longer than {max_ms}ms")]
    PatternTooLong { max_ms: u64 },
}
