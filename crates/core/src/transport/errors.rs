use std::path::PathBuf;

use thiserror::Error;

// Errors raised while validating or loading congestion control configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window clamp {clamp} is below the minimum window of {min} segments")]
    WindowClampTooSmall { clamp: u32, min: u32 },

    #[error("{field} must be at least 1 segment, got {value}")]
    ZeroWindowParameter { field: &'static str, value: u32 },

    #[error("segment size must be non-zero")]
    ZeroSegmentSize,

    #[error("unknown congestion control algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("failed reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
