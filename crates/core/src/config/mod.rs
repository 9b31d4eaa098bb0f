use std::path::Path;
#[cfg(feature = "trace")]
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::transport::{
    CongestionControlConfig, CongestionController, ConfigError, SocketState,
    DEFAULT_INITIAL_WINDOW,
};

/// Segment size used when none is configured (bytes).
pub const DEFAULT_SEGMENT_SIZE: u32 = 1448;

/// Top-level configuration, loadable from TOML.
///
/// ```toml
/// log-level = "debug"
/// segment-size = 1448
/// initial-window = 10
///
/// [congestion-control]
/// algorithm = "siad"
///
/// [congestion-control.siad]
/// epoch-ms = 2000
/// window-clamp = 400
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    #[serde(with = "serde_log_level_filter")]
    pub log_level: LevelFilter,
    /// Segment size (bytes).
    pub segment_size: u32,
    /// Initial congestion window (segments). Seeds both the transport state
    /// and the SIAD state.
    pub initial_window: u32,
    pub congestion_control: CongestionControlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            segment_size: DEFAULT_SEGMENT_SIZE,
            initial_window: DEFAULT_INITIAL_WINDOW,
            congestion_control: CongestionControlConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Transport state for a new connection.
    pub fn socket_state(&self) -> Result<SocketState, ConfigError> {
        SocketState::with_initial_window(self.segment_size, self.initial_window)
    }

    /// Congestion controller for a new connection.
    pub fn congestion_controller(&self) -> Result<CongestionController, ConfigError> {
        let mut cc = self.congestion_control.clone();
        cc.siad.initial_window = self.initial_window;
        cc.build()
    }
}

mod serde_log_level_filter {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::level_filters::LevelFilter;

    pub fn serialize<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&level.to_string().to_lowercase())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = String::deserialize(deserializer)?;
        level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| serde::de::Error::custom(format!("unknown log level: {level}")))
    }
}

/// Install the global tracing subscriber once. Later calls are no-ops.
pub fn set_logger(level: Option<LevelFilter>) {
    #[cfg(feature = "trace")]
    {
        static LOGGER_SET: AtomicBool = AtomicBool::new(false);
        if LOGGER_SET
            .compare_exchange(
                false,
                true,
                std::sync::atomic::Ordering::Release,
                std::sync::atomic::Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        if let Err(err) = crate::tracing::tracer::init_tracer(level) {
            eprintln!("failed tracing initialization: {err}");
        }
    }
    #[cfg(not(feature = "trace"))]
    let _ = level;
}
