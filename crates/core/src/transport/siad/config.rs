//! SIAD configuration and constants.
//!
//! This module contains the configuration struct and the fixed tuning
//! constants of the SIAD congestion control algorithm. All window values
//! are expressed in segments.

use serde::{Deserialize, Serialize};

use crate::transport::errors::ConfigError;
use crate::transport::socket_state::DEFAULT_INITIAL_WINDOW;

/// Epoch length (in RTTs) used when nothing is configured, and the floor
/// applied to a millisecond-derived epoch length.
pub(crate) const DEFAULT_EPOCH_RTTS: u32 = 20;

/// Minimum congestion window (segments). Both cwnd and ssthresh are floored here.
pub(crate) const MIN_CWND: u32 = 2;

/// Slow start threshold forced on the first window increase (segments).
pub(crate) const INITIAL_SSTHRESH: u32 = 20;

/// Hard ceiling on the congestion window (segments).
pub(crate) const DEFAULT_WINDOW_CLAMP: u32 = 666;

/// Configuration for a SIAD connection.
///
/// Zero values for `epoch_rtts` and `epoch_ms` mean "unset". When both are
/// unset the epoch length falls back to [`DEFAULT_EPOCH_RTTS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiadConfig {
    /// Explicit epoch length in RTTs (0 = unset). Takes precedence over `epoch_ms`.
    pub epoch_rtts: u32,
    /// Explicit epoch length in milliseconds (0 = unset).
    ///
    /// Converted to RTTs on every congestion event using the average of the
    /// current and minimum delay, and never shorter than the default epoch.
    pub epoch_ms: u32,
    /// Initial window (segments). Seeds the increase rate, the increase
    /// threshold and the previous maximum window.
    pub initial_window: u32,
    /// Override for the initial increase rate (segments per RTT).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increase_rate: Option<u32>,
    /// Override for the initial increase threshold (segments).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increase_threshold: Option<u32>,
    /// Congestion window ceiling (segments).
    pub window_clamp: u32,
}

impl Default for SiadConfig {
    fn default() -> Self {
        Self {
            epoch_rtts: 0,
            epoch_ms: 0,
            initial_window: DEFAULT_INITIAL_WINDOW,
            increase_rate: None,
            increase_threshold: None,
            window_clamp: DEFAULT_WINDOW_CLAMP,
        }
    }
}

impl SiadConfig {
    /// Set the explicit epoch length in RTTs.
    pub fn with_epoch_rtts(mut self, rtts: u32) -> Self {
        self.epoch_rtts = rtts;
        self
    }

    /// Set the explicit epoch length in milliseconds.
    pub fn with_epoch_ms(mut self, ms: u32) -> Self {
        self.epoch_ms = ms;
        self
    }

    /// Set the initial window.
    pub fn with_initial_window(mut self, segments: u32) -> Self {
        self.initial_window = segments;
        self
    }

    /// Set the congestion window ceiling.
    pub fn with_window_clamp(mut self, segments: u32) -> Self {
        self.window_clamp = segments;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_window_clamp(self.window_clamp)?;
        if self.initial_window == 0 {
            return Err(ConfigError::ZeroWindowParameter {
                field: "initial-window",
                value: 0,
            });
        }
        if let Some(rate @ 0) = self.increase_rate {
            return Err(ConfigError::ZeroWindowParameter {
                field: "increase-rate",
                value: rate,
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_window_clamp(clamp: u32) -> Result<(), ConfigError> {
    if clamp < MIN_CWND {
        return Err(ConfigError::WindowClampTooSmall {
            clamp,
            min: MIN_CWND,
        });
    }
    Ok(())
}
