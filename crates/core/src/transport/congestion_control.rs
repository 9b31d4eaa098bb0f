//! Congestion control interface for the transport layer.
//!
//! This module provides a pluggable interface for congestion control algorithms,
//! allowing selection between different algorithms via configuration.
//!
//! ## Design
//!
//! Every algorithm implements [`CongestionOps`], the callback contract the
//! transport drives once per ACK batch, once per congestion event and once
//! per completed window reduction. [`CongestionController`] dispatches over
//! the known algorithms with an enum rather than trait objects, so
//! algorithm-specific statistics stay reachable via pattern matching.
//!
//! ## Supported Algorithms
//!
//! - **SIAD** (default): Scalable Increase, Adaptive Decrease. Loss-based with
//!   delay-scaled decreases and an increase rate sized to refill the
//!   bottleneck in a fixed number of RTTs.
//! - **NewReno**: classic AIMD, used as the baseline.
//!
//! ## Usage
//!
//! ```ignore
//! use siad::transport::congestion_control::{CongestionControlConfig, CongestionOps};
//! use siad::transport::SocketState;
//!
//! let mut controller = CongestionControlConfig::default().build()?;
//! let mut tcb = SocketState::new(1448)?;
//!
//! // Per ACK batch: delay update first, then the window update
//! controller.on_ack(&tcb, 1, Duration::from_millis(50));
//! controller.increase_window(&mut tcb, 1);
//!
//! // Per congestion event
//! tcb.ssthresh = controller.on_congestion_event(&tcb, bytes_in_flight);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::new_reno::NewReno;
use super::siad::{SiadConfig, SiadController, SiadStats};
use super::socket_state::SocketState;

// =============================================================================
// Algorithm Identification
// =============================================================================

/// Identifies the congestion control algorithm in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionControlAlgorithm {
    /// Baseline AIMD.
    NewReno,
    /// Scalable Increase, Adaptive Decrease.
    #[default]
    Siad,
}

impl fmt::Display for CongestionControlAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CongestionControlAlgorithm::NewReno => write!(f, "NewReno"),
            CongestionControlAlgorithm::Siad => write!(f, "SIAD"),
        }
    }
}

impl FromStr for CongestionControlAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newreno" | "new-reno" => Ok(Self::NewReno),
            "siad" => Ok(Self::Siad),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

// =============================================================================
// Algorithm-Agnostic Statistics
// =============================================================================

/// Algorithm-agnostic congestion control statistics.
///
/// For algorithm-specific statistics, pattern match on the
/// [`CongestionController`] enum to access the native stats type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionControlStats {
    pub algorithm: CongestionControlAlgorithm,
    /// Current congestion window (bytes).
    pub cwnd: u32,
    /// Current slow start threshold (bytes).
    pub ssthresh: u32,
    /// Minimum observed delay, for delay-aware algorithms.
    pub min_delay: Option<Duration>,
    /// Peak congestion window reached (bytes), when tracked.
    pub peak_cwnd: Option<u32>,
    /// Congestion events handled, when tracked.
    pub congestion_events: Option<u64>,
}

// =============================================================================
// Congestion Control Trait
// =============================================================================

/// The callback contract every congestion control algorithm implements.
///
/// Calls for one connection must be serialized. For each ACK batch
/// [`on_ack`](Self::on_ack) runs before [`increase_window`](Self::increase_window),
/// and [`on_window_reduction_complete`](Self::on_window_reduction_complete)
/// only fires after the result of
/// [`on_congestion_event`](Self::on_congestion_event) has been applied.
pub trait CongestionOps {
    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;

    /// Delay update with the RTT sample of an ACK batch.
    fn on_ack(&mut self, tcb: &SocketState, segments_acked: u32, rtt: Duration);

    /// Window update for an ACK batch. Writes `cwnd` and `ssthresh` back to `tcb`.
    fn increase_window(&mut self, tcb: &mut SocketState, segments_acked: u32);

    /// A congestion event was detected. Returns the new slow start threshold in bytes.
    fn on_congestion_event(&mut self, tcb: &SocketState, bytes_in_flight: u32) -> u32;

    /// A previously signaled window reduction has fully taken effect.
    fn on_window_reduction_complete(&mut self, tcb: &SocketState);

    /// Independent copy for a connection derived from this one.
    fn fork(&self) -> Self
    where
        Self: Sized;
}

// =============================================================================
// Congestion Controller Enum (Dispatch)
// =============================================================================

/// Congestion controller that dispatches to the configured algorithm.
///
/// ## Example: Accessing Algorithm-Specific Stats
///
/// ```ignore
/// match &controller {
///     CongestionController::Siad(siad) => {
///         let stats = siad.stats(&tcb);
///         println!("Additional decreases: {}", stats.additional_decreases);
///     }
///     CongestionController::NewReno(_) => {}
/// }
/// ```
#[derive(Debug, Clone)]
pub enum CongestionController {
    NewReno(NewReno),
    Siad(Box<SiadController>),
}

impl CongestionOps for CongestionController {
    fn name(&self) -> &'static str {
        match self {
            Self::NewReno(c) => c.name(),
            Self::Siad(c) => c.name(),
        }
    }

    fn on_ack(&mut self, tcb: &SocketState, segments_acked: u32, rtt: Duration) {
        match self {
            Self::NewReno(c) => c.on_ack(tcb, segments_acked, rtt),
            Self::Siad(c) => c.on_ack(tcb, segments_acked, rtt),
        }
    }

    fn increase_window(&mut self, tcb: &mut SocketState, segments_acked: u32) {
        match self {
            Self::NewReno(c) => c.increase_window(tcb, segments_acked),
            Self::Siad(c) => c.increase_window(tcb, segments_acked),
        }
    }

    fn on_congestion_event(&mut self, tcb: &SocketState, bytes_in_flight: u32) -> u32 {
        match self {
            Self::NewReno(c) => c.on_congestion_event(tcb, bytes_in_flight),
            Self::Siad(c) => c.on_congestion_event(tcb, bytes_in_flight),
        }
    }

    fn on_window_reduction_complete(&mut self, tcb: &SocketState) {
        match self {
            Self::NewReno(c) => c.on_window_reduction_complete(tcb),
            Self::Siad(c) => c.on_window_reduction_complete(tcb),
        }
    }

    fn fork(&self) -> Self {
        match self {
            Self::NewReno(c) => Self::NewReno(c.fork()),
            Self::Siad(c) => Self::Siad(Box::new(c.fork())),
        }
    }
}

impl CongestionController {
    pub fn algorithm(&self) -> CongestionControlAlgorithm {
        match self {
            Self::NewReno(_) => CongestionControlAlgorithm::NewReno,
            Self::Siad(_) => CongestionControlAlgorithm::Siad,
        }
    }

    /// Returns algorithm-agnostic statistics.
    pub fn stats(&self, tcb: &SocketState) -> CongestionControlStats {
        match self {
            Self::NewReno(_) => CongestionControlStats {
                algorithm: CongestionControlAlgorithm::NewReno,
                cwnd: tcb.cwnd,
                ssthresh: tcb.ssthresh,
                min_delay: None,
                peak_cwnd: None,
                congestion_events: None,
            },
            Self::Siad(c) => {
                let s = c.stats(tcb);
                CongestionControlStats {
                    algorithm: CongestionControlAlgorithm::Siad,
                    cwnd: tcb.cwnd,
                    ssthresh: tcb.ssthresh,
                    min_delay: s.min_delay,
                    peak_cwnd: Some(tcb.segments_to_bytes(s.peak_cwnd)),
                    congestion_events: Some(s.congestion_events),
                }
            }
        }
    }

    /// Get SIAD-specific statistics if this is a SIAD controller.
    pub fn siad_stats(&self, tcb: &SocketState) -> Option<SiadStats> {
        match self {
            Self::Siad(c) => Some(c.stats(tcb)),
            Self::NewReno(_) => None,
        }
    }

    /// Get a mutable reference to the inner SIAD controller, e.g. for live
    /// parameter updates.
    pub fn as_siad_mut(&mut self) -> Option<&mut SiadController> {
        match self {
            Self::Siad(c) => Some(&mut **c),
            Self::NewReno(_) => None,
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for creating congestion controllers.
///
/// Deserializes from a `[congestion-control]` table:
///
/// ```toml
/// [congestion-control]
/// algorithm = "siad"
///
/// [congestion-control.siad]
/// epoch-rtts = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CongestionControlConfig {
    /// Which algorithm to use.
    pub algorithm: CongestionControlAlgorithm,
    /// SIAD parameters, ignored by other algorithms.
    pub siad: SiadConfig,
}

impl CongestionControlConfig {
    /// Create a new configuration for the specified algorithm with defaults.
    pub fn new(algorithm: CongestionControlAlgorithm) -> Self {
        Self {
            algorithm,
            siad: SiadConfig::default(),
        }
    }

    pub fn with_siad_config(mut self, siad: SiadConfig) -> Self {
        self.siad = siad;
        self
    }

    /// Validate the configuration and build a controller.
    pub fn build(&self) -> Result<CongestionController, ConfigError> {
        let controller = match self.algorithm {
            CongestionControlAlgorithm::NewReno => CongestionController::NewReno(NewReno::new()),
            CongestionControlAlgorithm::Siad => {
                CongestionController::Siad(Box::new(SiadController::new(self.siad.clone())?))
            }
        };
        tracing::debug!(algorithm = %self.algorithm, "Built congestion controller");
        Ok(controller)
    }
}
