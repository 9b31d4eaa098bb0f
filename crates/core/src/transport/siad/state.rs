//! Per-connection SIAD state.
//!
//! [`ConnectionState`] is the mutable record threaded through the delay
//! tracker, the window controller and the threshold estimator. It is owned by
//! exactly one connection and deep-copied when a connection is forked.

use std::fmt;

use super::config::{SiadConfig, DEFAULT_EPOCH_RTTS};
use super::delay::DelayTracker;

/// The phase of the control loop, as decided by the window controller.
///
/// ```text
///            cwnd >= ssthresh              cwnd >= incthresh
/// SlowStart ─────────────────▶ Increase ─────────────────────▶ FastIncrease
///     ▲                          │  ▲                               │
///     │                 no min   │  │ decrease applied              │
///     │                 delay    ▼  │                               │
///     │                   AdditionalDecrease                        │
///     └──────────────── congestion event (ssthresh recomputed) ◀────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Window below ssthresh: the increase rate tracks the window.
    SlowStart,
    /// Window between ssthresh and the increase threshold: a constant
    /// number of segments per RTT, sized to reach the threshold in one epoch.
    Increase,
    /// Window past the increase threshold: the increase rate itself grows.
    FastIncrease,
    /// Delay-triggered decrease between loss events.
    AdditionalDecrease,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SlowStart => write!(f, "slow-start"),
            Phase::Increase => write!(f, "increase"),
            Phase::FastIncrease => write!(f, "fast-increase"),
            Phase::AdditionalDecrease => write!(f, "additional-decrease"),
        }
    }
}

/// Mutable per-connection record. All windows are in segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    /// Externally forced epoch length in RTTs (0 = unset)
    pub(crate) configured_epoch_rtts: u32,
    /// Externally forced epoch length in milliseconds (0 = unset)
    pub(crate) configured_epoch_ms: u32,
    /// Effective epoch length
    pub(crate) epoch_rtts: u32,
    /// Segments added per RTT in the current phase (alpha)
    pub(crate) increase_rate: u32,
    /// Target window for the upcoming epoch (incthresh)
    pub(crate) increase_threshold: u32,
    /// Window estimate backdated to the previous congestion event
    pub(crate) prev_max_cwnd: u32,
    /// Additional decreases applied in this epoch
    pub(crate) decrease_count: u32,
    pub(crate) min_delay_seen: bool,
    pub(crate) increase_performed: bool,
    /// Fractional increase accumulator
    pub(crate) cwnd_cnt: u32,
    pub(crate) window_clamp: u32,
    pub(crate) delay: DelayTracker,
    pub(crate) first_increase: bool,
    /// Phase taken by the last window update
    pub(crate) phase: Phase,
}

impl ConnectionState {
    /// Create the state for a newly established connection.
    ///
    /// The configuration must already be validated.
    pub(crate) fn new(config: &SiadConfig) -> Self {
        let initial = config.initial_window;
        let mut state = Self {
            configured_epoch_rtts: config.epoch_rtts,
            configured_epoch_ms: config.epoch_ms,
            epoch_rtts: DEFAULT_EPOCH_RTTS,
            increase_rate: config.increase_rate.unwrap_or(initial).max(1),
            increase_threshold: config.increase_threshold.unwrap_or(initial),
            prev_max_cwnd: initial,
            decrease_count: 0,
            min_delay_seen: true,
            increase_performed: false,
            cwnd_cnt: 0,
            window_clamp: config.window_clamp,
            delay: DelayTracker::new(),
            first_increase: true,
            phase: Phase::SlowStart,
        };
        state.refresh_epoch_rtts();
        state
    }

    /// Re-derive the epoch length from configuration precedence:
    /// explicit RTT count, then explicit milliseconds over the average delay
    /// (never below the default), then the default.
    pub(crate) fn refresh_epoch_rtts(&mut self) {
        self.epoch_rtts = if self.configured_epoch_rtts != 0 {
            self.configured_epoch_rtts
        } else if let Some(avg) = (self.configured_epoch_ms != 0)
            .then(|| self.delay.average_delay())
            .flatten()
        {
            let rtts = u64::from(self.configured_epoch_ms) / avg;
            u32::try_from(rtts)
                .unwrap_or(u32::MAX)
                .max(DEFAULT_EPOCH_RTTS)
        } else {
            DEFAULT_EPOCH_RTTS
        };
    }

    /// Epoch boundary: a signaled window reduction has fully taken effect.
    pub(crate) fn reset_epoch(&mut self) {
        self.delay.reset_epoch();
        self.decrease_count = 0;
        self.min_delay_seen = false;
        self.increase_performed = false;
    }

    /// Remaining RTTs in the epoch after the decreases applied so far, never zero.
    pub(crate) fn remaining_epoch_rtts(&self) -> u32 {
        self.epoch_rtts.saturating_sub(self.decrease_count).max(1)
    }
}
