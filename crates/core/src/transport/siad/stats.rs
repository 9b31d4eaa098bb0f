//! SIAD statistics snapshot.

use std::time::Duration;

use super::state::Phase;

/// Snapshot of a SIAD connection for telemetry and debugging.
///
/// Windows are in segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiadStats {
    /// Current congestion window.
    pub cwnd: u32,
    /// Current slow start threshold.
    pub ssthresh: u32,
    /// Segments added per RTT in the current phase.
    pub increase_rate: u32,
    /// Target window for the current epoch.
    pub increase_threshold: u32,
    /// Window estimate at the previous congestion event.
    pub prev_max_cwnd: u32,
    /// Effective epoch length in RTTs.
    pub epoch_rtts: u32,
    /// Additional decreases applied in the current epoch.
    pub decrease_count: u32,
    pub phase: Phase,
    /// Minimum observed delay, if any sample was taken.
    pub min_delay: Option<Duration>,
    /// Minimum delay seen in the current epoch.
    pub epoch_min_delay: Option<Duration>,
    /// Filtered current delay.
    pub current_delay: Option<Duration>,
    /// Largest window reached during the controller lifetime.
    pub peak_cwnd: u32,
    pub congestion_events: u64,
    pub additional_decreases: u64,
    pub epoch_resets: u64,
    /// Times the minimum delay was reset after drifting upwards.
    pub drift_corrections: u64,
}
