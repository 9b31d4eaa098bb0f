//! SIAD congestion controller.
//!
//! Bridges the transport state, which accounts windows in bytes, and the
//! segment-based SIAD state machine.

use std::time::Duration;

use crate::transport::congestion_control::CongestionOps;
use crate::transport::errors::ConfigError;
use crate::transport::socket_state::SocketState;

use super::config::{validate_window_clamp, SiadConfig};
use super::state::{ConnectionState, Phase};
use super::stats::SiadStats;

/// SIAD (Scalable Increase, Adaptive Decrease) congestion controller.
///
/// Owned by exactly one connection and driven synchronously by it. For every
/// ACK batch the caller must invoke [`CongestionOps::on_ack`] before
/// [`CongestionOps::increase_window`], and only invoke
/// [`CongestionOps::on_window_reduction_complete`] after the threshold
/// returned by [`CongestionOps::on_congestion_event`] has been applied.
#[derive(Debug, Clone)]
pub struct SiadController {
    pub(crate) state: ConnectionState,
    peak_cwnd: u32,
    congestion_events: u64,
    additional_decreases: u64,
    epoch_resets: u64,
    drift_corrections: u64,
}

impl Default for SiadController {
    fn default() -> Self {
        Self::from_validated(&SiadConfig::default())
    }
}

impl SiadController {
    /// Create a controller for a newly established connection.
    pub fn new(config: SiadConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(&config))
    }

    fn from_validated(config: &SiadConfig) -> Self {
        Self {
            state: ConnectionState::new(config),
            peak_cwnd: 0,
            congestion_events: 0,
            additional_decreases: 0,
            epoch_resets: 0,
            drift_corrections: 0,
        }
    }

    /// Force the epoch length in RTTs (0 clears the override).
    pub fn set_epoch_rtts(&mut self, rtts: u32) {
        self.state.configured_epoch_rtts = rtts;
    }

    /// Force the epoch length in milliseconds (0 clears the override).
    pub fn set_epoch_ms(&mut self, ms: u32) {
        self.state.configured_epoch_ms = ms;
    }

    /// Change the window ceiling (segments).
    pub fn set_window_clamp(&mut self, segments: u32) -> Result<(), ConfigError> {
        validate_window_clamp(segments)?;
        self.state.window_clamp = segments;
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn stats(&self, tcb: &SocketState) -> SiadStats {
        let state = &self.state;
        SiadStats {
            cwnd: tcb.cwnd_in_segments(),
            ssthresh: tcb.ssthresh_in_segments(),
            increase_rate: state.increase_rate,
            increase_threshold: state.increase_threshold,
            prev_max_cwnd: state.prev_max_cwnd,
            epoch_rtts: state.epoch_rtts,
            decrease_count: state.decrease_count,
            phase: state.phase,
            min_delay: state.delay.min_delay(),
            epoch_min_delay: state.delay.curr_min_delay(),
            current_delay: state.delay.curr_delay(),
            peak_cwnd: self.peak_cwnd,
            congestion_events: self.congestion_events,
            additional_decreases: self.additional_decreases,
            epoch_resets: self.epoch_resets,
            drift_corrections: self.drift_corrections,
        }
    }
}

impl CongestionOps for SiadController {
    fn name(&self) -> &'static str {
        "SIAD"
    }

    fn on_ack(&mut self, tcb: &SocketState, _segments_acked: u32, rtt: Duration) {
        let state = &mut self.state;
        let deep_in_epoch = tcb.cwnd_in_segments()
            > tcb
                .ssthresh_in_segments()
                .saturating_add(state.increase_rate)
                .saturating_add(1);
        if state.delay.on_sample(rtt, deep_in_epoch) {
            state.min_delay_seen = true;
        }
        tracing::trace!(
            rtt_ms = u64::try_from(rtt.as_millis()).unwrap_or(u64::MAX),
            min_delay = ?state.delay.min_delay(),
            curr_delay = ?state.delay.curr_delay(),
            "SIAD delay sample"
        );
    }

    fn increase_window(&mut self, tcb: &mut SocketState, segments_acked: u32) {
        let update = self.state.increase_window(
            tcb.cwnd_in_segments(),
            tcb.ssthresh_in_segments(),
            segments_acked,
        );
        if self.state.phase == Phase::AdditionalDecrease {
            self.additional_decreases += 1;
        }
        tcb.set_cwnd_in_segments(update.cwnd);
        tcb.set_ssthresh_in_segments(update.ssthresh);
        self.peak_cwnd = self.peak_cwnd.max(update.cwnd);

        tracing::trace!(
            cwnd = update.cwnd,
            ssthresh = update.ssthresh,
            phase = %self.state.phase,
            increase_rate = self.state.increase_rate,
            "SIAD window update"
        );
    }

    fn on_congestion_event(&mut self, tcb: &SocketState, _bytes_in_flight: u32) -> u32 {
        let update = self
            .state
            .on_congestion_event(tcb.cwnd_in_segments(), tcb.ssthresh_in_segments());
        self.congestion_events += 1;
        if update.drift_corrected {
            self.drift_corrections += 1;
        }
        let ssthresh = tcb.segments_to_bytes(update.ssthresh);
        tracing::trace!(
            ssthresh,
            cwnd_max = tcb.segments_to_bytes(update.cwnd_max),
            congestion_events = self.congestion_events,
            "SIAD threshold applied"
        );
        ssthresh
    }

    fn on_window_reduction_complete(&mut self, _tcb: &SocketState) {
        self.state.reset_epoch();
        self.epoch_resets += 1;
        tracing::debug!(
            epoch_rtts = self.state.epoch_rtts,
            increase_threshold = self.state.increase_threshold,
            "SIAD epoch reset"
        );
    }

    fn fork(&self) -> Self {
        Self {
            state: self.state.clone(),
            peak_cwnd: 0,
            congestion_events: 0,
            additional_decreases: 0,
            epoch_resets: 0,
            drift_corrections: 0,
        }
    }
}
