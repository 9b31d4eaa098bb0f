//! Congestion event handling: the new slow start threshold, the increase
//! threshold for the next epoch and the increase rate needed to reach it.

use super::config::MIN_CWND;
use super::state::ConnectionState;

/// Outcome of a congestion event, in segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThresholdUpdate {
    pub ssthresh: u32,
    /// Window estimate at the congestion event
    pub cwnd_max: u32,
    pub drift_corrected: bool,
}

impl ConnectionState {
    /// Compute the new slow start threshold for a congestion event detected
    /// at window `cwnd` with slow start threshold `ssthresh`.
    pub(crate) fn on_congestion_event(&mut self, cwnd: u32, ssthresh: u32) -> ThresholdUpdate {
        self.cwnd_cnt = 0;
        let cwnd_max = if self.increase_performed {
            self.backdate_window(cwnd, ssthresh)
        } else {
            cwnd
        };

        let drift_corrected = self.delay.detect_drift();
        let ssthresh = self
            .delay
            .scale(cwnd_max)
            .unwrap_or(cwnd_max / 2)
            .max(MIN_CWND);

        self.refresh_epoch_rtts();

        let target = 2 * u64::from(cwnd_max);
        self.increase_threshold = if u64::from(self.prev_max_cwnd) < target {
            let extrapolated = target - u64::from(self.prev_max_cwnd);
            u32::try_from(extrapolated)
                .unwrap_or(u32::MAX)
                .max(ssthresh)
        } else {
            ssthresh
        };

        self.increase_rate = match self.delay.curr_delay_nonzero() {
            Some(curr) => {
                let headroom = u64::from(self.increase_threshold.saturating_sub(ssthresh));
                u32::try_from(headroom / curr).unwrap_or(u32::MAX).max(1)
            }
            None => 1,
        };
        self.prev_max_cwnd = cwnd_max;

        tracing::debug!(
            cwnd,
            cwnd_max,
            ssthresh,
            incthresh = self.increase_threshold,
            increase_rate = self.increase_rate,
            epoch_rtts = self.epoch_rtts,
            "SIAD congestion event"
        );

        ThresholdUpdate {
            ssthresh,
            cwnd_max,
            drift_corrected,
        }
    }

    /// Estimate the window at the moment the congestion occurred, about one
    /// RTT before it was detected, by undoing the last RTT's increase.
    fn backdate_window(&self, cwnd: u32, ssthresh: u32) -> u32 {
        let rate = self.increase_rate;
        let incthresh = self.increase_threshold;

        if rate == 1 && cwnd >= incthresh && incthresh > ssthresh {
            cwnd.saturating_sub((incthresh - ssthresh) / self.epoch_rtts.max(1))
        } else if rate >= cwnd / 2 && cwnd > incthresh {
            cwnd.saturating_sub(cwnd / 3)
        } else if rate >= cwnd && cwnd <= ssthresh {
            cwnd / 2
        } else if (cwnd > incthresh || cwnd < ssthresh) && rate != 1 {
            cwnd.saturating_sub(rate / 2)
        } else {
            cwnd.saturating_sub(rate)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::siad::config::SiadConfig;

    fn state_with_delays(samples: &[u64]) -> ConnectionState {
        let mut state = ConnectionState::new(&SiadConfig::default());
        for &ms in samples {
            state.delay.on_sample(Duration::from_millis(ms), false);
        }
        state
    }

    #[test]
    fn test_halves_without_delay_information() {
        let mut state = state_with_delays(&[]);
        let update = state.on_congestion_event(40, 20);
        assert_eq!(update.cwnd_max, 40);
        assert_eq!(update.ssthresh, 20);
        // prev_max 10 < 80: incthresh = 80 - 10
        assert_eq!(state.increase_threshold, 70);
        assert_eq!(state.increase_rate, 1);
        assert_eq!(state.prev_max_cwnd, 40);
        assert_eq!(state.cwnd_cnt, 0);
    }

    #[test]
    fn test_delay_ratio_threshold() {
        let mut state = state_with_delays(&[50, 100, 100]);
        let update = state.on_congestion_event(40, 20);
        // 50 * 40 / 100
        assert_eq!(update.ssthresh, 20);
        assert_eq!(state.increase_threshold, 70);
        // (70 - 20) / 100 ms floors to 0, raised to 1
        assert_eq!(state.increase_rate, 1);

        let mut state = state_with_delays(&[1, 2, 2]);
        let update = state.on_congestion_event(40, 20);
        assert_eq!(update.ssthresh, 20);
        // (70 - 20) / 2
        assert_eq!(state.increase_rate, 25);
    }

    #[test]
    fn test_threshold_floored_at_min_window() {
        let mut state = state_with_delays(&[1, 100, 100]);
        let update = state.on_congestion_event(50, 20);
        assert_eq!(update.ssthresh, MIN_CWND);

        let mut state = state_with_delays(&[]);
        let update = state.on_congestion_event(3, 20);
        assert_eq!(update.ssthresh, MIN_CWND);
    }

    #[test]
    fn test_shrinking_maximum_uses_ssthresh() {
        let mut state = state_with_delays(&[]);
        state.prev_max_cwnd = 100;
        let update = state.on_congestion_event(40, 20);
        assert_eq!(update.ssthresh, 20);
        assert_eq!(state.increase_threshold, 20);
        assert_eq!(state.prev_max_cwnd, 40);
    }

    #[test]
    fn test_backdating_by_phase() {
        let mut state = state_with_delays(&[]);
        state.increase_performed = true;

        // Just entered fast increase
        state.increase_rate = 1;
        state.increase_threshold = 60;
        assert_eq!(state.backdate_window(60, 20), 58);

        // Saturated fast increase
        state.increase_rate = 30;
        state.increase_threshold = 50;
        assert_eq!(state.backdate_window(60, 20), 40);

        // Saturated slow start
        state.increase_rate = 16;
        assert_eq!(state.backdate_window(16, 20), 8);

        // Slow start in progress
        state.increase_rate = 6;
        assert_eq!(state.backdate_window(16, 20), 13);

        // Regular increase
        state.increase_rate = 4;
        assert_eq!(state.backdate_window(40, 20), 36);
    }

    #[test]
    fn test_backdating_applies_only_after_an_increase() {
        let mut state = state_with_delays(&[]);
        state.increase_rate = 4;
        state.increase_threshold = 60;
        assert_eq!(state.on_congestion_event(40, 20).cwnd_max, 40);

        let mut state = state_with_delays(&[]);
        state.increase_rate = 4;
        state.increase_threshold = 60;
        state.increase_performed = true;
        assert_eq!(state.on_congestion_event(40, 20).cwnd_max, 36);
    }

    #[test]
    fn test_epoch_recomputed_from_milliseconds() {
        let mut state = ConnectionState::new(&SiadConfig::default().with_epoch_ms(6000));
        for ms in [100, 100, 100] {
            state.delay.on_sample(Duration::from_millis(ms), false);
        }
        state.on_congestion_event(40, 20);
        assert_eq!(state.epoch_rtts, 60);
    }
}
