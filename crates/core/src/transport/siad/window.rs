//! Per-ACK window control.
//!
//! Runs the phase state machine that either applies a delay-triggered
//! additional decrease or a regular increase, and reclassifies the increase
//! rate for the next call. Everything here is in segments.

use super::config::{INITIAL_SSTHRESH, MIN_CWND};
use super::state::{ConnectionState, Phase};

/// Result of one window update, in segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowUpdate {
    pub cwnd: u32,
    pub ssthresh: u32,
}

impl ConnectionState {
    /// Update the window for a batch of `segments_acked` acknowledged segments.
    pub(crate) fn increase_window(
        &mut self,
        cwnd: u32,
        ssthresh: u32,
        segments_acked: u32,
    ) -> WindowUpdate {
        let mut ssthresh = ssthresh;
        if self.first_increase {
            self.first_increase = false;
            ssthresh = INITIAL_SSTHRESH;
        }

        // Slow start and sustained fast increase never trigger an additional decrease
        if cwnd > self.increase_threshold || cwnd < ssthresh {
            self.min_delay_seen = true;
        }

        let (mut cwnd, mut ssthresh) = match self.additional_decrease_target(cwnd, ssthresh) {
            Some(target) => {
                let cwnd = self.additional_decrease(target);
                self.phase = Phase::AdditionalDecrease;
                (cwnd, cwnd - 1)
            }
            None => {
                let cwnd = self.regular_increase(cwnd, ssthresh, segments_acked);
                self.phase = self.classify(cwnd, ssthresh);
                (cwnd, ssthresh)
            }
        };

        cwnd = cwnd.max(MIN_CWND);
        ssthresh = ssthresh.max(MIN_CWND);
        WindowUpdate { cwnd, ssthresh }
    }

    /// The delay-scaled window an additional decrease would start from, or
    /// `None` when this ACK does not qualify for one.
    fn additional_decrease_target(&self, cwnd: u32, ssthresh: u32) -> Option<u32> {
        let past_threshold = cwnd
            > ssthresh
                .saturating_add(self.increase_rate)
                .saturating_add(2);
        let budget_left = self.decrease_count < self.epoch_rtts.saturating_sub(1);
        if !past_threshold || self.min_delay_seen || !budget_left {
            return None;
        }
        self.delay.scale(ssthresh)
    }

    /// Apply one additional decrease starting from the delay-scaled window.
    fn additional_decrease(&mut self, scaled: u32) -> u32 {
        self.decrease_count += 1;
        self.cwnd_cnt = 0;
        let mut cwnd = scaled;
        let remaining = self.remaining_epoch_rtts();
        let headroom = self.increase_threshold.saturating_sub(cwnd);

        if cwnd > MIN_CWND {
            let rate_new = (headroom / remaining.saturating_sub(1).max(1)).max(1);
            let reduce = cwnd / remaining;
            let step = if reduce >= rate_new {
                self.increase_rate = (headroom / remaining).max(1);
                reduce
            } else {
                self.increase_rate = rate_new;
                rate_new
            };
            if cwnd > step.saturating_add(MIN_CWND) {
                cwnd -= step;
            } else {
                cwnd = MIN_CWND;
                self.min_delay_seen = true;
            }
        } else {
            cwnd = MIN_CWND;
            self.min_delay_seen = true;
            self.increase_rate = self.increase_threshold.saturating_sub(cwnd) / remaining;
        }

        // Never more than doubling per RTT
        if self.increase_rate > cwnd {
            self.increase_rate = cwnd;
            self.min_delay_seen = true;
        }
        self.increase_rate = self.increase_rate.max(1);

        tracing::debug!(
            scaled_cwnd = scaled,
            cwnd,
            decrease_count = self.decrease_count,
            epoch_rtts = self.epoch_rtts,
            increase_rate = self.increase_rate,
            "SIAD additional decrease"
        );
        cwnd
    }

    /// Regular increase: grow by `increase_rate` segments per window of ACKs.
    fn regular_increase(&mut self, cwnd: u32, ssthresh: u32, segments_acked: u32) -> u32 {
        self.cwnd_cnt = self.cwnd_cnt.saturating_add(segments_acked);
        if self.configured_epoch_rtts != 0 {
            self.epoch_rtts = self.configured_epoch_rtts;
        }

        let next = (cwnd / self.increase_rate.max(1)).max(1);
        if self.cwnd_cnt < next {
            return cwnd;
        }

        let n = self.cwnd_cnt / next;
        let mut cwnd = cwnd;
        if cwnd < self.window_clamp {
            let inc = segments_acked.min(n).min(self.window_clamp - cwnd);
            let prev = cwnd;
            cwnd += inc;
            self.increase_performed = true;
            self.reclassify_rate(prev, cwnd, ssthresh, inc);
        }
        self.cwnd_cnt -= n * next;
        cwnd
    }

    /// Pick the increase rate for the next call from the transition just crossed.
    fn reclassify_rate(&mut self, prev: u32, cwnd: u32, ssthresh: u32, inc: u32) {
        let incthresh = self.increase_threshold;
        let left_slow_start = cwnd >= ssthresh && prev < ssthresh;

        if left_slow_start && incthresh > ssthresh {
            self.increase_rate = ((incthresh - ssthresh) / self.epoch_rtts.max(1)).max(1);
            tracing::trace!(
                cwnd,
                increase_rate = self.increase_rate,
                "SIAD left slow start"
            );
        } else if left_slow_start || (cwnd >= incthresh && prev < incthresh) {
            self.increase_rate = 1;
            tracing::trace!(cwnd, incthresh, "SIAD entered fast increase");
        } else if cwnd > incthresh && self.increase_rate < cwnd / 2 {
            self.increase_rate += inc;
        } else if cwnd < ssthresh {
            self.increase_rate = cwnd;
        }
        self.increase_rate = self.increase_rate.max(1);
    }

    fn classify(&self, cwnd: u32, ssthresh: u32) -> Phase {
        if cwnd < ssthresh {
            Phase::SlowStart
        } else if cwnd > self.increase_threshold {
            Phase::FastIncrease
        } else {
            Phase::Increase
        }
    }
}
