//! Delay tracking for SIAD.
//!
//! Keeps a one-sample-lag filtered current delay, the all-time and per-epoch
//! minimum delays, and a three slot history of previous minima used to detect
//! a minimum that keeps creeping upwards (measurement drift).
//!
//! Delays are tracked in whole milliseconds.

use std::time::Duration;

/// Sentinel for a delay that has not been measured yet.
pub(crate) const UNKNOWN_DELAY: u64 = u64::MAX;

/// Number of previous minima remembered for drift detection.
const PRIOR_MIN_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DelayTracker {
    /// Most recent raw sample
    prev_delay: u64,
    /// min(latest sample, previous sample)
    curr_delay: u64,
    /// All-time minimum, except after a drift correction
    min_delay: u64,
    /// Minimum since the start of the current epoch
    curr_min_delay: u64,
    /// Previous minima, 0 = empty slot
    prior_min: [u64; PRIOR_MIN_SLOTS],
}

impl Default for DelayTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayTracker {
    pub(crate) fn new() -> Self {
        Self {
            prev_delay: UNKNOWN_DELAY,
            curr_delay: UNKNOWN_DELAY,
            min_delay: UNKNOWN_DELAY,
            curr_min_delay: UNKNOWN_DELAY,
            prior_min: [0; PRIOR_MIN_SLOTS],
        }
    }

    /// Feed one RTT sample.
    ///
    /// `deep_in_epoch` tells whether the window is far enough past ssthresh
    /// that a repeated near-minimum sample should replace the all-time minimum.
    ///
    /// Returns `true` when a (new) minimum delay was seen.
    pub(crate) fn on_sample(&mut self, rtt: Duration, deep_in_epoch: bool) -> bool {
        let delay = u64::try_from(rtt.as_millis())
            .unwrap_or(UNKNOWN_DELAY)
            .min(UNKNOWN_DELAY - 1);
        self.curr_delay = delay.min(self.prev_delay);
        self.prev_delay = delay;

        if delay <= self.min_delay {
            self.min_delay = delay;
            self.curr_min_delay = delay;
            true
        } else if delay <= self.curr_min_delay {
            self.curr_min_delay = delay;
            // Still seeing this minimum well into the epoch, so the path's
            // minimum has moved.
            if deep_in_epoch {
                self.min_delay = delay;
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    /// Track monotonically increasing minima across congestion events.
    ///
    /// Returns `true` when three consecutive increases were followed by a
    /// fourth, in which case the minimum is reset to the oldest recorded value.
    pub(crate) fn detect_drift(&mut self) -> bool {
        if self.min_delay == UNKNOWN_DELAY {
            return false;
        }
        let min = self.min_delay;
        let [p1, p2, p3] = self.prior_min;

        if min < p1 || min < p2 || min < p3 {
            self.prior_min = [0; PRIOR_MIN_SLOTS];
        } else if min > p1 {
            if p1 == 0 {
                self.prior_min[0] = min;
            } else if p2 == 0 {
                self.prior_min[1] = min;
            } else if min > p2 {
                if p3 == 0 {
                    self.prior_min[2] = min;
                } else if min > p3 {
                    tracing::warn!(
                        min_delay_ms = min,
                        reset_to_ms = p1,
                        "SIAD minimum delay kept increasing, resetting to oldest minimum"
                    );
                    self.min_delay = p1;
                    self.prior_min[1] = 0;
                    self.prior_min[2] = 0;
                    return true;
                }
            }
        }
        false
    }

    /// Scale `value` by `min_delay / curr_delay`.
    ///
    /// Returns `None` while either delay is unknown or the current delay is zero.
    pub(crate) fn scale(&self, value: u32) -> Option<u32> {
        let curr = self.curr_delay_nonzero()?;
        if self.min_delay == UNKNOWN_DELAY {
            return None;
        }
        let scaled = u128::from(self.min_delay) * u128::from(value) / u128::from(curr);
        Some(u32::try_from(scaled).unwrap_or(u32::MAX))
    }

    /// Average of the current and minimum delay, when both are known and non-zero.
    pub(crate) fn average_delay(&self) -> Option<u64> {
        let curr = self.curr_delay_nonzero()?;
        if self.min_delay == UNKNOWN_DELAY {
            return None;
        }
        let min = self.min_delay;
        let avg = curr / 2 + min / 2 + (curr & min & 1);
        (avg != 0).then_some(avg)
    }

    /// The filtered current delay when it can be used as a divisor.
    pub(crate) fn curr_delay_nonzero(&self) -> Option<u64> {
        match self.curr_delay {
            UNKNOWN_DELAY | 0 => None,
            d => Some(d),
        }
    }

    /// Start a new epoch: forget the per-epoch minimum.
    pub(crate) fn reset_epoch(&mut self) {
        self.curr_min_delay = UNKNOWN_DELAY;
    }

    pub(crate) fn min_delay(&self) -> Option<Duration> {
        as_duration(self.min_delay)
    }

    pub(crate) fn curr_delay(&self) -> Option<Duration> {
        as_duration(self.curr_delay)
    }

    pub(crate) fn curr_min_delay(&self) -> Option<Duration> {
        as_duration(self.curr_min_delay)
    }

    #[cfg(test)]
    pub(crate) fn prev_delay(&self) -> Option<Duration> {
        as_duration(self.prev_delay)
    }

    #[cfg(test)]
    pub(crate) fn prior_minima(&self) -> [u64; PRIOR_MIN_SLOTS] {
        self.prior_min
    }

    #[cfg(test)]
    pub(crate) fn set_min_delay_ms(&mut self, ms: u64) {
        self.min_delay = ms;
    }
}

fn as_duration(ms: u64) -> Option<Duration> {
    (ms != UNKNOWN_DELAY).then(|| Duration::from_millis(ms))
}
