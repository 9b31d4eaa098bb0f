use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::transport::congestion_control::CongestionOps;
use crate::transport::socket_state::SocketState;

use super::config::{SiadConfig, DEFAULT_EPOCH_RTTS, MIN_CWND};
use super::controller::SiadController;
use super::state::Phase;

const SEGMENT: u32 = 1000;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn tcb(cwnd: u32, ssthresh: u32) -> SocketState {
    let mut tcb = SocketState::new(SEGMENT).unwrap();
    tcb.set_cwnd_in_segments(cwnd);
    tcb.set_ssthresh_in_segments(ssthresh);
    tcb
}

// ============================================================================
// Deterministic Test Harness
// ============================================================================

/// Drives a controller through randomized ACK, loss and recovery events in
/// the order a transport connection would.
struct SiadTestHarness {
    controller: SiadController,
    tcb: SocketState,
    rng: SmallRng,
    base_rtt: u64,
}

impl SiadTestHarness {
    fn new(config: SiadConfig, base_rtt: u64, seed: u64) -> Self {
        Self {
            controller: SiadController::new(config).unwrap(),
            tcb: SocketState::new(SEGMENT).unwrap(),
            rng: SmallRng::seed_from_u64(seed),
            base_rtt,
        }
    }

    fn ack(&mut self, rtt: Duration, segments: u32) {
        self.controller.on_ack(&self.tcb, segments, rtt);
        self.controller.increase_window(&mut self.tcb, segments);
    }

    fn loss(&mut self) {
        let in_flight = self.tcb.cwnd;
        let ssthresh = self.controller.on_congestion_event(&self.tcb, in_flight);
        self.tcb.ssthresh = ssthresh;
        self.tcb.cwnd = ssthresh;
    }

    fn recovered(&mut self) {
        self.controller.on_window_reduction_complete(&self.tcb);
    }

    /// One random event. RTT samples carry up to 3x queuing delay.
    fn step(&mut self) {
        match self.rng.gen_range(0..100) {
            0..=3 => self.loss(),
            4..=7 => self.recovered(),
            _ => {
                let rtt = self.rng.gen_range(self.base_rtt..=self.base_rtt * 3);
                let segments = self.rng.gen_range(1..=10);
                self.ack(ms(rtt), segments);
            }
        }
    }

    fn assert_invariants(&self) {
        let state = &self.controller.state;
        assert!(state.increase_rate >= 1, "increase rate {}", state.increase_rate);
        assert!(self.tcb.cwnd_in_segments() >= MIN_CWND);
        assert!(self.tcb.ssthresh_in_segments() >= MIN_CWND);
        assert!(state.window_clamp >= MIN_CWND);
        assert!(
            state.decrease_count <= state.epoch_rtts.saturating_sub(1),
            "decrease count {} in a {} RTT epoch",
            state.decrease_count,
            state.epoch_rtts
        );
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test_log::test]
fn test_first_increase_forces_ssthresh() {
    let mut controller = SiadController::default();
    let mut tcb = tcb(10, 10);

    controller.increase_window(&mut tcb, 1);

    assert_eq!(tcb.ssthresh, 20 * SEGMENT);
    // Slow start from the initial increase rate of 10: one segment per ACK
    assert_eq!(tcb.cwnd, 11 * SEGMENT);
    assert_eq!(controller.phase(), Phase::SlowStart);
    assert_eq!(controller.state.increase_rate, 11);
}

#[test]
fn test_higher_sample_leaves_minima_alone() {
    let mut controller = SiadController::default();
    let tcb = tcb(10, 10);
    for _ in 0..3 {
        controller.on_ack(&tcb, 1, ms(50));
    }
    controller.on_ack(&tcb, 1, ms(80));

    let delay = &controller.state.delay;
    assert_eq!(delay.min_delay(), Some(ms(50)));
    assert_eq!(delay.curr_min_delay(), Some(ms(50)));
    assert_eq!(delay.curr_delay(), Some(ms(50)));
}

#[test]
fn test_epoch_minimum_promoted_only_deep_in_epoch() {
    let mut controller = SiadController::default();
    let shallow = tcb(10, 10);
    for _ in 0..3 {
        controller.on_ack(&shallow, 1, ms(50));
    }
    controller.on_window_reduction_complete(&shallow);

    // cwnd 10 is not past ssthresh + rate + 1
    controller.on_ack(&shallow, 1, ms(80));
    assert_eq!(controller.state.delay.min_delay(), Some(ms(50)));
    assert_eq!(controller.state.delay.curr_min_delay(), Some(ms(80)));
    assert!(!controller.state.min_delay_seen);

    // cwnd 40 is past 20 + 10 + 1
    let deep = tcb(40, 20);
    controller.on_ack(&deep, 1, ms(80));
    assert_eq!(controller.state.delay.min_delay(), Some(ms(80)));
    assert!(controller.state.min_delay_seen);
}

fn controller_in_increase_phase(min_rtt: u64, curr_rtt: u64) -> SiadController {
    let mut controller = SiadController::default();
    let tcb = tcb(100, 50);
    controller.on_ack(&tcb, 1, ms(min_rtt));
    controller.on_ack(&tcb, 1, ms(curr_rtt));
    controller.on_ack(&tcb, 1, ms(curr_rtt));

    let state = &mut controller.state;
    state.first_increase = false;
    state.min_delay_seen = false;
    state.increase_rate = 10;
    state.increase_threshold = 120;
    state.decrease_count = 0;
    assert_eq!(state.epoch_rtts, DEFAULT_EPOCH_RTTS);
    controller
}

#[test_log::test]
fn test_additional_decrease_from_delay_ratio() {
    let mut controller = controller_in_increase_phase(25, 100);
    let mut tcb = tcb(100, 50);

    controller.increase_window(&mut tcb, 1);

    // 25 * 50 / 100 = 12, then one step of the new rate (120 - 12) / 18 = 6
    assert_eq!(controller.phase(), Phase::AdditionalDecrease);
    assert_eq!(tcb.cwnd_in_segments(), 6);
    assert_eq!(tcb.ssthresh_in_segments(), 5);
    assert_eq!(controller.state.increase_rate, 6);
    assert_eq!(controller.state.decrease_count, 1);
    assert_eq!(controller.stats(&tcb).additional_decreases, 1);
}

#[test]
fn test_additional_decrease_clamps_to_min_window() {
    let mut controller = controller_in_increase_phase(1, 100);
    let mut tcb = tcb(100, 50);

    controller.increase_window(&mut tcb, 1);

    assert_eq!(controller.phase(), Phase::AdditionalDecrease);
    assert_eq!(tcb.cwnd_in_segments(), MIN_CWND);
    assert_eq!(tcb.ssthresh_in_segments(), MIN_CWND);
    assert!(controller.state.min_delay_seen);

    // No further decreases this epoch
    controller.increase_window(&mut tcb, 1);
    assert_ne!(controller.phase(), Phase::AdditionalDecrease);
    assert_eq!(controller.state.decrease_count, 1);
}

#[test_log::test]
fn test_drift_correction_after_rising_minima() {
    let mut controller = SiadController::default();
    let tcb = tcb(40, 20);

    for min in [10, 20, 30] {
        controller.state.delay.set_min_delay_ms(min);
        controller.on_congestion_event(&tcb, tcb.cwnd);
    }
    assert_eq!(controller.state.delay.prior_minima(), [10, 20, 30]);
    assert_eq!(controller.stats(&tcb).drift_corrections, 0);

    controller.state.delay.set_min_delay_ms(40);
    controller.on_congestion_event(&tcb, tcb.cwnd);

    assert_eq!(controller.state.delay.min_delay(), Some(ms(10)));
    assert_eq!(controller.state.delay.prior_minima(), [10, 0, 0]);
    assert_eq!(controller.stats(&tcb).drift_corrections, 1);
}

// ============================================================================
// Congestion events and epochs
// ============================================================================

#[test]
fn test_congestion_event_is_idempotent_without_acks() {
    let mut controller = SiadController::default();
    let tcb = tcb(40, 20);
    for rtt in [50, 100, 100] {
        controller.on_ack(&tcb, 1, ms(rtt));
    }

    let first = controller.on_congestion_event(&tcb, tcb.cwnd);
    let prev_max = controller.state.prev_max_cwnd;
    let second = controller.on_congestion_event(&tcb, tcb.cwnd);

    assert_eq!(first, second);
    assert_eq!(first, 20 * SEGMENT);
    assert_eq!(controller.state.prev_max_cwnd, prev_max);
}

#[test]
fn test_congestion_event_with_extreme_rtt_clamps() {
    let mut controller = SiadController::default();
    let tcb = tcb(40, 20);
    controller.on_ack(&tcb, 1, ms(u64::MAX - 1));

    // Equal minimum and current delay, nothing to scale away
    assert_eq!(controller.on_congestion_event(&tcb, tcb.cwnd), 40 * SEGMENT);
    assert_eq!(controller.stats(&tcb).epoch_rtts, DEFAULT_EPOCH_RTTS);

    controller.set_epoch_ms(4000);
    controller.on_ack(&tcb, 1, Duration::MAX);
    assert_eq!(controller.on_congestion_event(&tcb, tcb.cwnd), 40 * SEGMENT);
    assert_eq!(controller.stats(&tcb).epoch_rtts, DEFAULT_EPOCH_RTTS);
    assert!(controller.stats(&tcb).min_delay.is_some());
}

#[test]
fn test_threshold_tracks_queuing_delay() {
    let mut no_queue = SiadController::default();
    let mut queued = SiadController::default();
    let tcb = tcb(80, 40);
    for rtt in [50, 50, 50] {
        no_queue.on_ack(&tcb, 1, ms(rtt));
    }
    for rtt in [50, 100, 100] {
        queued.on_ack(&tcb, 1, ms(rtt));
    }

    // Without queuing the threshold stays at the window, a doubled delay halves it
    assert_eq!(no_queue.on_congestion_event(&tcb, tcb.cwnd), 80 * SEGMENT);
    assert_eq!(queued.on_congestion_event(&tcb, tcb.cwnd), 40 * SEGMENT);
}

#[test_log::test]
fn test_epoch_reset_clears_epoch_state() {
    let mut harness = SiadTestHarness::new(SiadConfig::default(), 40, 1);
    for _ in 0..50 {
        harness.ack(ms(40), 2);
    }
    harness.loss();
    assert!(harness.controller.state.increase_performed);

    harness.recovered();
    let state = &harness.controller.state;
    assert_eq!(state.decrease_count, 0);
    assert!(!state.min_delay_seen);
    assert!(!state.increase_performed);
    assert_eq!(state.delay.curr_min_delay(), None);
    assert_eq!(harness.controller.stats(&harness.tcb).epoch_resets, 1);
}

#[test]
fn test_window_reaches_increase_threshold_within_epoch() {
    let mut harness = SiadTestHarness::new(SiadConfig::default(), 50, 7);
    // Ramp up, then one congestion event with a clean path
    for _ in 0..60 {
        harness.ack(ms(50), 1);
    }
    harness.loss();
    harness.recovered();
    let target = harness.controller.state.increase_threshold;
    let start = harness.tcb.cwnd_in_segments();
    assert!(target > start, "target {target} start {start}");

    // One RTT worth of ACKs per round, for one epoch
    for _ in 0..DEFAULT_EPOCH_RTTS {
        let window = harness.tcb.cwnd_in_segments();
        for _ in 0..window {
            harness.ack(ms(50), 1);
        }
    }
    assert!(harness.tcb.cwnd_in_segments() >= target);
}

// ============================================================================
// Fork and live updates
// ============================================================================

#[test]
fn test_fork_is_independent() {
    let mut parent = SiadController::default();
    let mut tcb = tcb(10, 10);
    for _ in 0..5 {
        parent.on_ack(&tcb, 1, ms(30));
        parent.increase_window(&mut tcb, 1);
    }
    parent.on_congestion_event(&tcb, tcb.cwnd);

    let mut child = parent.fork();
    assert_eq!(child.state, parent.state);
    assert_eq!(child.stats(&tcb).congestion_events, 0);
    assert_eq!(child.stats(&tcb).peak_cwnd, 0);

    let snapshot = parent.state.clone();
    let mut child_tcb = tcb;
    child.on_ack(&child_tcb, 1, ms(5));
    child.increase_window(&mut child_tcb, 3);
    child.on_window_reduction_complete(&child_tcb);

    assert_eq!(parent.state, snapshot);
    assert_ne!(child.state, snapshot);
}

#[test]
fn test_live_parameter_updates() {
    let mut controller = SiadController::default();
    let tcb = tcb(40, 20);

    assert!(controller.set_window_clamp(1).is_err());
    controller.set_window_clamp(100).unwrap();
    assert_eq!(controller.state.window_clamp, 100);

    controller.set_epoch_ms(4000);
    for rtt in [100, 100, 100] {
        controller.on_ack(&tcb, 1, ms(rtt));
    }
    controller.on_congestion_event(&tcb, tcb.cwnd);
    assert_eq!(controller.stats(&tcb).epoch_rtts, 40);

    // RTT count wins over milliseconds
    controller.set_epoch_rtts(8);
    controller.on_congestion_event(&tcb, tcb.cwnd);
    assert_eq!(controller.stats(&tcb).epoch_rtts, 8);

    controller.set_epoch_rtts(0);
    controller.set_epoch_ms(0);
    controller.on_congestion_event(&tcb, tcb.cwnd);
    assert_eq!(controller.stats(&tcb).epoch_rtts, DEFAULT_EPOCH_RTTS);
}

#[test]
fn test_window_never_exceeds_clamp() {
    let config = SiadConfig::default().with_window_clamp(30);
    let mut harness = SiadTestHarness::new(config, 20, 3);
    for _ in 0..500 {
        harness.ack(ms(20), 4);
        assert!(harness.tcb.cwnd_in_segments() <= 30);
    }
    assert_eq!(harness.tcb.cwnd_in_segments(), 30);
    assert_eq!(harness.controller.stats(&harness.tcb).peak_cwnd, 30);
}

// ============================================================================
// Invariant sweeps
// ============================================================================

#[test]
fn test_invariants_hold_for_random_event_sequences() {
    for seed in [1u64, 42, 12345, 99999] {
        for config in [
            SiadConfig::default(),
            SiadConfig::default().with_epoch_rtts(3),
            SiadConfig::default().with_epoch_ms(200).with_window_clamp(64),
        ] {
            let mut harness = SiadTestHarness::new(config, 30, seed);
            for _ in 0..2_000 {
                harness.step();
                harness.assert_invariants();
            }
        }
    }
}

#[test]
fn test_current_delay_is_min_of_last_two_samples() {
    let mut harness = SiadTestHarness::new(SiadConfig::default(), 10, 2024);
    let mut previous: Option<u64> = None;
    for _ in 0..500 {
        let sample = harness.rng.gen_range(1..500);
        harness.ack(ms(sample), 1);
        let expected = previous.map_or(sample, |p| p.min(sample));
        assert_eq!(
            harness.controller.state.delay.curr_delay(),
            Some(ms(expected))
        );
        previous = Some(sample);
    }
}

#[test]
fn test_same_seed_same_trajectory() {
    let run = |seed| {
        let mut harness = SiadTestHarness::new(SiadConfig::default(), 25, seed);
        (0..300)
            .map(|_| {
                harness.step();
                (harness.tcb.cwnd, harness.tcb.ssthresh)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(77), run(77));
}
