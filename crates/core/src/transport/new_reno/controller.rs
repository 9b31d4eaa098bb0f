use std::time::Duration;

use crate::transport::congestion_control::CongestionOps;
use crate::transport::socket_state::SocketState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewReno;

impl NewReno {
    pub fn new() -> Self {
        Self
    }

    /// Grow by one segment and return the acked segments left over.
    fn slow_start(&self, tcb: &mut SocketState, segments_acked: u32) -> u32 {
        if segments_acked >= 1 {
            tcb.cwnd = tcb.cwnd.saturating_add(tcb.segment_size());
            tracing::trace!(cwnd = tcb.cwnd, ssthresh = tcb.ssthresh, "NewReno slow start");
            return segments_acked - 1;
        }
        0
    }

    fn congestion_avoidance(&self, tcb: &mut SocketState, segments_acked: u32) {
        if segments_acked == 0 {
            return;
        }
        let seg = u64::from(tcb.segment_size());
        let adder = (seg * seg / u64::from(tcb.cwnd.max(1))).max(1);
        tcb.cwnd = tcb
            .cwnd
            .saturating_add(u32::try_from(adder).unwrap_or(u32::MAX));
        tracing::trace!(cwnd = tcb.cwnd, ssthresh = tcb.ssthresh, "NewReno congestion avoidance");
    }
}

impl CongestionOps for NewReno {
    fn name(&self) -> &'static str {
        "NewReno"
    }

    fn on_ack(&mut self, _tcb: &SocketState, _segments_acked: u32, _rtt: Duration) {}

    fn increase_window(&mut self, tcb: &mut SocketState, segments_acked: u32) {
        let mut segments_acked = segments_acked;
        if tcb.cwnd < tcb.ssthresh {
            segments_acked = self.slow_start(tcb, segments_acked);
        }
        if tcb.cwnd >= tcb.ssthresh {
            self.congestion_avoidance(tcb, segments_acked);
        }
    }

    fn on_congestion_event(&mut self, tcb: &SocketState, bytes_in_flight: u32) -> u32 {
        let ssthresh = tcb.segment_size().saturating_mul(2).max(bytes_in_flight / 2);
        tracing::debug!(bytes_in_flight, ssthresh, "NewReno congestion event");
        ssthresh
    }

    fn on_window_reduction_complete(&mut self, _tcb: &SocketState) {}

    fn fork(&self) -> Self {
        *self
    }
}
