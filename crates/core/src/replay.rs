//! Trace replay.
//!
//! A trace is a text file with one transport event per line:
//!
//! ```text
//! # comment
//! ack <rtt-ms> <segments-acked>
//! loss <bytes-in-flight>
//! recovered
//! ```
//!
//! Events are applied to a controller in the order a transport connection
//! would issue them.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::transport::{CongestionOps, SocketState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("line {line}: unknown event `{event}`")]
    UnknownEvent { line: usize, event: String },

    #[error("line {line}: `{event}` expects {expected} argument(s), got {got}")]
    Arity {
        line: usize,
        event: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: invalid number `{value}`")]
    InvalidNumber { line: usize, value: String },
}

/// One transport event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// An ACK batch with its RTT sample.
    Ack { rtt: Duration, segments: u32 },
    /// A congestion event detected with `bytes_in_flight` outstanding.
    Loss { bytes_in_flight: u32 },
    /// The window reduction signaled by the last loss took effect.
    Recovered,
}

/// Window state after a replayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStep {
    /// 1-based event index
    pub step: usize,
    pub event: TraceEvent,
    /// Congestion window (bytes)
    pub cwnd: u32,
    /// Slow start threshold (bytes)
    pub ssthresh: u32,
}

fn number<T: FromStr>(line: usize, value: &str) -> Result<T, TraceError> {
    value.parse().map_err(|_| TraceError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

fn expect_args(
    line: usize,
    event: &'static str,
    args: &[&str],
    expected: usize,
) -> Result<(), TraceError> {
    if args.len() != expected {
        return Err(TraceError::Arity {
            line,
            event,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// Parse a whole trace. Blank lines and `#` comments are skipped.
pub fn parse_trace(input: &str) -> Result<Vec<TraceEvent>, TraceError> {
    let mut events = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let mut parts = content.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();
        let event = match keyword {
            "ack" => {
                expect_args(line, "ack", &args, 2)?;
                TraceEvent::Ack {
                    rtt: Duration::from_millis(number(line, args[0])?),
                    segments: number(line, args[1])?,
                }
            }
            "loss" => {
                expect_args(line, "loss", &args, 1)?;
                TraceEvent::Loss {
                    bytes_in_flight: number(line, args[0])?,
                }
            }
            "recovered" => {
                expect_args(line, "recovered", &args, 0)?;
                TraceEvent::Recovered
            }
            other => {
                return Err(TraceError::UnknownEvent {
                    line,
                    event: other.to_string(),
                })
            }
        };
        events.push(event);
    }
    Ok(events)
}

/// Apply one event to `controller` and `tcb`.
pub fn apply<C: CongestionOps>(controller: &mut C, tcb: &mut SocketState, event: TraceEvent) {
    match event {
        TraceEvent::Ack { rtt, segments } => {
            controller.on_ack(tcb, segments, rtt);
            controller.increase_window(tcb, segments);
        }
        TraceEvent::Loss { bytes_in_flight } => {
            let ssthresh = controller.on_congestion_event(tcb, bytes_in_flight);
            tcb.ssthresh = ssthresh;
            tcb.cwnd = ssthresh;
        }
        TraceEvent::Recovered => controller.on_window_reduction_complete(tcb),
    }
}

/// Replay `events` in order, returning the window after each one.
pub fn replay<C: CongestionOps>(
    controller: &mut C,
    tcb: &mut SocketState,
    events: &[TraceEvent],
) -> Vec<ReplayStep> {
    events
        .iter()
        .enumerate()
        .map(|(idx, &event)| {
            apply(controller, tcb, event);
            tracing::trace!(
                step = idx + 1,
                cwnd = tcb.cwnd,
                ssthresh = tcb.ssthresh,
                "Replayed event"
            );
            ReplayStep {
                step: idx + 1,
                event,
                cwnd: tcb.cwnd,
                ssthresh: tcb.ssthresh,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let events = parse_trace(
            "# warmup\n\nack 50 1  # first\nloss 14480\n   \nrecovered\n",
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                TraceEvent::Ack {
                    rtt: Duration::from_millis(50),
                    segments: 1
                },
                TraceEvent::Loss {
                    bytes_in_flight: 14480
                },
                TraceEvent::Recovered,
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            parse_trace("ack 50 1\nnack 3"),
            Err(TraceError::UnknownEvent {
                line: 2,
                event: "nack".into()
            })
        );
        assert_eq!(
            parse_trace("\nack 50"),
            Err(TraceError::Arity {
                line: 2,
                event: "ack",
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            parse_trace("loss -1"),
            Err(TraceError::InvalidNumber {
                line: 1,
                value: "-1".into()
            })
        );
    }
}
