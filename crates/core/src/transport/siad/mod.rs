//! SIAD (Scalable Increase, Adaptive Decrease) congestion controller.
//!
//! SIAD is a loss-based TCP congestion control that additionally reacts to
//! queuing delay, aiming to fill the bottleneck within a fixed number of RTTs
//! after every congestion event regardless of the path's bandwidth-delay
//! product.
//!
//! ## Control loop
//!
//! | Component | Trigger | Effect |
//! |-----------|---------|--------|
//! | Delay tracker | every ACK batch | filtered current delay, all-time and per-epoch minimum |
//! | Window controller | every ACK batch | slow start, increase, fast increase or additional decrease |
//! | Threshold estimator | once per congestion event | ssthresh, increase threshold, increase rate |
//! | Epoch reset | window reduction complete | starts a new epoch |
//!
//! ## Epochs
//!
//! The interval between two congestion events is an *epoch*. On each event
//! the window is backdated to the moment the congestion occurred, ssthresh is
//! set from the ratio of the minimum to the current delay, and the increase
//! threshold is extrapolated from the last two maxima. The increase rate is
//! then sized so the window reaches that threshold in `epoch_rtts` RTTs.
//!
//! When the queue does not drain after the reduction (no new minimum delay is
//! seen), the window controller applies up to `epoch_rtts - 1` additional
//! decreases, each again scaled by the delay ratio.
//!
//! Windows are tracked in segments internally; the transport state is
//! updated in bytes.

mod config;
mod controller;
mod delay;
mod state;
mod stats;
mod threshold;
mod window;

#[cfg(test)]
mod tests;

pub use config::SiadConfig;
pub use controller::SiadController;
pub use state::Phase;
pub use stats::SiadStats;
