//! SIAD congestion control for TCP-like transports.
//!
//! Scalable Increase, Adaptive Decrease reacts to loss like a classic
//! AIMD controller but scales every decrease by the ratio of the minimum to
//! the current delay, and sizes its increase so the window refills the
//! bottleneck within a configured number of RTTs regardless of bandwidth.

/// Configuration file loading and logger setup.
pub mod config;

/// Replay of recorded ACK/loss traces against a controller.
pub mod replay;

/// Tracing subscriber setup.
pub mod tracing;

/// Congestion controllers and the transport state they drive.
pub mod transport;

pub use transport::{
    CongestionControlAlgorithm, CongestionControlConfig, CongestionController, CongestionOps,
    SocketState,
};
