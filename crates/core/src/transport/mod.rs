//! Transport-side congestion control.
//!
//! The transport owns a [`SocketState`] per connection and drives one
//! [`CongestionController`] per connection through the
//! [`CongestionOps`](congestion_control::CongestionOps) callbacks.

pub mod congestion_control;
pub mod errors;
pub mod new_reno;
pub mod siad;
mod socket_state;

pub use congestion_control::{
    CongestionControlAlgorithm, CongestionControlConfig, CongestionControlStats,
    CongestionController, CongestionOps,
};
pub use errors::ConfigError;
pub use socket_state::{SocketState, DEFAULT_INITIAL_WINDOW};
