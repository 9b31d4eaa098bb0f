//! NewReno congestion control.
//!
//! The baseline AIMD variant: exponential slow start up to ssthresh, one
//! segment per RTT afterwards, and a halved threshold on congestion.

mod controller;

pub use controller::NewReno;
