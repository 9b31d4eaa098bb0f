//! Transport-side connection state consumed and updated by congestion control.
//!
//! Windows are kept in bytes, the way the transport stack accounts for them.
//! Congestion control algorithms work in whole segments and convert at the
//! boundary through the helpers here.

use super::errors::ConfigError;

/// Initial congestion window used when none is given (segments).
pub const DEFAULT_INITIAL_WINDOW: u32 = 10;

/// Per-connection transport state shared with the congestion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketState {
    /// Congestion window (bytes)
    pub cwnd: u32,
    /// Slow start threshold (bytes)
    pub ssthresh: u32,
    segment_size: u32,
}

impl SocketState {
    /// Create transport state with the default initial window and an
    /// unbounded slow start threshold.
    pub fn new(segment_size: u32) -> Result<Self, ConfigError> {
        Self::with_initial_window(segment_size, DEFAULT_INITIAL_WINDOW)
    }

    /// Create transport state with an initial window given in segments.
    pub fn with_initial_window(segment_size: u32, initial_window: u32) -> Result<Self, ConfigError> {
        if segment_size == 0 {
            return Err(ConfigError::ZeroSegmentSize);
        }
        Ok(Self {
            cwnd: initial_window.saturating_mul(segment_size),
            ssthresh: u32::MAX,
            segment_size,
        })
    }

    /// Segment size (bytes).
    pub fn segment_size(&self) -> u32 {
        self.segment_size
    }

    pub fn cwnd_in_segments(&self) -> u32 {
        self.cwnd / self.segment_size
    }

    pub fn ssthresh_in_segments(&self) -> u32 {
        self.ssthresh / self.segment_size
    }

    pub fn set_cwnd_in_segments(&mut self, segments: u32) {
        self.cwnd = segments.saturating_mul(self.segment_size);
    }

    pub fn set_ssthresh_in_segments(&mut self, segments: u32) {
        self.ssthresh = segments.saturating_mul(self.segment_size);
    }

    /// Convert a window given in segments to bytes.
    pub fn segments_to_bytes(&self, segments: u32) -> u32 {
        segments.saturating_mul(self.segment_size)
    }
}
