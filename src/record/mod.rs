//! Periodic capture of a memory region into a time-indexed history
//!
//! A [`Recorder`] owns at most one capture thread. Each capture appends a
//! [`Frame`](crate::core::types::Frame) to the shared [`Recording`], which
//! can be queried while capture is still running.

pub mod recorder;
pub mod recording;

pub use recorder::{CaptureSettings, Recorder};
pub use recording::Recording;

use crate::core::types::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch; 0 if the clock is before it
pub fn unix_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

/// Midpoint of two timestamps, rounded down
pub fn midpoint(start: Timestamp, end: Timestamp) -> Timestamp {
    start + (end - start) / 2
}
