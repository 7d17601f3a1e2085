//! Captured frames and recording summaries

use super::Address;
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// One timestamped snapshot of a memory region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub timestamp: Timestamp,
    pub data: Vec<u8>,
}

impl Frame {
    /// Creates a new frame
    pub fn new(timestamp: Timestamp, data: Vec<u8>) -> Self {
        Frame { timestamp, data }
    }

    /// Returns the captured bytes as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

/// Shape of a recording, for scrubbing front ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub start_address: Address,
    pub size: usize,
    pub frame_count: usize,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
}

impl RecordingSummary {
    /// Time covered by the recording in milliseconds
    pub fn duration_ms(&self) -> i64 {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_hex() {
        let frame = Frame::new(10, vec![0xDE, 0xAD, 0x01]);
        assert_eq!(frame.to_hex(), "dead01");
    }

    #[test]
    fn test_summary_duration() {
        let mut summary = RecordingSummary {
            start_address: Address::new(0x1000),
            size: 4,
            frame_count: 0,
            first_timestamp: None,
            last_timestamp: None,
        };
        assert_eq!(summary.duration_ms(), 0);

        summary.frame_count = 3;
        summary.first_timestamp = Some(100);
        summary.last_timestamp = Some(350);
        assert_eq!(summary.duration_ms(), 250);
    }
}
