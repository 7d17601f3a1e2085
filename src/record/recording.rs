//! Frame store of one recording session

use crate::core::types::{Address, Frame, MemoryError, MemoryResult, RecordingSummary, Timestamp};
use parking_lot::RwLock;
use tracing::warn;

/// Frames captured from one `{start_address, size}` region.
///
/// Timestamps are non-decreasing: a frame stamped earlier than its
/// predecessor (wall clock stepped back) is re-stamped with the
/// predecessor's timestamp.
#[derive(Debug)]
pub struct Recording {
    start_address: Address,
    size: usize,
    frame_limit: Option<usize>,
    frames: RwLock<Vec<Frame>>,
}

impl Recording {
    /// Creates an empty, unbounded recording
    pub fn new(start_address: Address, size: usize) -> Self {
        Self::with_frame_limit(start_address, size, None)
    }

    /// Creates an empty recording holding at most `frame_limit` frames
    pub fn with_frame_limit(start_address: Address, size: usize, frame_limit: Option<usize>) -> Self {
        Recording {
            start_address,
            size,
            frame_limit,
            frames: RwLock::new(Vec::new()),
        }
    }

    /// First byte of the captured region
    pub fn start_address(&self) -> Address {
        self.start_address
    }

    /// Length of the captured region and of every frame
    pub fn size(&self) -> usize {
        self.size
    }

    /// Appends a frame.
    ///
    /// Returns `Ok(false)` without storing when the frame limit is reached.
    pub fn push(&self, mut frame: Frame) -> MemoryResult<bool> {
        if frame.data.len() != self.size {
            return Err(MemoryError::FrameSizeMismatch {
                expected: self.size,
                actual: frame.data.len(),
            });
        }

        let mut frames = self.frames.write();
        if self.frame_limit.is_some_and(|limit| frames.len() >= limit) {
            return Ok(false);
        }
        if let Some(last) = frames.last() {
            if frame.timestamp < last.timestamp {
                warn!(
                    previous = last.timestamp,
                    captured = frame.timestamp,
                    "clock went backwards, clamping frame timestamp"
                );
                frame.timestamp = last.timestamp;
            }
        }
        frames.push(frame);
        Ok(true)
    }

    /// True once the frame limit is reached
    pub fn is_full(&self) -> bool {
        self.frame_limit
            .is_some_and(|limit| self.frames.read().len() >= limit)
    }

    /// Index of the first frame at or after `timestamp`, clamped to the
    /// first and last frame
    pub fn frame_index(&self, timestamp: Timestamp) -> MemoryResult<usize> {
        let frames = self.frames.read();
        Self::index_in(&frames, timestamp)
    }

    /// Frame for playback at `timestamp`, see [`frame_index`](Self::frame_index)
    pub fn frame_at(&self, timestamp: Timestamp) -> MemoryResult<Frame> {
        let frames = self.frames.read();
        let index = Self::index_in(&frames, timestamp)?;
        Ok(frames[index].clone())
    }

    fn index_in(frames: &[Frame], timestamp: Timestamp) -> MemoryResult<usize> {
        if frames.is_empty() {
            return Err(MemoryError::NoFrames);
        }
        let index = frames.partition_point(|frame| frame.timestamp < timestamp);
        Ok(index.min(frames.len() - 1))
    }

    /// Frame at a position in capture order
    pub fn get(&self, index: usize) -> Option<Frame> {
        self.frames.read().get(index).cloned()
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.read().len()
    }

    /// True before the first frame
    pub fn is_empty(&self) -> bool {
        self.frames.read().is_empty()
    }

    /// Timestamps of all frames in capture order
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.frames.read().iter().map(|f| f.timestamp).collect()
    }

    /// Copy of every frame
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.read().clone()
    }

    /// Region, frame count and time span
    pub fn summary(&self) -> RecordingSummary {
        let frames = self.frames.read();
        RecordingSummary {
            start_address: self.start_address,
            size: self.size,
            frame_count: frames.len(),
            first_timestamp: frames.first().map(|f| f.timestamp),
            last_timestamp: frames.last().map(|f| f.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recording_at(timestamps: &[Timestamp]) -> Recording {
        let recording = Recording::new(Address::new(0x1000), 1);
        for (i, &ts) in timestamps.iter().enumerate() {
            recording.push(Frame::new(ts, vec![i as u8])).unwrap();
        }
        recording
    }

    #[test]
    fn test_lookup_between_frames() {
        let recording = recording_at(&[100, 200, 300]);
        assert_eq!(recording.frame_at(150).unwrap().timestamp, 200);
        assert_eq!(recording.frame_at(200).unwrap().timestamp, 200);
    }

    #[test]
    fn test_lookup_clamps() {
        let recording = recording_at(&[100, 200, 300]);
        assert_eq!(recording.frame_at(50).unwrap().timestamp, 100);
        assert_eq!(recording.frame_at(350).unwrap().timestamp, 300);
        assert_eq!(recording.frame_index(i64::MIN).unwrap(), 0);
        assert_eq!(recording.frame_index(i64::MAX).unwrap(), 2);
    }

    #[test]
    fn test_empty_recording() {
        let recording = recording_at(&[]);
        assert!(matches!(recording.frame_at(0), Err(MemoryError::NoFrames)));
        assert!(recording.is_empty());
    }

    #[test]
    fn test_duplicate_timestamps_pick_first() {
        let recording = recording_at(&[100, 200, 200, 300]);
        let frame = recording.frame_at(200).unwrap();
        assert_eq!(frame.data, vec![1]);
    }

    #[test]
    fn test_backwards_clock_is_clamped() {
        let recording = recording_at(&[100, 90, 120]);
        assert_eq!(recording.timestamps(), vec![100, 100, 120]);
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let recording = Recording::new(Address::new(0), 4);
        assert!(matches!(
            recording.push(Frame::new(1, vec![0; 3])),
            Err(MemoryError::FrameSizeMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            recording.push(Frame::new(2, vec![0; 6])),
            Err(MemoryError::FrameSizeMismatch { expected: 4, actual: 6 })
        ));
        assert!(recording.is_empty());
    }

    #[test]
    fn test_frame_limit() {
        let recording = Recording::with_frame_limit(Address::new(0), 1, Some(2));
        assert!(recording.push(Frame::new(1, vec![0])).unwrap());
        assert!(!recording.is_full());
        assert!(recording.push(Frame::new(2, vec![0])).unwrap());
        assert!(recording.is_full());
        assert!(!recording.push(Frame::new(3, vec![0])).unwrap());
        assert_eq!(recording.len(), 2);
    }

    #[test]
    fn test_summary() {
        let recording = recording_at(&[10, 40]);
        assert_eq!(
            recording.summary(),
            RecordingSummary {
                start_address: Address::new(0x1000),
                size: 1,
                frame_count: 2,
                first_timestamp: Some(10),
                last_timestamp: Some(40),
            }
        );
    }
}
