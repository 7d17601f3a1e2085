//! Capture thread lifecycle

use super::{midpoint, unix_millis, Recording};
use crate::core::types::{Address, Frame, MemoryError, MemoryResult, RecordingSummary, Timestamp};
use crate::process::ProcessMemory;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// What to capture and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub start_address: Address,
    pub size: usize,
    /// Pause between captures, not counting the capture itself
    pub period: Duration,
    /// Stop storing frames after this many
    pub max_frames: Option<usize>,
}

impl CaptureSettings {
    /// Unbounded capture of `size` bytes at `start_address` every `period`
    pub fn new(start_address: Address, size: usize, period: Duration) -> Self {
        CaptureSettings {
            start_address,
            size,
            period,
            max_frames: None,
        }
    }

    /// Caps the number of stored frames
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }
}

#[derive(Debug)]
struct ActiveCapture {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
    recording: Arc<Recording>,
}

/// Runs at most one capture at a time: `Idle -> Capturing -> Idle`.
///
/// The last recording stays queryable after [`stop`](Self::stop) until the
/// next [`start`](Self::start) replaces it.
#[derive(Debug, Default)]
pub struct Recorder {
    active: Mutex<Option<ActiveCapture>>,
    last: RwLock<Option<Arc<Recording>>>,
}

impl Recorder {
    /// Creates an idle recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts capturing on a dedicated thread.
    ///
    /// Fails with [`MemoryError::AlreadyRecording`] while a capture runs.
    pub fn start(
        &self,
        process: Arc<dyn ProcessMemory>,
        settings: CaptureSettings,
    ) -> MemoryResult<Arc<Recording>> {
        if settings.size == 0 {
            return Err(MemoryError::UnsupportedOperation(
                "capture size must be at least one byte".to_string(),
            ));
        }

        let mut active = self.active.lock();
        if active.is_some() {
            return Err(MemoryError::AlreadyRecording);
        }

        let recording = Arc::new(Recording::with_frame_limit(
            settings.start_address,
            settings.size,
            settings.max_frames,
        ));
        let (stop_tx, stop_rx) = bounded(1);
        let period = settings.period.max(MIN_PERIOD);
        let pid = process.pid();

        let thread = {
            let recording = Arc::clone(&recording);
            thread::Builder::new()
                .name(format!("capture-{}", pid))
                .spawn(move || capture_loop(process, recording, period, stop_rx))?
        };

        info!(
            pid,
            address = %settings.start_address,
            size = settings.size,
            period_ms = period.as_millis() as u64,
            "recording started"
        );

        *self.last.write() = Some(Arc::clone(&recording));
        *active = Some(ActiveCapture {
            stop_tx,
            thread,
            recording: Arc::clone(&recording),
        });
        Ok(recording)
    }

    /// Stops the capture and waits for its thread to exit.
    ///
    /// Returns the number of frames captured. Fails immediately with
    /// [`MemoryError::NotRecording`] when idle, so a repeated stop never
    /// blocks. The recorder reads as idle as soon as the stop begins; the
    /// wait for an in-flight capture happens outside the state lock.
    pub fn stop(&self) -> MemoryResult<usize> {
        let capture = self
            .active
            .lock()
            .take()
            .ok_or(MemoryError::NotRecording)?;

        // The thread only exits on a signal or a dropped sender.
        let _ = capture.stop_tx.send(());
        capture
            .thread
            .join()
            .map_err(|_| MemoryError::Unknown("capture thread panicked".to_string()))?;

        let frames = capture.recording.len();
        info!(frames, "recording stopped");
        Ok(frames)
    }

    /// True while a capture thread runs
    pub fn is_recording(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Current or most recent recording
    pub fn recording(&self) -> Option<Arc<Recording>> {
        self.last.read().clone()
    }

    /// Playback lookup on the current or most recent recording
    pub fn frame_at(&self, timestamp: Timestamp) -> MemoryResult<Frame> {
        self.recording()
            .ok_or(MemoryError::NoFrames)?
            .frame_at(timestamp)
    }

    /// Summary of the current or most recent recording
    pub fn summary(&self) -> Option<RecordingSummary> {
        self.recording().map(|r| r.summary())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.active.get_mut().is_some() {
            let _ = self.stop();
        }
    }
}

fn capture_loop(
    process: Arc<dyn ProcessMemory>,
    recording: Arc<Recording>,
    period: Duration,
    stop_rx: Receiver<()>,
) {
    let mut limit_logged = false;

    loop {
        if !recording.is_full() {
            capture_once(process.as_ref(), &recording);
        } else if !limit_logged {
            info!(frames = recording.len(), "frame limit reached, capture paused");
            limit_logged = true;
        }

        match stop_rx.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn capture_once(process: &dyn ProcessMemory, recording: &Recording) {
    let started = unix_millis();
    let result = process.read_vec(recording.start_address(), recording.size());
    let finished = unix_millis();

    match result {
        Ok(data) => {
            let timestamp = midpoint(started, finished);
            match recording.push(Frame::new(timestamp, data)) {
                Ok(_) => debug!(timestamp, frames = recording.len(), "frame captured"),
                Err(e) => warn!(error = %e, "frame rejected"),
            }
        }
        Err(e) => warn!(
            pid = process.pid(),
            address = %recording.start_address(),
            error = %e,
            "capture failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AddressWidth;
    use crate::process::SyntheticProcess;
    use std::time::Instant;

    fn process() -> Arc<SyntheticProcess> {
        let process = SyntheticProcess::new(7, AddressWidth::Bits64);
        process.map_region(Address::new(0x5000), (0u8..16).collect());
        Arc::new(process)
    }

    fn settings(size: usize) -> CaptureSettings {
        CaptureSettings::new(Address::new(0x5000), size, Duration::from_millis(5))
    }

    fn wait_for_frames(recording: &Recording, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while recording.len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_stop_when_idle() {
        let recorder = Recorder::new();
        assert!(matches!(recorder.stop(), Err(MemoryError::NotRecording)));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_start_stop() {
        let recorder = Recorder::new();
        let recording = recorder.start(process(), settings(4)).unwrap();
        assert!(recorder.is_recording());

        wait_for_frames(&recording, 2);
        let frames = recorder.stop().unwrap();
        assert!(frames >= 2);
        assert!(!recorder.is_recording());
        assert!(matches!(recorder.stop(), Err(MemoryError::NotRecording)));

        // no appends after stop returned
        let len = recording.len();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(recording.len(), len);
        assert_eq!(recording.get(0).unwrap().data, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_start_while_recording() {
        let recorder = Recorder::new();
        recorder.start(process(), settings(4)).unwrap();
        assert!(matches!(
            recorder.start(process(), settings(4)),
            Err(MemoryError::AlreadyRecording)
        ));
        recorder.stop().unwrap();
    }

    #[test]
    fn test_zero_size_rejected() {
        let recorder = Recorder::new();
        assert!(recorder.start(process(), settings(0)).is_err());
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_frame_limit_pauses_capture() {
        let recorder = Recorder::new();
        let process = process();
        let recording = recorder
            .start(process.clone(), settings(2).with_max_frames(Some(3)))
            .unwrap();

        wait_for_frames(&recording, 3);
        thread::sleep(Duration::from_millis(30));
        assert!(recorder.is_recording());
        assert_eq!(recorder.stop().unwrap(), 3);
    }

    #[test]
    fn test_recording_survives_stop() {
        let recorder = Recorder::new();
        assert!(matches!(recorder.frame_at(0), Err(MemoryError::NoFrames)));

        let recording = recorder.start(process(), settings(1)).unwrap();
        wait_for_frames(&recording, 1);
        recorder.stop().unwrap();

        assert_eq!(recorder.frame_at(0).unwrap().data, vec![0]);
        assert_eq!(recorder.summary().unwrap().frame_count, recording.len());
    }

    #[test]
    fn test_drop_stops_capture() {
        let process = process();
        let recording = {
            let recorder = Recorder::new();
            let recording = recorder.start(process.clone(), settings(1)).unwrap();
            wait_for_frames(&recording, 1);
            recording
        };
        let reads = process.read_count();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(process.read_count(), reads);
        assert!(!recording.is_empty());
    }
}
