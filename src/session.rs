//! Operator-facing entry point
//!
//! A [`Session`] owns everything that outlives one call: opened processes,
//! the module cache, known pointer widths and the recorder. Addresses are
//! taken as hex text the way a front end passes them.

use crate::config::Config;
use crate::core::types::{
    Address, AddressWidth, Frame, MemoryError, MemoryResult, MemoryValue, ModuleEntry,
    PointerChain, ProcessId, ProcessInfo, RecordingSummary, Timestamp, ValueType,
};
use crate::memory::{MemoryReader, PointerResolver};
use crate::process::{ModuleCache, ProcessMemory, ProcessOpener, WidthResolver};
use crate::record::{CaptureSettings, Recorder, Recording};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Processes, caches and the recorder of one operator session
pub struct Session<O: ProcessOpener> {
    opener: O,
    attached: Mutex<HashMap<ProcessId, Arc<dyn ProcessMemory>>>,
    modules: ModuleCache,
    widths: WidthResolver,
    recorder: Recorder,
    max_read_size: usize,
    default_period: Duration,
    frame_limit: Option<usize>,
}

impl<O: ProcessOpener> Session<O> {
    /// Session with the default configuration
    pub fn new(opener: O) -> Self {
        Self::with_config(opener, &Config::default())
    }

    /// Session using the limits from `config`
    pub fn with_config(opener: O, config: &Config) -> Self {
        Session {
            opener,
            attached: Mutex::new(HashMap::new()),
            modules: ModuleCache::with_capacity(config.memory.module_capacity),
            widths: WidthResolver::new(),
            recorder: Recorder::new(),
            max_read_size: config.memory.max_read_size,
            default_period: config.recorder.default_period(),
            frame_limit: config.recorder.frame_limit(),
        }
    }

    /// Opened handle for `pid`, opening it on first use
    ///
    /// The open runs outside the attach table lock. When two callers race on
    /// the same pid the first handle stored wins and the other is dropped.
    pub fn attach(&self, pid: ProcessId) -> MemoryResult<Arc<dyn ProcessMemory>> {
        if let Some(process) = self.attached.lock().get(&pid).cloned() {
            return Ok(process);
        }

        let opened = self.opener.open_process(pid)?;
        let process = Arc::clone(
            self.attached
                .lock()
                .entry(pid)
                .or_insert_with(|| Arc::clone(&opened)),
        );
        if Arc::ptr_eq(&process, &opened) {
            info!(pid, key = %process.key(), "attached");
        }
        Ok(process)
    }

    /// Closes the handle for `pid` and drops its cached modules and width.
    ///
    /// A recording of that process keeps its own handle until stopped.
    pub fn detach(&self, pid: ProcessId) -> bool {
        let Some(process) = self.attached.lock().remove(&pid) else {
            return false;
        };
        let key = process.key();
        self.modules.evict(key);
        self.widths.forget(key);
        info!(pid, %key, "detached");
        true
    }

    /// Pids with an open handle
    pub fn attached_pids(&self) -> Vec<ProcessId> {
        let mut pids: Vec<ProcessId> = self.attached.lock().keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// Processes worth attaching to
    pub fn list_candidate_processes(&self) -> MemoryResult<Vec<ProcessInfo>> {
        self.opener.list_candidate_processes()
    }

    /// Reads `size` bytes at the hex address `address`
    pub fn read_bytes(&self, pid: ProcessId, address: &str, size: usize) -> MemoryResult<Vec<u8>> {
        let address = Address::from_hex(address)?;
        let process = self.attach(pid)?;
        MemoryReader::with_limit(process.as_ref(), self.max_read_size).read_bytes(address, size)
    }

    /// Reads and decodes one value at the hex address `address`
    pub fn read_value(
        &self,
        pid: ProcessId,
        address: &str,
        value_type: ValueType,
    ) -> MemoryResult<MemoryValue> {
        let address = Address::from_hex(address)?;
        let process = self.attach(pid)?;
        MemoryReader::with_limit(process.as_ref(), self.max_read_size).read_value(address, value_type)
    }

    /// Pointer width of `pid`, detected once per handle
    pub fn address_width(&self, pid: ProcessId) -> MemoryResult<AddressWidth> {
        let process = self.attach(pid)?;
        self.widths.width_of(process.as_ref())
    }

    /// Loaded modules of `pid` as cached
    pub fn modules(&self, pid: ProcessId) -> MemoryResult<Vec<ModuleEntry>> {
        let process = self.attach(pid)?;
        self.modules.modules(process.as_ref())
    }

    /// Walks `chain` inside `pid`
    pub fn resolve_pointer(&self, pid: ProcessId, chain: &PointerChain) -> MemoryResult<Address> {
        let process = self.attach(pid)?;
        let width = self.widths.width_of(process.as_ref())?;
        let address = PointerResolver::new(process.as_ref(), width).resolve_chain(&self.modules, chain)?;
        debug!(pid, %chain, %address, "resolved pointer chain");
        Ok(address)
    }

    /// Starts capturing `size` bytes at `start_address` every `period_ms`.
    ///
    /// A period of 0 uses the configured default.
    pub fn start_recording(
        &self,
        pid: ProcessId,
        start_address: &str,
        size: usize,
        period_ms: u64,
    ) -> MemoryResult<Arc<Recording>> {
        let start_address = Address::from_hex(start_address)?;
        if size > self.max_read_size {
            return Err(MemoryError::ReadTooLarge {
                requested: size,
                limit: self.max_read_size,
            });
        }
        let period = match period_ms {
            0 => self.default_period,
            ms => Duration::from_millis(ms),
        };

        let process = self.attach(pid)?;
        let settings = CaptureSettings::new(start_address, size, period)
            .with_max_frames(self.frame_limit);
        self.recorder.start(process, settings)
    }

    /// Stops the running capture, returning its frame count
    pub fn stop_recording(&self) -> MemoryResult<usize> {
        self.recorder.stop()
    }

    /// True while a capture runs
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Bytes of the playback frame for `timestamp`
    pub fn get_frame(&self, timestamp: Timestamp) -> MemoryResult<Vec<u8>> {
        Ok(self.frame(timestamp)?.data)
    }

    /// Playback frame for `timestamp`, with its capture time
    pub fn frame(&self, timestamp: Timestamp) -> MemoryResult<Frame> {
        self.recorder.frame_at(timestamp)
    }

    /// Current or most recent recording
    pub fn recording(&self) -> Option<Arc<Recording>> {
        self.recorder.recording()
    }

    /// Summary of the current or most recent recording
    pub fn recording_summary(&self) -> Option<RecordingSummary> {
        self.recorder.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{SyntheticOpener, SyntheticProcess};

    fn session() -> (Session<SyntheticOpener>, Arc<SyntheticProcess>) {
        let opener = SyntheticOpener::new();
        let process = opener.insert("game.exe", SyntheticProcess::new(100, AddressWidth::Bits32));
        process.map_region(Address::new(0x40_0000), vec![0x2A, 0, 0, 0, 0xFF, 0xFF]);
        process.add_module("game.exe", Address::new(0x40_0000));
        (Session::new(opener), process)
    }

    #[test]
    fn test_attach_reuses_handle() {
        let (session, _) = session();
        let a = session.attach(100).unwrap();
        let b = session.attach(100).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(session.attached_pids(), vec![100]);
        assert!(session.attach(5).is_err());
    }

    #[test]
    fn test_read_bytes_hex_forms() {
        let (session, _) = session();
        assert_eq!(session.read_bytes(100, "400000", 2).unwrap(), vec![0x2A, 0]);
        assert_eq!(session.read_bytes(100, "0x400004", 2).unwrap(), vec![0xFF, 0xFF]);
        assert!(matches!(
            session.read_bytes(100, "xyz", 1),
            Err(MemoryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_read_value() {
        let (session, _) = session();
        assert_eq!(
            session.read_value(100, "400000", ValueType::U32).unwrap(),
            MemoryValue::U32(42)
        );
        assert_eq!(
            session.read_value(100, "400004", ValueType::I16).unwrap(),
            MemoryValue::I16(-1)
        );
    }

    #[test]
    fn test_read_limit_from_config() {
        let opener = SyntheticOpener::new();
        opener.insert("a", SyntheticProcess::new(1, AddressWidth::Bits64));
        let mut config = Config::default();
        config.memory.max_read_size = 16;
        let session = Session::with_config(opener, &config);

        assert!(matches!(
            session.read_bytes(1, "1000", 17),
            Err(MemoryError::ReadTooLarge { requested: 17, limit: 16 })
        ));
        assert!(matches!(
            session.start_recording(1, "1000", 17, 10),
            Err(MemoryError::ReadTooLarge { .. })
        ));
    }

    #[test]
    fn test_detach_drops_caches() {
        let (session, process) = session();
        session.resolve_pointer(100, &"game.exe+4".parse().unwrap()).unwrap();
        assert_eq!(process.enumeration_count(), 1);

        assert!(session.detach(100));
        assert!(!session.detach(100));
        assert!(session.attached_pids().is_empty());

        session.resolve_pointer(100, &"game.exe+4".parse().unwrap()).unwrap();
        assert_eq!(process.enumeration_count(), 2);
    }

    #[test]
    fn test_no_recording_yet() {
        let (session, _) = session();
        assert!(matches!(session.get_frame(0), Err(MemoryError::NoFrames)));
        assert!(matches!(session.stop_recording(), Err(MemoryError::NotRecording)));
        assert!(session.recording_summary().is_none());
    }
}
