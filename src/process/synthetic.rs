//! In-memory process backend
//!
//! A sparse address space made of mapped regions plus a module list. It
//! behaves like a real target for the resolver and recorder, and counts
//! reads and enumerations so callers can observe how often they hit it.

use super::{ProcessKey, ProcessMemory, ProcessOpener};
use crate::core::types::{
    Address, AddressWidth, MemoryError, MemoryResult, ModuleEntry, ProcessId, ProcessInfo,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A fake target process backed by ordinary heap memory
#[derive(Debug)]
pub struct SyntheticProcess {
    key: ProcessKey,
    pid: ProcessId,
    width: Option<AddressWidth>,
    regions: RwLock<BTreeMap<u64, Vec<u8>>>,
    modules: RwLock<Vec<ModuleEntry>>,
    enumerations: AtomicUsize,
    reads: AtomicUsize,
    failing_reads: AtomicUsize,
}

impl SyntheticProcess {
    /// Creates an empty address space with the given pointer width
    pub fn new(pid: ProcessId, width: AddressWidth) -> Self {
        Self::build(pid, Some(width))
    }

    /// Creates a process whose width detection always fails
    pub fn with_unknown_width(pid: ProcessId) -> Self {
        Self::build(pid, None)
    }

    fn build(pid: ProcessId, width: Option<AddressWidth>) -> Self {
        SyntheticProcess {
            key: ProcessKey::next(),
            pid,
            width,
            regions: RwLock::new(BTreeMap::new()),
            modules: RwLock::new(Vec::new()),
            enumerations: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            failing_reads: AtomicUsize::new(0),
        }
    }

    /// Maps `bytes` at `address`, replacing any region starting there
    pub fn map_region(&self, address: Address, bytes: Vec<u8>) {
        self.regions.write().insert(address.as_u64(), bytes);
    }

    /// Maps `len` zero bytes at `address`
    pub fn map_zeroed(&self, address: Address, len: usize) {
        self.map_region(address, vec![0u8; len]);
    }

    /// Overwrites bytes inside an already mapped region
    pub fn write_bytes(&self, address: Address, bytes: &[u8]) -> MemoryResult<()> {
        let mut regions = self.regions.write();
        let (start, region) = Self::locate_mut(&mut regions, address.as_u64(), bytes.len())
            .ok_or_else(|| MemoryError::read_failed(address, "address not mapped"))?;
        let offset = (address.as_u64() - start) as usize;
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Writes a pointer-sized little-endian value
    pub fn write_pointer(
        &self,
        width: AddressWidth,
        address: Address,
        value: Address,
    ) -> MemoryResult<()> {
        match width {
            AddressWidth::Bits32 => self.write_bytes(address, &(value.as_u64() as u32).to_le_bytes()),
            AddressWidth::Bits64 => self.write_bytes(address, &value.as_u64().to_le_bytes()),
        }
    }

    /// Registers a loaded module
    pub fn add_module(&self, name: impl Into<String>, base_address: Address) {
        self.modules.write().push(ModuleEntry::new(name, base_address));
    }

    /// Makes the next `count` reads fail
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Number of module enumerations performed so far
    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// Number of read attempts so far, failed ones included
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn locate(regions: &BTreeMap<u64, Vec<u8>>, address: u64, len: usize) -> Option<&[u8]> {
        let (start, region) = regions.range(..=address).next_back()?;
        let offset = usize::try_from(address - start).ok()?;
        let end = offset.checked_add(len)?;
        region.get(offset..end)
    }

    fn locate_mut(
        regions: &mut BTreeMap<u64, Vec<u8>>,
        address: u64,
        len: usize,
    ) -> Option<(u64, &mut Vec<u8>)> {
        let (start, region) = regions.range_mut(..=address).next_back()?;
        let offset = usize::try_from(address - start).ok()?;
        let end = offset.checked_add(len)?;
        if end > region.len() {
            return None;
        }
        Some((*start, region))
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ProcessMemory for SyntheticProcess {
    fn key(&self) -> ProcessKey {
        self.key
    }

    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_bytes(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.take_injected_failure() {
            return Err(MemoryError::read_failed(address, "injected failure"));
        }

        let regions = self.regions.read();
        let source = Self::locate(&regions, address.as_u64(), buffer.len())
            .ok_or_else(|| MemoryError::read_failed(address, "address not mapped"))?;
        buffer.copy_from_slice(source);
        Ok(())
    }

    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleEntry>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        Ok(self.modules.read().clone())
    }

    fn detect_address_width(&self) -> MemoryResult<AddressWidth> {
        self.width.ok_or_else(|| {
            MemoryError::WidthUnknown(format!("synthetic process {} has no width", self.pid))
        })
    }
}

/// Opener over a fixed set of synthetic processes
#[derive(Debug, Default)]
pub struct SyntheticOpener {
    processes: RwLock<HashMap<ProcessId, Arc<SyntheticProcess>>>,
    names: RwLock<Vec<ProcessInfo>>,
    opens: AtomicUsize,
}

impl SyntheticOpener {
    /// Creates an opener with no processes
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a process under `filename` and returns it
    pub fn insert(&self, filename: impl Into<String>, process: SyntheticProcess) -> Arc<SyntheticProcess> {
        let process = Arc::new(process);
        self.names
            .write()
            .push(ProcessInfo::new(process.pid, filename));
        self.processes.write().insert(process.pid, Arc::clone(&process));
        process
    }

    /// Number of successful `open_process` calls
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ProcessOpener for SyntheticOpener {
    fn open_process(&self, pid: ProcessId) -> MemoryResult<Arc<dyn ProcessMemory>> {
        let process = self
            .processes
            .read()
            .get(&pid)
            .cloned()
            .ok_or_else(|| MemoryError::ProcessNotFound(format!("PID: {}", pid)))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(process as Arc<dyn ProcessMemory>)
    }

    fn list_candidate_processes(&self) -> MemoryResult<Vec<ProcessInfo>> {
        Ok(self.names.read().clone())
    }
}
