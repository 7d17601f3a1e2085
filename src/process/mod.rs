//! Access to target processes
//!
//! [`ProcessMemory`] is the seam between the resolver/recorder and the
//! operating system: read bytes, list modules, report pointer width. Each
//! platform backend implements it, as does the in-memory [`SyntheticProcess`].
//! On top of the seam sit the per-process [`WidthResolver`] and
//! [`ModuleCache`].

pub mod modules;
pub mod synthetic;
pub mod width;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

pub use modules::{ModuleCache, DEFAULT_MODULE_CAPACITY};
pub use synthetic::{SyntheticOpener, SyntheticProcess};
pub use width::WidthResolver;

#[cfg(target_os = "linux")]
pub use linux::{ProcfsOpener as NativeOpener, ProcfsProcess};
#[cfg(windows)]
pub use self::windows::{Win32Opener as NativeOpener, Win32Process};

use crate::core::types::{
    Address, AddressWidth, MemoryResult, ModuleEntry, ProcessId, ProcessInfo,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of one opened process handle.
///
/// Allocated from a process-wide counter when a handle is opened and never
/// reused, so a cache slot can not be inherited by a later handle that
/// happens to get the same OS value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessKey(u64);

impl ProcessKey {
    /// Allocates a fresh key
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ProcessKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw key value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Blocking primitive operations on one opened target process.
///
/// Closing the process is dropping the value.
pub trait ProcessMemory: Send + Sync {
    /// Identity of this handle, used to key per-process caches
    fn key(&self) -> ProcessKey;

    /// Process ID of the target
    fn pid(&self) -> ProcessId;

    /// Fills `buffer` from `address`. A short read is an error.
    fn read_bytes(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()>;

    /// Lists the modules currently loaded in the target
    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleEntry>>;

    /// Reports whether the target uses 4 or 8 byte pointers
    fn detect_address_width(&self) -> MemoryResult<AddressWidth>;

    /// Reads `count` bytes into a fresh buffer
    fn read_vec(&self, address: Address, count: usize) -> MemoryResult<Vec<u8>> {
        let mut buffer = vec![0u8; count];
        if count > 0 {
            self.read_bytes(address, &mut buffer)?;
        }
        Ok(buffer)
    }
}

/// Opens processes and lists the ones worth attaching to
pub trait ProcessOpener: Send + Sync {
    /// Opens `pid` for reading
    fn open_process(&self, pid: ProcessId) -> MemoryResult<Arc<dyn ProcessMemory>>;

    /// Processes a user is likely to want to inspect
    fn list_candidate_processes(&self) -> MemoryResult<Vec<ProcessInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_keys_are_unique() {
        let a = ProcessKey::next();
        let b = ProcessKey::next();
        assert_ne!(a, b);
        assert!(b.value() > a.value());
        assert!(a.to_string().starts_with('#'));
    }

    #[test]
    fn test_read_vec_zero_length_skips_read() {
        let process = SyntheticProcess::new(1, AddressWidth::Bits64);
        process.fail_next_reads(1);
        assert!(process.read_vec(Address::new(0x1000), 0).unwrap().is_empty());
        assert_eq!(process.read_count(), 0);
    }
}
