//! Windows backend built on the Win32 process APIs

use super::{ProcessKey, ProcessMemory, ProcessOpener, DEFAULT_MODULE_CAPACITY};
use crate::core::types::{
    Address, AddressWidth, MemoryError, MemoryResult, ModuleEntry, ProcessId, ProcessInfo,
};
use crate::windows::bindings::{kernel32, psapi, user32};
use crate::windows::types::Handle;
use crate::windows::utils::extract_filename;
use std::sync::Arc;
use tracing::{debug, trace};
use winapi::um::winnt::{PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

const READ_ACCESS: u32 = PROCESS_QUERY_INFORMATION | PROCESS_VM_READ;

/// An opened Windows process
#[derive(Debug)]
pub struct Win32Process {
    key: ProcessKey,
    pid: ProcessId,
    handle: Handle,
}

impl Win32Process {
    /// Opens `pid` with query and read access
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let handle = Handle::new(kernel32::open_process(pid, READ_ACCESS)?);
        Ok(Win32Process {
            key: ProcessKey::next(),
            pid,
            handle,
        })
    }

    /// File name of the main executable
    pub fn image_name(&self) -> MemoryResult<String> {
        let path = unsafe { psapi::get_process_image_path(self.handle.raw())? };
        Ok(extract_filename(&path))
    }
}

impl ProcessMemory for Win32Process {
    fn key(&self) -> ProcessKey {
        self.key
    }

    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_bytes(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        let read = unsafe { kernel32::read_process_memory(self.handle.raw(), address, buffer)? };
        if read != buffer.len() {
            return Err(MemoryError::read_failed(
                address,
                format!("short read, got {} of {} bytes", read, buffer.len()),
            ));
        }
        Ok(())
    }

    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleEntry>> {
        let handle = self.handle.raw();
        let modules = unsafe { psapi::enum_process_modules(handle, DEFAULT_MODULE_CAPACITY) }
            .map_err(|e| MemoryError::enumeration_failed(self.pid, e.to_string()))?;

        let mut entries = Vec::with_capacity(modules.len());
        for module in modules {
            match unsafe { psapi::get_module_base_name(handle, module) } {
                Ok(name) => entries.push(ModuleEntry::new(name, Address::new(module as u64))),
                Err(e) => trace!(pid = self.pid, error = %e, "skipping unnamed module"),
            }
        }
        Ok(entries)
    }

    fn detect_address_width(&self) -> MemoryResult<AddressWidth> {
        if !kernel32::is_64bit_machine() {
            return Ok(AddressWidth::Bits32);
        }
        match unsafe { kernel32::is_wow64_process(self.handle.raw()) } {
            Ok(true) => Ok(AddressWidth::Bits32),
            Ok(false) => Ok(AddressWidth::Bits64),
            Err(e) => Err(MemoryError::WidthUnknown(format!("pid {}: {}", self.pid, e))),
        }
    }
}

/// Opens Win32 processes and lists the ones that own a top-level window
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Opener;

impl Win32Opener {
    /// Creates a new opener
    pub fn new() -> Self {
        Win32Opener
    }
}

impl ProcessOpener for Win32Opener {
    fn open_process(&self, pid: ProcessId) -> MemoryResult<Arc<dyn ProcessMemory>> {
        let process = Win32Process::open(pid)?;
        debug!(pid, key = %process.key(), "opened process");
        Ok(Arc::new(process) as Arc<dyn ProcessMemory>)
    }

    fn list_candidate_processes(&self) -> MemoryResult<Vec<ProcessInfo>> {
        let mut processes = Vec::new();
        for pid in user32::window_owner_pids()? {
            let process = match Win32Process::open(pid) {
                Ok(process) => process,
                Err(e) => {
                    trace!(pid, error = %e, "skipping window owner");
                    continue;
                }
            };
            match process.image_name() {
                Ok(filename) => processes.push(ProcessInfo::new(pid, filename)),
                Err(e) => trace!(pid, error = %e, "no image name"),
            }
        }
        Ok(processes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_current_process() {
        let process = Win32Process::open(std::process::id()).unwrap();
        assert_eq!(
            process.detect_address_width().unwrap(),
            AddressWidth::native()
        );
        assert!(!process.enumerate_modules().unwrap().is_empty());
        assert!(process.image_name().unwrap().to_ascii_lowercase().ends_with(".exe"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_read_own_memory() {
        let value: u32 = 0xCAFE_F00D;
        let process = Win32Process::open(std::process::id()).unwrap();
        let bytes = process
            .read_vec(Address::new(&value as *const u32 as u64), 4)
            .unwrap();
        assert_eq!(bytes, value.to_le_bytes());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_invalid_pid() {
        assert!(Win32Process::open(0).is_err());
    }
}
