//! Kernel32.dll bindings for process access and architecture queries

use crate::core::types::{Address, MemoryError, MemoryResult, ProcessId};
use std::mem;
use winapi::shared::minwindef::{BOOL, FALSE, LPVOID};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::ReadProcessMemory;
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::sysinfoapi::{GetNativeSystemInfo, SYSTEM_INFO};
use winapi::um::winnt::HANDLE;
use winapi::um::wow64apiset::IsWow64Process;

const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_PARAMETER: u32 = 87;

/// Processor architecture codes from SYSTEM_INFO
pub const PROCESSOR_ARCHITECTURE_AMD64: u16 = 9;
pub const PROCESSOR_ARCHITECTURE_IA64: u16 = 6;
pub const PROCESSOR_ARCHITECTURE_ARM64: u16 = 12;

/// Safe wrapper for OpenProcess
pub fn open_process(pid: ProcessId, desired_access: u32) -> MemoryResult<HANDLE> {
    unsafe {
        let handle = OpenProcess(desired_access, FALSE, pid);
        if !handle.is_null() {
            return Ok(handle);
        }
        match GetLastError() {
            ERROR_ACCESS_DENIED => Err(MemoryError::access_denied(pid, "OpenProcess refused")),
            ERROR_INVALID_PARAMETER => Err(MemoryError::ProcessNotFound(format!("PID: {}", pid))),
            code => Err(MemoryError::WindowsApi(format!(
                "OpenProcess({}) failed with error {}",
                pid, code
            ))),
        }
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle
pub unsafe fn close_handle(handle: HANDLE) -> MemoryResult<()> {
    if handle.is_null() {
        return Ok(());
    }

    if CloseHandle(handle) == FALSE {
        Err(MemoryError::WindowsApi("Failed to close handle".to_string()))
    } else {
        Ok(())
    }
}

/// Safe wrapper for ReadProcessMemory. Returns the number of bytes read.
///
/// # Safety
/// The handle must be a valid process handle with PROCESS_VM_READ
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: Address,
    buffer: &mut [u8],
) -> MemoryResult<usize> {
    let target = usize::try_from(address.as_u64())
        .map_err(|_| MemoryError::read_failed(address, "address exceeds the native pointer size"))?;
    let mut bytes_read = 0;

    let result = ReadProcessMemory(
        handle,
        target as LPVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        Err(MemoryError::read_failed(
            address,
            format!("ReadProcessMemory failed with error {}", GetLastError()),
        ))
    } else {
        Ok(bytes_read)
    }
}

/// Processor architecture of the machine, ignoring any WOW64 layer
pub fn native_processor_architecture() -> u16 {
    unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetNativeSystemInfo(&mut info);
        info.u.s().wProcessorArchitecture
    }
}

/// True when the machine runs a 64-bit Windows
pub fn is_64bit_machine() -> bool {
    matches!(
        native_processor_architecture(),
        PROCESSOR_ARCHITECTURE_AMD64 | PROCESSOR_ARCHITECTURE_IA64 | PROCESSOR_ARCHITECTURE_ARM64
    )
}

/// Safe wrapper for IsWow64Process
///
/// # Safety
/// The handle must be a valid process handle with query rights
pub unsafe fn is_wow64_process(handle: HANDLE) -> MemoryResult<bool> {
    let mut wow64: BOOL = FALSE;
    if IsWow64Process(handle, &mut wow64) == FALSE {
        return Err(MemoryError::WindowsApi(format!(
            "IsWow64Process failed with error {}",
            GetLastError()
        )));
    }
    Ok(wow64 != FALSE)
}
