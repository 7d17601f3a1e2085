//! PSAPI.dll bindings for module enumeration and image names

use crate::core::types::{MemoryError, MemoryResult};
use crate::windows::utils::wide_to_string;
use std::ptr;
use winapi::shared::minwindef::{DWORD, FALSE, HMODULE, MAX_PATH};
use winapi::um::psapi::{
    EnumProcessModulesEx, GetModuleBaseNameW, GetModuleFileNameExW, LIST_MODULES_ALL,
};
use winapi::um::winnt::HANDLE;

/// Safe wrapper for EnumProcessModulesEx covering both 32 and 64-bit modules.
///
/// At most `capacity` handles are returned.
///
/// # Safety
/// The handle must be a valid process handle with query and read rights
pub unsafe fn enum_process_modules(handle: HANDLE, capacity: usize) -> MemoryResult<Vec<HMODULE>> {
    let mut modules: Vec<HMODULE> = vec![ptr::null_mut(); capacity];
    let mut bytes_needed: DWORD = 0;

    let result = EnumProcessModulesEx(
        handle,
        modules.as_mut_ptr(),
        (modules.len() * std::mem::size_of::<HMODULE>()) as DWORD,
        &mut bytes_needed,
        LIST_MODULES_ALL,
    );

    if result == FALSE {
        return Err(MemoryError::WindowsApi(
            "Failed to enumerate process modules".to_string(),
        ));
    }

    let count = bytes_needed as usize / std::mem::size_of::<HMODULE>();
    modules.truncate(count.min(capacity));
    Ok(modules)
}

/// Safe wrapper for GetModuleBaseNameW
///
/// # Safety
/// The handle must be a valid process handle and module must belong to it
pub unsafe fn get_module_base_name(handle: HANDLE, module: HMODULE) -> MemoryResult<String> {
    let mut buffer = vec![0u16; MAX_PATH];
    let len = GetModuleBaseNameW(handle, module, buffer.as_mut_ptr(), buffer.len() as DWORD);

    if len == 0 {
        return Err(MemoryError::WindowsApi(
            "Failed to get module base name".to_string(),
        ));
    }
    Ok(wide_to_string(&buffer[..len as usize]))
}

/// Full path of the main executable of the process
///
/// # Safety
/// The handle must be a valid process handle with query and read rights
pub unsafe fn get_process_image_path(handle: HANDLE) -> MemoryResult<String> {
    let mut buffer = vec![0u16; MAX_PATH];
    let len = GetModuleFileNameExW(
        handle,
        ptr::null_mut(),
        buffer.as_mut_ptr(),
        buffer.len() as DWORD,
    );

    if len == 0 {
        return Err(MemoryError::WindowsApi(
            "Failed to get process image path".to_string(),
        ));
    }
    Ok(wide_to_string(&buffer[..len as usize]))
}
