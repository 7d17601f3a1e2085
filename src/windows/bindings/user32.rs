//! User32 window enumeration via the `windows` crate

use crate::core::types::{MemoryError, MemoryResult, ProcessId};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::{EnumWindows, GetWindowThreadProcessId};

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<HWND>);
    windows.push(hwnd);
    BOOL(1)
}

/// All top-level windows on the current desktop
pub fn enum_top_level_windows() -> MemoryResult<Vec<HWND>> {
    let mut windows: Vec<HWND> = Vec::new();
    unsafe {
        EnumWindows(
            Some(collect_window),
            LPARAM(&mut windows as *mut Vec<HWND> as isize),
        )
    }
    .map_err(|e| MemoryError::WindowsApi(format!("EnumWindows failed: {}", e)))?;
    Ok(windows)
}

/// Process owning `hwnd`, if the window still exists
pub fn window_process_id(hwnd: HWND) -> Option<ProcessId> {
    let mut pid: u32 = 0;
    let thread = unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32)) };
    (thread != 0 && pid != 0).then_some(pid)
}

/// Distinct owners of top-level windows, in first-seen order
pub fn window_owner_pids() -> MemoryResult<Vec<ProcessId>> {
    let mut pids = Vec::new();
    for hwnd in enum_top_level_windows()? {
        if let Some(pid) = window_process_id(hwnd) {
            if !pids.contains(&pid) {
                pids.push(pid);
            }
        }
    }
    Ok(pids)
}
