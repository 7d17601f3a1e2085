//! Owned HANDLE with automatic cleanup

use crate::windows::bindings::kernel32;
use std::ptr;
use winapi::um::winnt::HANDLE;

/// Owns a Windows HANDLE and closes it on drop
#[derive(Debug)]
pub struct Handle {
    handle: HANDLE,
}

impl Handle {
    /// Takes ownership of `handle`
    pub fn new(handle: HANDLE) -> Self {
        Handle { handle }
    }

    /// Check if handle is null
    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    /// Get the raw handle
    pub fn raw(&self) -> HANDLE {
        self.handle
    }

    /// Release ownership without closing
    pub fn take(mut self) -> HANDLE {
        std::mem::replace(&mut self.handle, ptr::null_mut())
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                let _ = kernel32::close_handle(self.handle);
            }
        }
    }
}

// Process handles are plain kernel object references, usable from any thread.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}
