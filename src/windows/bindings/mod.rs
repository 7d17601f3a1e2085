//! Windows API bindings
//!
//! Low-level FFI wrappers over kernel32, psapi and user32.

pub mod kernel32;
pub mod psapi;
pub mod user32;
