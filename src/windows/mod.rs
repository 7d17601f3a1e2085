//! Windows API layer
//!
//! Thin wrappers around the Win32 calls the Windows process backend needs.
//! All unsafe FFI is contained in here.

pub mod bindings;
pub mod types;
pub mod utils;

pub use bindings::{kernel32, psapi, user32};
pub use types::Handle;
