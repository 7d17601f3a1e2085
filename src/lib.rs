//! Memory-Recorder: pointer-chain resolution and time-indexed recording of
//! another process's memory.
//!
//! The core is platform independent and talks to targets through
//! [`process::ProcessMemory`]. Linux targets are read through procfs,
//! Windows targets through the Win32 process APIs, and tests use the
//! in-memory [`process::SyntheticProcess`].

pub mod cli;
pub mod config;
pub mod core;
pub mod memory;
pub mod process;
pub mod record;
pub mod session;
#[cfg(windows)]
pub mod windows;

pub use crate::core::types::{
    Address, AddressWidth, ChainBase, Frame, MemoryError, MemoryResult, MemoryValue, ModuleEntry,
    PointerChain, ProcessId, ProcessInfo, RecordingSummary, Timestamp, ValueType,
};
pub use crate::core::{AUTHORS, VERSION};
pub use crate::memory::{MemoryReader, PointerResolver};
pub use crate::process::{ModuleCache, ProcessMemory, ProcessOpener, WidthResolver};
pub use crate::record::{CaptureSettings, Recorder, Recording};
pub use crate::session::Session;
