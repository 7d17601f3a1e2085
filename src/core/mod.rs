//! Core module containing fundamental types for Memory-Recorder
//!
//! Everything in here is platform independent: the process backends, the
//! resolver and the recorder all speak these types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, AddressWidth, ChainBase, Frame, MemoryError, MemoryResult, MemoryValue, ModuleEntry,
    PointerChain, ProcessId, ProcessInfo, RecordingSummary, Timestamp, ValueType,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
