//! Core type definitions for Memory-Recorder
//!
//! Address and width types, pointer chains, frames, typed values and the
//! crate-wide error type.

mod address;
mod chain;
mod error;
mod frame;
mod process_info;
mod value;

// Re-export all public types
pub use address::Address;
pub use chain::{ChainBase, PointerChain};
pub use error::{MemoryError, MemoryResult};
pub use frame::{Frame, RecordingSummary, Timestamp};
pub use process_info::{AddressWidth, ModuleEntry, ProcessInfo};
pub use value::{MemoryValue, ValueType};

// Common type aliases
pub type ProcessId = u32;
