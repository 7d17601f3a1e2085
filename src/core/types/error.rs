//! Custom error types for Memory-Recorder

use std::fmt;
use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid pointer chain: {0}")]
    InvalidPointerChain(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Access denied to process {pid}: {reason}")]
    AccessDenied { pid: u32, reason: String },

    #[error("Failed to read memory at {address}: {reason}")]
    ReadFailed { address: String, reason: String },

    #[error("Failed to enumerate modules of process {pid}: {reason}")]
    ModuleEnumerationFailed { pid: u32, reason: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Pointer chain broken at level {level} ({address}): {reason}")]
    PointerChainBroken {
        level: usize,
        address: String,
        reason: String,
    },

    #[error("Address width unknown: {0}")]
    WidthUnknown(String),

    #[error("Buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("Read of {requested} bytes exceeds the limit of {limit} bytes")]
    ReadTooLarge { requested: usize, limit: usize },

    #[error("No frames captured")]
    NoFrames,

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Windows API: {0}")]
    WindowsApi(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates an access denied error for a process
    pub fn access_denied(pid: u32, reason: impl Into<String>) -> Self {
        MemoryError::AccessDenied {
            pid,
            reason: reason.into(),
        }
    }

    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ReadFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a module enumeration error
    pub fn enumeration_failed(pid: u32, reason: impl Into<String>) -> Self {
        MemoryError::ModuleEnumerationFailed {
            pid,
            reason: reason.into(),
        }
    }

    /// Creates a pointer chain broken error for the hop at `level`
    pub fn pointer_chain_broken(
        level: usize,
        address: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        MemoryError::PointerChainBroken {
            level,
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a buffer too small error
    pub fn buffer_too_small(expected: usize, actual: usize) -> Self {
        MemoryError::BufferTooSmall { expected, actual }
    }

    /// True for errors that come from the operating system or the target process
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            MemoryError::ProcessNotFound(_)
                | MemoryError::AccessDenied { .. }
                | MemoryError::ReadFailed { .. }
                | MemoryError::ModuleEnumerationFailed { .. }
                | MemoryError::WindowsApi(_)
                | MemoryError::IoError(_)
        )
    }

    /// True for "nothing there" results: unknown module or empty recording
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemoryError::ModuleNotFound(_) | MemoryError::NoFrames)
    }

    /// True for invalid recorder transitions
    pub fn is_state_error(&self) -> bool {
        matches!(self, MemoryError::AlreadyRecording | MemoryError::NotRecording)
    }
}
