//! Reading target memory
//!
//! [`MemoryReader`] bounds and decodes raw reads; [`PointerResolver`] walks
//! pointer chains with the arithmetic of the target's address width.

pub mod pointer;
pub mod reader;

pub use pointer::{walk, PointerResolver, PointerWidth, Width32, Width64};
pub use reader::{MemoryReader, DEFAULT_MAX_READ_SIZE};
