//! Pointer chain resolution
//!
//! A chain `[o0, o1, .., on]` over a base `b` resolves to
//! `deref(..deref(deref(b + o0) + o1)..) + on`. The first offset is applied
//! to the base itself; every later offset follows one pointer-sized read.
//! All arithmetic happens at the target's width, so a 32-bit target wraps
//! at 2^32 exactly as its own code would.

use crate::core::types::{Address, AddressWidth, ChainBase, MemoryError, MemoryResult, PointerChain};
use crate::process::{ModuleCache, ProcessMemory};
use tracing::trace;

/// Pointer arithmetic of one address width
pub trait PointerWidth {
    /// Native pointer integer
    type Ptr: Copy + Into<u64>;

    /// Width tag
    const WIDTH: AddressWidth;

    /// Size of a pointer in bytes
    const SIZE: usize;

    /// Narrows an address to this width
    fn truncate(address: Address) -> Self::Ptr;

    /// Little-endian pointer stored in `bytes[..SIZE]`
    fn decode(bytes: &[u8]) -> Self::Ptr;

    /// `ptr + offset`, wrapping at this width. Negative offsets subtract
    /// their magnitude.
    fn add_offset(ptr: Self::Ptr, offset: i64) -> Self::Ptr;
}

/// 4-byte pointers
#[derive(Debug, Clone, Copy)]
pub struct Width32;

/// 8-byte pointers
#[derive(Debug, Clone, Copy)]
pub struct Width64;

impl PointerWidth for Width32 {
    type Ptr = u32;
    const WIDTH: AddressWidth = AddressWidth::Bits32;
    const SIZE: usize = 4;

    fn truncate(address: Address) -> u32 {
        address.as_u64() as u32
    }

    fn decode(bytes: &[u8]) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        u32::from_le_bytes(raw)
    }

    fn add_offset(ptr: u32, offset: i64) -> u32 {
        let magnitude = offset.unsigned_abs() as u32;
        if offset < 0 {
            ptr.wrapping_sub(magnitude)
        } else {
            ptr.wrapping_add(magnitude)
        }
    }
}

impl PointerWidth for Width64 {
    type Ptr = u64;
    const WIDTH: AddressWidth = AddressWidth::Bits64;
    const SIZE: usize = 8;

    fn truncate(address: Address) -> u64 {
        address.as_u64()
    }

    fn decode(bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        u64::from_le_bytes(raw)
    }

    fn add_offset(ptr: u64, offset: i64) -> u64 {
        let magnitude = offset.unsigned_abs();
        if offset < 0 {
            ptr.wrapping_sub(magnitude)
        } else {
            ptr.wrapping_add(magnitude)
        }
    }
}

/// Walks `offsets` from `base` with the arithmetic of `W`.
///
/// An empty chain returns `base` untouched. A failed read at hop `i`
/// (0-based, counting dereferences) is reported as
/// [`MemoryError::PointerChainBroken`] with `level = i`.
pub fn walk<W: PointerWidth>(
    process: &dyn ProcessMemory,
    base: Address,
    offsets: &[i64],
) -> MemoryResult<Address> {
    let Some((&first, rest)) = offsets.split_first() else {
        return Ok(base);
    };

    let mut current = W::add_offset(W::truncate(base), first);
    let mut buffer = [0u8; 8];

    for (level, &offset) in rest.iter().enumerate() {
        let at = Address::new(current.into());
        process
            .read_bytes(at, &mut buffer[..W::SIZE])
            .map_err(|e| MemoryError::pointer_chain_broken(level, at, e.to_string()))?;

        let pointer = W::decode(&buffer);
        trace!(level, %at, pointer = Into::<u64>::into(pointer), "dereferenced");
        current = W::add_offset(pointer, offset);
    }

    Ok(Address::new(current.into()))
}

/// Resolves pointer chains inside one process
#[derive(Clone, Copy)]
pub struct PointerResolver<'a> {
    process: &'a dyn ProcessMemory,
    width: AddressWidth,
}

impl<'a> PointerResolver<'a> {
    /// Resolver for `process`, whose pointers are `width` wide
    pub fn new(process: &'a dyn ProcessMemory, width: AddressWidth) -> Self {
        PointerResolver { process, width }
    }

    /// Width used for reads and arithmetic
    pub fn width(&self) -> AddressWidth {
        self.width
    }

    /// Final address of `offsets` applied from `base`
    pub fn resolve(&self, base: Address, offsets: &[i64]) -> MemoryResult<Address> {
        match self.width {
            AddressWidth::Bits32 => walk::<Width32>(self.process, base, offsets),
            AddressWidth::Bits64 => walk::<Width64>(self.process, base, offsets),
        }
    }

    /// Like [`resolve`](Self::resolve), starting from the base of `module_name`.
    ///
    /// An unknown module fails before any memory is read.
    pub fn resolve_from_module(
        &self,
        modules: &ModuleCache,
        module_name: &str,
        offsets: &[i64],
    ) -> MemoryResult<Address> {
        let base = modules.base_address_of(self.process, module_name)?;
        self.resolve(base, offsets)
    }

    /// Resolves a parsed chain of either base kind
    pub fn resolve_chain(&self, modules: &ModuleCache, chain: &PointerChain) -> MemoryResult<Address> {
        match &chain.base {
            ChainBase::Address(base) => self.resolve(*base, &chain.offsets),
            ChainBase::Module(name) => self.resolve_from_module(modules, name, &chain.offsets),
        }
    }

    /// Reads one pointer-sized value at `address`
    pub fn read_pointer(&self, address: Address) -> MemoryResult<Address> {
        let mut buffer = [0u8; 8];
        let size = self.width.pointer_size();
        self.process.read_bytes(address, &mut buffer[..size])?;
        Ok(Address::new(match self.width {
            AddressWidth::Bits32 => Width32::decode(&buffer).into(),
            AddressWidth::Bits64 => Width64::decode(&buffer),
        }))
    }
}
