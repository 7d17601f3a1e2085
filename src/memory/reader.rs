//! Bounded, typed reads over a [`ProcessMemory`]

use crate::core::types::{Address, MemoryError, MemoryResult, MemoryValue, ValueType};
use crate::process::ProcessMemory;

/// Largest single read accepted by default (10 MiB)
pub const DEFAULT_MAX_READ_SIZE: usize = 10 * 1024 * 1024;

/// Memory reader with a per-call size limit
#[derive(Clone, Copy)]
pub struct MemoryReader<'a> {
    process: &'a dyn ProcessMemory,
    max_read_size: usize,
}

impl<'a> MemoryReader<'a> {
    /// Create a reader with [`DEFAULT_MAX_READ_SIZE`]
    pub fn new(process: &'a dyn ProcessMemory) -> Self {
        Self::with_limit(process, DEFAULT_MAX_READ_SIZE)
    }

    /// Create a reader refusing reads above `max_read_size` bytes
    pub fn with_limit(process: &'a dyn ProcessMemory, max_read_size: usize) -> Self {
        MemoryReader {
            process,
            max_read_size,
        }
    }

    /// Read raw bytes from memory
    pub fn read_bytes(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        if size > self.max_read_size {
            return Err(MemoryError::ReadTooLarge {
                requested: size,
                limit: self.max_read_size,
            });
        }
        self.process.read_vec(address, size)
    }

    /// Read a little-endian value of `value_type`
    pub fn read_value(&self, address: Address, value_type: ValueType) -> MemoryResult<MemoryValue> {
        let bytes = self.read_bytes(address, value_type.size())?;
        MemoryValue::decode(&bytes, 0, value_type)
            .ok_or_else(|| MemoryError::buffer_too_small(value_type.size(), bytes.len()))
    }

    /// Read several values of one type laid out back to back
    pub fn read_array(
        &self,
        address: Address,
        value_type: ValueType,
        count: usize,
    ) -> MemoryResult<Vec<MemoryValue>> {
        let size = value_type.size();
        let total = size.checked_mul(count).ok_or(MemoryError::ReadTooLarge {
            requested: usize::MAX,
            limit: self.max_read_size,
        })?;
        let bytes = self.read_bytes(address, total)?;

        (0..count)
            .map(|i| {
                MemoryValue::decode(&bytes, i * size, value_type)
                    .ok_or_else(|| MemoryError::buffer_too_small(total, bytes.len()))
            })
            .collect()
    }

    /// Per-read size limit
    pub fn max_read_size(&self) -> usize {
        self.max_read_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AddressWidth;
    use crate::process::SyntheticProcess;

    fn process() -> SyntheticProcess {
        let process = SyntheticProcess::new(1, AddressWidth::Bits64);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-5i32).to_le_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&[1, 0, 2, 0]);
        process.map_region(Address::new(0x4000), bytes);
        process
    }

    #[test]
    fn test_read_value() {
        let process = process();
        let reader = MemoryReader::new(&process);

        assert_eq!(
            reader.read_value(Address::new(0x4000), ValueType::I32).unwrap(),
            MemoryValue::I32(-5)
        );
        assert_eq!(
            reader.read_value(Address::new(0x4004), ValueType::F32).unwrap(),
            MemoryValue::F32(1.5)
        );
    }

    #[test]
    fn test_read_array() {
        let process = process();
        let values = MemoryReader::new(&process)
            .read_array(Address::new(0x4008), ValueType::U16, 2)
            .unwrap();
        assert_eq!(values, vec![MemoryValue::U16(1), MemoryValue::U16(2)]);
    }

    #[test]
    fn test_read_limit() {
        let process = process();
        let reader = MemoryReader::with_limit(&process, 4);

        assert!(reader.read_bytes(Address::new(0x4000), 4).is_ok());
        match reader.read_bytes(Address::new(0x4000), 5) {
            Err(MemoryError::ReadTooLarge { requested, limit }) => {
                assert_eq!((requested, limit), (5, 4));
            }
            other => panic!("expected ReadTooLarge, got {:?}", other),
        }
        assert_eq!(process.read_count(), 1);
    }

    #[test]
    fn test_unmapped_read_fails() {
        let process = process();
        assert!(MemoryReader::new(&process)
            .read_value(Address::new(0x9000), ValueType::U8)
            .is_err());
    }
}
