//! Typed views over captured bytes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::MemoryError;

/// A scalar decoded from little-endian process memory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MemoryValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl MemoryValue {
    /// Returns the size in bytes of the value
    pub fn size(&self) -> usize {
        self.value_type().size()
    }

    /// Decodes a value of `value_type` starting at `offset` within `bytes`.
    ///
    /// Returns `None` when the buffer is too short.
    pub fn decode(bytes: &[u8], offset: usize, value_type: ValueType) -> Option<Self> {
        let end = offset.checked_add(value_type.size())?;
        let raw = bytes.get(offset..end)?;

        let value = match value_type {
            ValueType::I8 => MemoryValue::I8(raw[0] as i8),
            ValueType::U8 => MemoryValue::U8(raw[0]),
            ValueType::I16 => MemoryValue::I16(i16::from_le_bytes(raw.try_into().ok()?)),
            ValueType::U16 => MemoryValue::U16(u16::from_le_bytes(raw.try_into().ok()?)),
            ValueType::I32 => MemoryValue::I32(i32::from_le_bytes(raw.try_into().ok()?)),
            ValueType::U32 => MemoryValue::U32(u32::from_le_bytes(raw.try_into().ok()?)),
            ValueType::I64 => MemoryValue::I64(i64::from_le_bytes(raw.try_into().ok()?)),
            ValueType::U64 => MemoryValue::U64(u64::from_le_bytes(raw.try_into().ok()?)),
            ValueType::F32 => MemoryValue::F32(f32::from_le_bytes(raw.try_into().ok()?)),
            ValueType::F64 => MemoryValue::F64(f64::from_le_bytes(raw.try_into().ok()?)),
        };
        Some(value)
    }

    /// Gets the value type enum for this value
    pub fn value_type(&self) -> ValueType {
        match self {
            MemoryValue::I8(_) => ValueType::I8,
            MemoryValue::I16(_) => ValueType::I16,
            MemoryValue::I32(_) => ValueType::I32,
            MemoryValue::I64(_) => ValueType::I64,
            MemoryValue::U8(_) => ValueType::U8,
            MemoryValue::U16(_) => ValueType::U16,
            MemoryValue::U32(_) => ValueType::U32,
            MemoryValue::U64(_) => ValueType::U64,
            MemoryValue::F32(_) => ValueType::F32,
            MemoryValue::F64(_) => ValueType::F64,
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::I8(v) => write!(f, "{}", v),
            MemoryValue::I16(v) => write!(f, "{}", v),
            MemoryValue::I32(v) => write!(f, "{}", v),
            MemoryValue::I64(v) => write!(f, "{}", v),
            MemoryValue::U8(v) => write!(f, "{}", v),
            MemoryValue::U16(v) => write!(f, "{}", v),
            MemoryValue::U32(v) => write!(f, "{}", v),
            MemoryValue::U64(v) => write!(f, "{}", v),
            MemoryValue::F32(v) => write!(f, "{}", v),
            MemoryValue::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Scalar type used to interpret a slice of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ValueType {
    /// Returns the size in bytes for this value type
    pub const fn size(&self) -> usize {
        match self {
            ValueType::I8 | ValueType::U8 => 1,
            ValueType::I16 | ValueType::U16 => 2,
            ValueType::I32 | ValueType::U32 | ValueType::F32 => 4,
            ValueType::I64 | ValueType::U64 | ValueType::F64 => 8,
        }
    }
}

impl FromStr for ValueType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value_type = match s.to_ascii_lowercase().as_str() {
            "i8" | "int8" => ValueType::I8,
            "i16" | "int16" => ValueType::I16,
            "i32" | "int32" => ValueType::I32,
            "i64" | "int64" => ValueType::I64,
            "u8" | "uint8" => ValueType::U8,
            "u16" | "uint16" => ValueType::U16,
            "u32" | "uint32" => ValueType::U32,
            "u64" | "uint64" => ValueType::U64,
            "f32" | "float32" => ValueType::F32,
            "f64" | "float64" => ValueType::F64,
            other => {
                return Err(MemoryError::UnsupportedOperation(format!(
                    "unknown value type '{}'",
                    other
                )))
            }
        };
        Ok(value_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_size() {
        assert_eq!(MemoryValue::I32(42).size(), 4);
        assert_eq!(MemoryValue::U64(100).size(), 8);
        assert_eq!(MemoryValue::U8(1).size(), 1);
    }

    #[test]
    fn test_decode_at_offset() {
        let bytes = [0xAA, 0x78, 0x56, 0x34, 0x12, 0xFF];
        assert_eq!(
            MemoryValue::decode(&bytes, 1, ValueType::U32),
            Some(MemoryValue::U32(0x12345678))
        );
        assert_eq!(
            MemoryValue::decode(&bytes, 5, ValueType::I8),
            Some(MemoryValue::I8(-1))
        );
        assert_eq!(
            MemoryValue::decode(&1.5f64.to_le_bytes(), 0, ValueType::F64),
            Some(MemoryValue::F64(1.5))
        );
    }

    #[test]
    fn test_decode_out_of_bounds() {
        let bytes = [0u8; 4];
        assert_eq!(MemoryValue::decode(&bytes, 1, ValueType::U32), None);
        assert_eq!(MemoryValue::decode(&bytes, usize::MAX, ValueType::U8), None);
    }

    #[test]
    fn test_value_type_parsing() {
        assert_eq!("u32".parse::<ValueType>().unwrap(), ValueType::U32);
        assert_eq!("Float64".parse::<ValueType>().unwrap(), ValueType::F64);
        assert!("string".parse::<ValueType>().is_err());
    }
}
