//! Process, module and address width types

use super::{Address, ProcessId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A process the operator can attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub filename: String,
}

impl ProcessInfo {
    /// Creates a new ProcessInfo
    pub fn new(pid: ProcessId, filename: impl Into<String>) -> Self {
        ProcessInfo {
            pid,
            filename: filename.into(),
        }
    }

    /// Check if the executable name matches (case-insensitive)
    pub fn name_matches(&self, name: &str) -> bool {
        self.filename.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pid, self.filename)
    }
}

/// Pointer width of a target process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressWidth {
    /// 4-byte pointers (x86, or a 32-bit process under WOW64)
    Bits32,
    /// 8-byte pointers
    Bits64,
}

impl AddressWidth {
    /// Returns the pointer size in bytes
    pub const fn pointer_size(&self) -> usize {
        match self {
            AddressWidth::Bits32 => 4,
            AddressWidth::Bits64 => 8,
        }
    }

    /// Returns the width in bits
    pub const fn bits(&self) -> u32 {
        match self {
            AddressWidth::Bits32 => 32,
            AddressWidth::Bits64 => 64,
        }
    }

    /// Width of the machine this crate was built for
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            AddressWidth::Bits64
        } else {
            AddressWidth::Bits32
        }
    }

    /// Truncates an address to this width
    pub const fn truncate(&self, address: Address) -> Address {
        match self {
            AddressWidth::Bits32 => Address(address.0 as u32 as u64),
            AddressWidth::Bits64 => address,
        }
    }
}

impl fmt::Display for AddressWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// A loaded module as reported by module enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub base_address: Address,
}

impl ModuleEntry {
    /// Creates a new ModuleEntry
    pub fn new(name: impl Into<String>, base_address: Address) -> Self {
        ModuleEntry {
            name: name.into(),
            base_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_info_json_shape() {
        let info = ProcessInfo::new(1234, "notepad.exe");
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"pid":1234,"filename":"notepad.exe"}"#);
        assert!(info.name_matches("NOTEPAD.EXE"));
        assert_eq!(info.to_string(), "[1234] notepad.exe");
    }

    #[test]
    fn test_address_width() {
        assert_eq!(AddressWidth::Bits32.pointer_size(), 4);
        assert_eq!(AddressWidth::Bits64.pointer_size(), 8);
        assert_eq!(AddressWidth::Bits32.to_string(), "32-bit");
        assert_eq!(
            AddressWidth::Bits32.truncate(Address::new(0x1_0000_1000)),
            Address::new(0x1000)
        );
        assert_eq!(
            AddressWidth::Bits64.truncate(Address::new(0x1_0000_1000)),
            Address::new(0x1_0000_1000)
        );
    }

    #[test]
    fn test_native_width() {
        #[cfg(target_pointer_width = "64")]
        assert_eq!(AddressWidth::native(), AddressWidth::Bits64);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(AddressWidth::native(), AddressWidth::Bits32);
    }
}
