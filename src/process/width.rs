//! Per-process pointer width detection

use super::{ProcessKey, ProcessMemory};
use crate::core::types::{AddressWidth, MemoryResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Remembers the pointer width of every process it has been asked about.
///
/// A width is detected once per [`ProcessKey`] and treated as immutable
/// afterwards. Failed detections are not remembered.
#[derive(Debug, Default)]
pub struct WidthResolver {
    widths: RwLock<HashMap<ProcessKey, AddressWidth>>,
}

impl WidthResolver {
    /// Creates an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer width of `process`, detecting it on first use
    pub fn width_of(&self, process: &dyn ProcessMemory) -> MemoryResult<AddressWidth> {
        let key = process.key();
        if let Some(width) = self.widths.read().get(&key) {
            return Ok(*width);
        }

        let width = process.detect_address_width()?;
        debug!(pid = process.pid(), %key, %width, "detected address width");
        Ok(*self.widths.write().entry(key).or_insert(width))
    }

    /// Drops the remembered width for a closed handle
    pub fn forget(&self, key: ProcessKey) -> Option<AddressWidth> {
        self.widths.write().remove(&key)
    }

    /// Number of processes with a known width
    pub fn len(&self) -> usize {
        self.widths.read().len()
    }

    /// True when no width is remembered
    pub fn is_empty(&self) -> bool {
        self.widths.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MemoryError;
    use crate::process::SyntheticProcess;

    #[test]
    fn test_width_is_cached_per_process() {
        let resolver = WidthResolver::new();
        let p32 = SyntheticProcess::new(1, AddressWidth::Bits32);
        let p64 = SyntheticProcess::new(2, AddressWidth::Bits64);

        assert_eq!(resolver.width_of(&p32).unwrap(), AddressWidth::Bits32);
        assert_eq!(resolver.width_of(&p64).unwrap(), AddressWidth::Bits64);
        assert_eq!(resolver.width_of(&p32).unwrap(), AddressWidth::Bits32);
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn test_unknown_width_is_an_error() {
        let resolver = WidthResolver::new();
        let process = SyntheticProcess::with_unknown_width(3);

        assert!(matches!(
            resolver.width_of(&process),
            Err(MemoryError::WidthUnknown(_))
        ));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_forget() {
        let resolver = WidthResolver::new();
        let process = SyntheticProcess::new(1, AddressWidth::Bits64);
        resolver.width_of(&process).unwrap();

        assert_eq!(resolver.forget(process.key()), Some(AddressWidth::Bits64));
        assert_eq!(resolver.forget(process.key()), None);
        assert!(resolver.is_empty());
    }
}
