//! Module base address cache
//!
//! Module enumeration is expensive, so each process gets a slot that is
//! filled by a single enumeration and then only read. Slots carry their own
//! lock: populating one process never blocks lookups for another, and
//! readers of a slot being populated wait for the population to finish.

use super::{ProcessKey, ProcessMemory};
use crate::core::types::{Address, MemoryError, MemoryResult, ModuleEntry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default bound on how many modules one enumeration records
pub const DEFAULT_MODULE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct SlotState {
    populated: bool,
    // lowercased name -> entry with the display name
    modules: HashMap<String, ModuleEntry>,
    order: Vec<String>,
}

#[derive(Debug, Default)]
struct ModuleSlot {
    state: RwLock<SlotState>,
}

/// Process-keyed cache of module name to base address.
///
/// Entries are never refreshed: a module that unloads and reloads at a new
/// base keeps its old address until the slot is evicted.
#[derive(Debug)]
pub struct ModuleCache {
    slots: RwLock<HashMap<ProcessKey, Arc<ModuleSlot>>>,
    capacity: usize,
}

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleCache {
    /// Creates a cache recording at most [`DEFAULT_MODULE_CAPACITY`] modules per process
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MODULE_CAPACITY)
    }

    /// Creates a cache recording at most `capacity` modules per process
    pub fn with_capacity(capacity: usize) -> Self {
        ModuleCache {
            slots: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Base address of `module_name` in `process`.
    ///
    /// Names compare case-insensitively. The first miss for a process
    /// enumerates its modules; later misses answer `ModuleNotFound` without
    /// enumerating again.
    pub fn base_address_of(
        &self,
        process: &dyn ProcessMemory,
        module_name: &str,
    ) -> MemoryResult<Address> {
        let needle = module_name.to_ascii_lowercase();
        let slot = self.slot(process.key());

        {
            let state = slot.state.read();
            if state.populated {
                return Self::lookup(&state, &needle, module_name);
            }
        }

        let mut state = slot.state.write();
        if !state.populated {
            self.populate(process, &mut state)?;
        }
        Self::lookup(&state, &needle, module_name)
    }

    /// All cached modules of `process` in enumeration order, populating if needed
    pub fn modules(&self, process: &dyn ProcessMemory) -> MemoryResult<Vec<ModuleEntry>> {
        let slot = self.slot(process.key());
        {
            let state = slot.state.read();
            if state.populated {
                return Ok(Self::ordered(&state));
            }
        }

        let mut state = slot.state.write();
        if !state.populated {
            self.populate(process, &mut state)?;
        }
        Ok(Self::ordered(&state))
    }

    /// True once the slot for `key` has been filled
    pub fn is_populated(&self, key: ProcessKey) -> bool {
        // Release the slot map before waiting on a slot under population.
        let slot = self.slots.read().get(&key).cloned();
        slot.map(|slot| slot.state.read().populated).unwrap_or(false)
    }

    /// Drops the slot of a closed handle. Returns whether a slot existed.
    pub fn evict(&self, key: ProcessKey) -> bool {
        self.slots.write().remove(&key).is_some()
    }

    /// Number of process slots
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when no process has a slot
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Per-process enumeration bound
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot(&self, key: ProcessKey) -> Arc<ModuleSlot> {
        let existing = self.slots.read().get(&key).cloned();
        if let Some(slot) = existing {
            return slot;
        }
        Arc::clone(self.slots.write().entry(key).or_default())
    }

    fn populate(&self, process: &dyn ProcessMemory, state: &mut SlotState) -> MemoryResult<()> {
        let entries = process.enumerate_modules()?;
        let total = entries.len();

        for entry in entries.into_iter().take(self.capacity) {
            let key = entry.name.to_ascii_lowercase();
            if !state.modules.contains_key(&key) {
                state.order.push(key.clone());
            }
            state.modules.insert(key, entry);
        }
        state.populated = true;

        if total > self.capacity {
            debug!(
                pid = process.pid(),
                total,
                capacity = self.capacity,
                "module list truncated"
            );
        }
        debug!(
            pid = process.pid(),
            key = %process.key(),
            modules = state.modules.len(),
            "module cache populated"
        );
        Ok(())
    }

    fn lookup(state: &SlotState, needle: &str, module_name: &str) -> MemoryResult<Address> {
        state
            .modules
            .get(needle)
            .map(|entry| entry.base_address)
            .ok_or_else(|| MemoryError::ModuleNotFound(module_name.to_string()))
    }

    fn ordered(state: &SlotState) -> Vec<ModuleEntry> {
        state
            .order
            .iter()
            .filter_map(|key| state.modules.get(key).cloned())
            .collect()
    }
}
