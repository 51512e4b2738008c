//! Fixed-capacity slot table keyed by minor identity
//!
//! The table is the single source of truth for which minors are live.
//! All mutation and lookup happens through [`Registry::lock`], so
//! holding the returned guard is holding the exclusion domain; compound
//! sequences (allocate + insert, unpublish + remove) stay atomic.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::transport::ControlTransport;

/// Maximum number of concurrently registered devices.
pub const MAX_DEVICES: usize = 10;

/// Minor identity of a registered session, `0..MAX_DEVICES`.
pub type Minor = usize;

/// Per-slot state: the live association between a minor and the device
/// handle it relays to. The handle is shared with in-flight transfers,
/// not owned exclusively by the slot.
pub struct DeviceEntry {
    pub minor: Minor,
    pub device: Arc<dyn ControlTransport>,
}

/// The slot pool, indexed by minor ID.
pub struct SlotTable {
    slots: [Option<DeviceEntry>; MAX_DEVICES],
}

impl SlotTable {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Lowest free minor, or `None` once all slots are occupied.
    /// Lowest-first keeps freed identities maximally reused.
    pub fn next_free_minor(&self) -> Option<Minor> {
        self.slots.iter().position(Option::is_none)
    }

    /// Occupy a slot. The caller must have checked it is free while
    /// holding the same guard.
    pub fn insert(&mut self, minor: Minor, entry: DeviceEntry) {
        debug_assert!(self.slots[minor].is_none(), "slot {minor} already occupied");
        self.slots[minor] = Some(entry);
    }

    /// Empty a slot, returning the prior occupant. Removing an already
    /// empty slot is a no-op, not an error.
    pub fn remove(&mut self, minor: Minor) -> Option<DeviceEntry> {
        self.slots.get_mut(minor)?.take()
    }

    pub fn get(&self, minor: Minor) -> Option<&DeviceEntry> {
        self.slots.get(minor)?.as_ref()
    }

    /// Occupied minors, ascending.
    pub fn occupied(&self) -> Vec<Minor> {
        (0..MAX_DEVICES).filter(|&m| self.slots[m].is_some()).collect()
    }
}

/// Owner of the slot table and its single exclusion domain.
pub struct Registry {
    table: Mutex<SlotTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(SlotTable::new()),
        }
    }

    /// Enter the exclusion domain.
    pub fn lock(&self) -> MutexGuard<'_, SlotTable> {
        self.table.lock()
    }

    /// Momentary lookup of the device handle bound to a minor.
    ///
    /// The clone keeps the handle alive across a blocking transfer even
    /// if a concurrent detach empties the slot; the transfer itself
    /// must never run under the lock.
    pub fn device(&self, minor: Minor) -> Option<Arc<dyn ControlTransport>> {
        self.table.lock().get(minor).map(|e| e.device.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MuxError;
    use crate::transport::Direction;

    struct NullTransport;

    impl ControlTransport for NullTransport {
        fn exchange(&self, _dir: Direction, report: &mut [u8]) -> Result<usize, MuxError> {
            Ok(report.len())
        }
    }

    fn entry(minor: Minor) -> DeviceEntry {
        DeviceEntry {
            minor,
            device: Arc::new(NullTransport),
        }
    }

    #[test]
    fn allocates_lowest_free_minor() {
        let registry = Registry::new();
        let mut table = registry.lock();
        assert_eq!(table.next_free_minor(), Some(0));
        table.insert(0, entry(0));
        table.insert(1, entry(1));
        assert_eq!(table.next_free_minor(), Some(2));
    }

    #[test]
    fn full_table_has_no_free_minor() {
        let registry = Registry::new();
        let mut table = registry.lock();
        for m in 0..MAX_DEVICES {
            table.insert(m, entry(m));
        }
        assert_eq!(table.next_free_minor(), None);
        assert_eq!(table.occupied().len(), MAX_DEVICES);
    }

    #[test]
    fn freed_minor_is_reused_before_higher_ones() {
        let registry = Registry::new();
        let mut table = registry.lock();
        for m in 0..3 {
            table.insert(m, entry(m));
        }
        assert!(table.remove(1).is_some());
        assert_eq!(table.next_free_minor(), Some(1));
    }

    #[test]
    fn removing_an_empty_slot_is_a_noop() {
        let registry = Registry::new();
        let mut table = registry.lock();
        assert!(table.remove(4).is_none());
        assert!(table.remove(MAX_DEVICES + 1).is_none());
    }

    #[test]
    fn device_lookup_survives_slot_removal() {
        let registry = Registry::new();
        registry.lock().insert(0, entry(0));

        let handle = registry.device(0).expect("occupied slot");
        registry.lock().remove(0);

        // The cloned handle stays usable for an in-flight transfer,
        // but new lookups see the empty slot.
        let mut buf = [0u8; 8];
        assert_eq!(handle.exchange(Direction::DeviceToHost, &mut buf).unwrap(), 8);
        assert!(registry.device(0).is_none());
    }
}
