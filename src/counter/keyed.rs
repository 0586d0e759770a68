//! Keyed counter store
//!
//! Wraps a single named slot in an external durable store. The collaborator
//! exposes three individually-atomic calls (get-and-hold, set-and-release,
//! release); composing them into the hold/commit/release protocol happens
//! here.
//!
//! Exclusivity is advisory: the slot's held marker keeps out other sessions
//! only to the extent the collaborator serializes its own calls. Unlike the
//! file backend there is no OS lock underneath. Callers who need hard
//! cross-process exclusion should select the file backend.

use super::CounterStore;
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// Slot key used when the configuration does not name one
pub const DEFAULT_SLOT_KEY: &str = "next_bates_number";

/// External durable store holding one named counter slot
///
/// Each call is atomic at the storage layer. `get_and_hold` on an absent key
/// creates the slot at 0, held.
pub trait SlotStore: Send + Sync {
    /// Read the slot's value and mark it in use
    fn get_and_hold(&self, key: &str) -> Result<i64>;

    /// Write a new value and mark the slot free
    fn set_and_release(&self, key: &str, value: i64) -> Result<()>;

    /// Mark the slot free without writing
    fn release(&self, key: &str) -> Result<()>;
}

/// Counter store over one named slot of a `SlotStore`
pub struct KeyedCounterStore {
    slots: Box<dyn SlotStore>,
    key: String,
    /// Last value observed from the slot (or carried in from configuration);
    /// serves `peek` without touching the collaborator
    cached: i64,
    held: bool,
}

impl KeyedCounterStore {
    /// Wrap a slot store, seeding the peek cache with the last-known value
    pub fn new(slots: Box<dyn SlotStore>, key: impl Into<String>, cached: i64) -> Self {
        Self {
            slots,
            key: key.into(),
            cached,
            held: false,
        }
    }

    /// The value the cache currently reports
    pub fn cached(&self) -> i64 {
        self.cached
    }
}

impl CounterStore for KeyedCounterStore {
    fn peek(&self) -> Option<i64> {
        if self.cached < 0 {
            return None;
        }
        Some(self.cached)
    }

    fn hold(&mut self) -> Result<i64> {
        if self.held {
            return Err(Error::LogicError(format!(
                "hold already outstanding on slot {}",
                self.key
            )));
        }
        let value = self.slots.get_and_hold(&self.key)?;
        self.held = true;
        self.cached = value;
        debug!(slot = %self.key, value, "Acquired slot hold");
        Ok(value)
    }

    fn commit(&mut self, value: i64) -> Result<()> {
        if !self.held {
            return Err(Error::LogicError(format!(
                "commit without hold on slot {}",
                self.key
            )));
        }
        if let Err(e) = self.slots.set_and_release(&self.key, value) {
            // The held marker must not stay stuck behind a failed write
            self.held = false;
            if let Err(release_err) = self.slots.release(&self.key) {
                warn!(slot = %self.key, "Failed to release slot after commit error: {}", release_err);
            }
            return Err(e);
        }
        self.held = false;
        self.cached = value;
        debug!(slot = %self.key, value, "Committed slot value");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        self.slots.release(&self.key)?;
        debug!(slot = %self.key, "Released slot hold");
        Ok(())
    }

    fn source(&self) -> String {
        self.key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::super::MemorySlotStore;
    use super::*;

    #[test]
    fn test_hold_commit_updates_cache() -> Result<()> {
        let slots = MemorySlotStore::new();
        slots.set(DEFAULT_SLOT_KEY, 100);

        let mut store = KeyedCounterStore::new(Box::new(slots), DEFAULT_SLOT_KEY, 7);
        // Cache starts from configuration, not the slot
        assert_eq!(store.peek(), Some(7));

        assert_eq!(store.hold()?, 100);
        assert_eq!(store.peek(), Some(100));

        store.commit(101)?;
        assert_eq!(store.peek(), Some(101));
        assert_eq!(store.cached(), 101);
        Ok(())
    }

    #[test]
    fn test_release_leaves_slot_value() -> Result<()> {
        let slots = MemorySlotStore::new();
        slots.set(DEFAULT_SLOT_KEY, 5);
        let probe = slots.clone();

        let mut store = KeyedCounterStore::new(Box::new(slots), DEFAULT_SLOT_KEY, 0);
        store.hold()?;
        store.release()?;

        assert_eq!(probe.value(DEFAULT_SLOT_KEY), Some(5));
        assert!(!probe.is_held(DEFAULT_SLOT_KEY));
        Ok(())
    }

    #[test]
    fn test_second_hold_on_held_slot_fails() -> Result<()> {
        let slots = MemorySlotStore::new();
        let shared = slots.clone();

        let mut first = KeyedCounterStore::new(Box::new(slots), "slot", 0);
        first.hold()?;

        let mut second = KeyedCounterStore::new(Box::new(shared), "slot", 0);
        assert!(matches!(second.hold(), Err(Error::LockUnavailable(_))));
        Ok(())
    }

    #[test]
    fn test_commit_without_hold_is_logic_error() {
        let mut store = KeyedCounterStore::new(Box::new(MemorySlotStore::new()), "slot", 0);
        assert!(matches!(store.commit(1), Err(Error::LogicError(_))));
    }

    #[test]
    fn test_release_without_hold_is_noop() -> Result<()> {
        let mut store = KeyedCounterStore::new(Box::new(MemorySlotStore::new()), "slot", 0);
        store.release()?;
        store.release()?;
        Ok(())
    }

    #[test]
    fn test_negative_cache_peeks_unavailable() {
        let store = KeyedCounterStore::new(Box::new(MemorySlotStore::new()), "slot", -1);
        assert_eq!(store.peek(), None);
    }
}
