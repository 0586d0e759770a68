//! In-memory slot store for testing
//!
//! This module provides a simple in-memory `SlotStore` implementation
//! for testing and embedding.

use super::keyed::SlotStore;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    value: i64,
    held: bool,
}

/// In-memory slot store backed by a shared map
///
/// Clones share the same underlying slots, so a clone can stand in for a
/// second session against the same store.
#[derive(Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl MemorySlotStore {
    /// Create an empty slot store
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed a slot's value without touching its held marker
    pub fn set(&self, key: &str, value: i64) {
        let mut slots = self.slots.lock().unwrap();
        slots.entry(key.to_string()).or_default().value = value;
    }

    /// Current value of a slot, if present
    pub fn value(&self, key: &str) -> Option<i64> {
        self.slots.lock().unwrap().get(key).map(|s| s.value)
    }

    /// Whether a slot is currently marked held
    pub fn is_held(&self, key: &str) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(key)
            .map(|s| s.held)
            .unwrap_or(false)
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// Check if the store has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }
}

impl SlotStore for MemorySlotStore {
    fn get_and_hold(&self, key: &str) -> Result<i64> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(key.to_string()).or_default();
        if slot.held {
            return Err(Error::LockUnavailable(format!("slot {} is held", key)));
        }
        slot.held = true;
        Ok(slot.value)
    }

    fn set_and_release(&self, key: &str, value: i64) -> Result<()> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(key.to_string()).or_default();
        slot.value = value;
        slot.held = false;
        Ok(())
    }

    fn release(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(key) {
            slot.held = false;
        }
        Ok(())
    }
}
