//! Counter stores
//!
//! # Architecture
//!
//! One capability contract, two interchangeable backends:
//!
//! ```text
//! CounterStore {peek, hold, commit, release}
//!   ├─→ FileCounterStore   → one-line text file, OS exclusive lock per hold
//!   └─→ KeyedCounterStore  → named slot behind a SlotStore collaborator
//!                              ├─→ JsonSlotStore   (durable, JSON file)
//!                              └─→ MemorySlotStore (in-memory, tests)
//! ```
//!
//! The store is the sole serialization point between allocation sessions:
//! only one session may hold a backend at a time, and the stored value is
//! mutated exclusively through `commit` by the holder.

pub mod file;
pub mod keyed;
pub mod mock;
pub mod slots;

pub use file::FileCounterStore;
pub use keyed::{KeyedCounterStore, SlotStore, DEFAULT_SLOT_KEY};
pub use mock::MemorySlotStore;
pub use slots::JsonSlotStore;

use crate::error::Result;
use crate::format::BatesFormat;

/// Capability contract shared by both counter backends
///
/// `hold` grants exclusive ownership of the backend until `commit` or
/// `release`; `peek` is advisory and touches nothing.
pub trait CounterStore: Send {
    /// Read the current value with no side effect and no lock retained.
    ///
    /// `None` means the backend cannot currently supply a value (missing,
    /// empty, or corrupt source). This is the soft channel; it never errors.
    fn peek(&self) -> Option<i64>;

    /// Acquire exclusive access and return the current value.
    ///
    /// The backend stays owned by this store until `commit` or `release`.
    fn hold(&mut self) -> Result<i64>;

    /// Durably store `value` as the new current value and relinquish access.
    ///
    /// Fails with `LogicError` when no hold is outstanding.
    fn commit(&mut self, value: i64) -> Result<()>;

    /// Relinquish access without altering the stored value.
    ///
    /// No-op when no hold is outstanding.
    fn release(&mut self) -> Result<()>;

    /// Diagnostic identifier (file path or slot key) for error context
    fn source(&self) -> String;
}

/// Select and build the backend the format asks for
///
/// The keyed backend wraps the supplied slot store; the file backend drops it
/// unused. Selection happens once here, never inside the allocator.
pub fn counter_for_format(
    format: &BatesFormat,
    slots: Box<dyn SlotStore>,
) -> Result<Box<dyn CounterStore>> {
    format.validate()?;
    if format.use_file_backend {
        Ok(Box::new(FileCounterStore::new(&format.counter_file_path)))
    } else {
        Ok(Box::new(KeyedCounterStore::new(
            slots,
            DEFAULT_SLOT_KEY,
            format.next_number,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_selection_by_backend_flag() -> Result<()> {
        let keyed = BatesFormat::default();
        let store = counter_for_format(&keyed, Box::new(MemorySlotStore::new()))?;
        assert_eq!(store.source(), DEFAULT_SLOT_KEY);

        let file = BatesFormat {
            use_file_backend: true,
            counter_file_path: PathBuf::from("/tmp/bates_counter.txt"),
            ..Default::default()
        };
        let store = counter_for_format(&file, Box::new(MemorySlotStore::new()))?;
        assert_eq!(store.source(), "/tmp/bates_counter.txt");
        Ok(())
    }

    #[test]
    fn test_selection_validates_configuration() {
        let broken = BatesFormat {
            use_file_backend: true,
            ..Default::default()
        };
        assert!(counter_for_format(&broken, Box::new(MemorySlotStore::new())).is_err());
    }
}
