// Batesgen - Bates Number Allocation Engine
// Sequential document identifiers drawn from one shared, durable counter

#![warn(rust_2018_idioms)]

pub mod allocator;
pub mod counter;
pub mod format;
pub mod settings;

// Re-exports for convenience
pub use allocator::NumberAllocator;
pub use counter::{counter_for_format, CounterStore, FileCounterStore, KeyedCounterStore};
pub use counter::{JsonSlotStore, MemorySlotStore, SlotStore};
pub use format::{format_bates, BatesFormat};
pub use settings::SettingsStore;

/// Bates allocation error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfiguration(String),

        #[error("Counter source missing: {0}")]
        MissingSource(String),

        #[error("Counter source empty: {0}")]
        EmptySource(String),

        #[error("Malformed counter value: {0}")]
        MalformedValue(String),

        #[error("Counter lock unavailable: {0}")]
        LockUnavailable(String),

        #[error("Invalid Bates number: {0}")]
        InvalidBatesNumber(String),

        #[error("Logic error: {0}")]
        LogicError(String),

        #[error("IO error: {0}")]
        Io(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
