//! Allocation sessions
//!
//! A `NumberAllocator` runs one allocation lifecycle: it takes a hold from
//! the configured counter store on the first allocation, hands out values
//! under the configured page-numbering policy, and ends the session with
//! either `commit` (the store durably advances) or `release` (the store is
//! left exactly as it was). Dropping an allocator with an uncommitted
//! reservation releases it.
//!
//! # State machine
//!
//! ```text
//! Idle --allocate (first)--> Held --commit--> Idle
//!                            Held --release/drop--> Idle (value unconsumed)
//!                            Held --allocate--> Held (no new hold)
//! ```
//!
//! Create one allocator per document; a later `allocate` after commit or
//! release starts a brand-new session with a fresh hold.

use crate::counter::{counter_for_format, CounterStore, SlotStore};
use crate::error::{Error, Result};
use crate::format::{format_bates, BatesFormat};
use tracing::{debug, info, warn};

/// Pending counter consumption, fixed by the first allocation of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reservation {
    /// One counter value per page; `next` is handed out and advanced per call
    PerPage { next: i64 },
    /// One counter value per document; commit advances past `base` once
    PerDocument { base: i64 },
}

/// Next counter value, wrapping to 0 past the maximum
fn advance(value: i64) -> i64 {
    if value == i64::MAX {
        0
    } else {
        value + 1
    }
}

/// One allocation session over a counter store
pub struct NumberAllocator {
    format: BatesFormat,
    store: Box<dyn CounterStore>,
    reservation: Option<Reservation>,
}

impl NumberAllocator {
    /// Create a session over an already-built counter store
    pub fn new(format: BatesFormat, store: Box<dyn CounterStore>) -> Result<Self> {
        format.validate()?;
        Ok(Self {
            format,
            store,
            reservation: None,
        })
    }

    /// Create a session, selecting the backend the format asks for
    pub fn for_format(format: BatesFormat, slots: Box<dyn SlotStore>) -> Result<Self> {
        let store = counter_for_format(&format, slots)?;
        Ok(Self {
            format,
            store,
            reservation: None,
        })
    }

    /// Produce the Bates string for `page`, consuming counter values under
    /// the session's policy
    ///
    /// Per-page policy: every call hands out a fresh value and advances the
    /// pending candidate. Per-document policy: the first call fixes the base
    /// value for the whole session and every page reuses it; the counter
    /// advances once, at commit.
    pub fn allocate(&mut self, page: i64) -> Result<String> {
        let reservation = match self.reservation {
            Some(ref mut r) => r,
            None => {
                let base = self.store.hold()?;
                let r = if self.format.append_page_number {
                    Reservation::PerDocument { base }
                } else {
                    Reservation::PerPage { next: base }
                };
                debug!(source = %self.store.source(), base, "Opened allocation session");
                self.reservation.insert(r)
            }
        };

        let value = match reservation {
            Reservation::PerPage { next } => {
                let value = *next;
                *next = advance(value);
                value
            }
            Reservation::PerDocument { base } => *base,
        };

        if value < 0 {
            return Err(Error::InvalidBatesNumber(format!(
                "counter value {} from {} cannot format page {}",
                value,
                self.store.source(),
                page
            )));
        }
        format_bates(value, page, &self.format)
    }

    /// Format the store's current value without creating or consuming a
    /// reservation
    ///
    /// Returns the empty string when the store cannot currently supply a
    /// value. Safe at any time; does not interact with an outstanding
    /// reservation.
    pub fn peek(&self, page: i64) -> Result<String> {
        match self.store.peek() {
            Some(value) => format_bates(value, page, &self.format),
            None => Ok(String::new()),
        }
    }

    /// The store's current raw value, or -1 when unavailable
    pub fn peek_value(&self) -> i64 {
        self.store.peek().unwrap_or(-1)
    }

    /// Durably advance the counter past every value this session consumed
    ///
    /// No-op when no reservation is outstanding. With the keyed backend the
    /// committed value is also copied back into the in-memory format's
    /// `next_number`.
    pub fn commit(&mut self) -> Result<()> {
        let reservation = match self.reservation.take() {
            Some(r) => r,
            None => return Ok(()),
        };
        let value = match reservation {
            Reservation::PerPage { next } => next,
            Reservation::PerDocument { base } => advance(base),
        };
        self.store.commit(value)?;
        if !self.format.use_file_backend {
            self.format.next_number = value;
        }
        info!(source = %self.store.source(), value, "Committed allocation session");
        Ok(())
    }

    /// Abandon the session, leaving the stored counter untouched
    ///
    /// No-op when no reservation is outstanding.
    pub fn release(&mut self) -> Result<()> {
        if self.reservation.take().is_some() {
            self.store.release()?;
            debug!(source = %self.store.source(), "Abandoned allocation session");
        }
        Ok(())
    }

    /// The session's format snapshot (with `next_number` refreshed after a
    /// keyed-backend commit)
    pub fn format(&self) -> &BatesFormat {
        &self.format
    }

    /// Diagnostic identifier of the underlying counter source
    pub fn source(&self) -> String {
        self.store.source()
    }

    /// Whether a reservation is currently outstanding
    pub fn is_held(&self) -> bool {
        self.reservation.is_some()
    }
}

impl Drop for NumberAllocator {
    fn drop(&mut self) {
        if self.reservation.is_some() {
            if let Err(e) = self.release() {
                warn!("Failed to release counter reservation: {}", e);
            }
        }
    }
}
