//! Durable JSON-backed slot store
//!
//! Persists the slot map as one JSON document. Every mutating call is a
//! read-modify-write that lands via write-temp-then-rename with an fsync, so
//! a crash mid-call leaves either the old document or the new one, never a
//! torn file.
//!
//! The held marker keeps a second session out between `get_and_hold` and the
//! matching `set_and_release`/`release`. Two processes interleaving the
//! read-modify-write itself can still race; this store promises only what
//! its three calls promise individually.

use super::keyed::SlotStore;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct SlotRecord {
    value: i64,
    held: bool,
}

/// Slot store persisted as a JSON file
pub struct JsonSlotStore {
    path: PathBuf,
}

impl JsonSlotStore {
    /// Create a store over the given document path
    ///
    /// A missing document reads as an empty slot map; it is created on the
    /// first mutating call.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<HashMap<String, SlotRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(Error::Io(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&contents).map_err(|e| {
            Error::MalformedValue(format!("slot document {}: {}", self.path.display(), e))
        })
    }

    fn store(&self, slots: &HashMap<String, SlotRecord>) -> Result<()> {
        let json = serde_json::to_vec_pretty(slots)
            .map_err(|e| Error::Io(format!("Failed to serialize slot document: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        // Write to temp, fsync, then rename over the live document
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::Io(format!("Failed to create {}: {}", temp_path.display(), e)))?;
        file.write_all(&json)
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", temp_path.display(), e)))?;
        file.sync_all()
            .map_err(|e| Error::Io(format!("Failed to sync {}: {}", temp_path.display(), e)))?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            Error::Io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

impl SlotStore for JsonSlotStore {
    fn get_and_hold(&self, key: &str) -> Result<i64> {
        let mut slots = self.load()?;
        let slot = slots.entry(key.to_string()).or_default();
        if slot.held {
            return Err(Error::LockUnavailable(format!(
                "slot {} in {} is held",
                key,
                self.path.display()
            )));
        }
        slot.held = true;
        let value = slot.value;
        self.store(&slots)?;
        debug!(slot = key, value, path = %self.path.display(), "Held durable slot");
        Ok(value)
    }

    fn set_and_release(&self, key: &str, value: i64) -> Result<()> {
        let mut slots = self.load()?;
        let slot = slots.entry(key.to_string()).or_default();
        slot.value = value;
        slot.held = false;
        self.store(&slots)?;
        debug!(slot = key, value, path = %self.path.display(), "Stored durable slot");
        Ok(())
    }

    fn release(&self, key: &str) -> Result<()> {
        let mut slots = self.load()?;
        let freed = match slots.get_mut(key) {
            Some(slot) if slot.held => {
                slot.held = false;
                true
            }
            _ => false,
        };
        if freed {
            self.store(&slots)?;
        }
        Ok(())
    }
}
