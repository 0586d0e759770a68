//! Bates format configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Formatting and backend configuration for one allocation session
///
/// Loaded once per session (typically from the settings document) and treated
/// as read-only afterwards. The only field ever written back is
/// `next_number`, refreshed after a successful commit against the keyed
/// backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatesFormat {
    /// Literal text before the number
    pub prefix: String,
    /// Literal text after the number (and page suffix, if any)
    pub suffix: String,
    /// Left-pad the number with '0' up to `digits` characters
    pub zero_pad: bool,
    /// Minimum digit width; never truncates a longer number
    pub digits: u32,
    /// true = one counter value per document, pages distinguished by an
    /// appended page index; false = one counter value per page
    pub append_page_number: bool,
    /// Left-pad the page index with '0' up to `page_digits` characters
    pub zero_pad_page: bool,
    /// Minimum page digit width; never truncates
    pub page_digits: u32,
    /// Separator between number and page index
    pub page_separator: String,
    /// true = counter lives in a text file; false = keyed slot store
    pub use_file_backend: bool,
    /// Counter file path (meaningful only with the file backend)
    pub counter_file_path: PathBuf,
    /// Last-known keyed-store value; authoritative cache only when the keyed
    /// backend is selected
    pub next_number: i64,
}

impl Default for BatesFormat {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            zero_pad: true,
            digits: 6,
            append_page_number: false,
            zero_pad_page: true,
            page_digits: 3,
            page_separator: "-".to_string(),
            use_file_backend: false,
            counter_file_path: PathBuf::new(),
            next_number: 0,
        }
    }
}

impl BatesFormat {
    /// Check that the configuration can actually feed an allocation session
    pub fn validate(&self) -> Result<()> {
        if self.use_file_backend && self.counter_file_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfiguration(
                "file backend selected but counter_file_path is empty".to_string(),
            ));
        }
        Ok(())
    }
}
