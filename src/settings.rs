//! Persisted format settings
//!
//! The settings document is one TOML file holding a `BatesFormat`. Absent
//! fields fall back to defaults, and a missing document reads as the default
//! format, so a fresh installation works without any setup. Saves land via
//! write-temp-then-rename so a crash never leaves a torn document.

use crate::error::{Error, Result};
use crate::format::BatesFormat;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load/save access to the TOML settings document
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store over the given document path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings document, falling back to defaults when absent
    pub fn load(&self) -> Result<BatesFormat> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings document, using defaults");
                return Ok(BatesFormat::default());
            }
            Err(e) => {
                return Err(Error::Io(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        toml::from_str(&contents).map_err(|e| {
            Error::InvalidConfiguration(format!(
                "settings document {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Write the settings document, replacing any previous one atomically
    pub fn save(&self, format: &BatesFormat) -> Result<()> {
        let contents = toml::to_string_pretty(format).map_err(|e| {
            Error::InvalidConfiguration(format!("Failed to serialize settings: {}", e))
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let temp_path = self.path.with_extension("toml.tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::Io(format!("Failed to create {}: {}", temp_path.display(), e)))?;
        file.write_all(contents.as_bytes())
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
        debug!(path = %self.path.display(), "Saved settings document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bates_settings_{}_{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_missing_document_loads_defaults() -> Result<()> {
        let path = temp_settings("defaults");
        std::fs::remove_file(&path).ok();

        let store = SettingsStore::new(&path);
        assert_eq!(store.load()?, BatesFormat::default());
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let path = temp_settings("round_trip");
        let store = SettingsStore::new(&path);

        let format = BatesFormat {
            prefix: "ACME-".to_string(),
            suffix: "-PROD".to_string(),
            digits: 8,
            append_page_number: true,
            page_digits: 4,
            page_separator: ".".to_string(),
            next_number: 1200,
            ..Default::default()
        };
        store.save(&format)?;
        assert_eq!(store.load()?, format);

        std::fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn test_partial_document_fills_defaults() -> Result<()> {
        let path = temp_settings("partial");
        std::fs::write(&path, "prefix = \"DOC-\"\ndigits = 4\n")
            .map_err(|e| Error::Io(format!("write partial: {}", e)))?;

        let store = SettingsStore::new(&path);
        let format = store.load()?;
        assert_eq!(format.prefix, "DOC-");
        assert_eq!(format.digits, 4);
        // Everything else defaulted
        assert_eq!(format.page_separator, "-");
        assert!(!format.use_file_backend);

        std::fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn test_invalid_document_is_configuration_error() {
        let path = temp_settings("invalid");
        std::fs::write(&path, "digits = \"many\"").expect("write invalid file");

        let store = SettingsStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(Error::InvalidConfiguration(_))
        ));

        std::fs::remove_file(&path).ok();
    }
}
