//! File-backed counter store
//!
//! The counter file's lone textual line is the entire contract: a base-10
//! non-negative integer, optionally followed by a line terminator. A hold
//! takes an OS exclusive lock on the file and keeps it until commit or
//! release; commit seeks to the start, truncates, and writes the new value
//! back as that single line.
//!
//! Lock acquisition fails fast. If another holder (any process) owns the
//! lock, `hold` returns `LockUnavailable` instead of waiting.

use super::CounterStore;
use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Exclusively locked counter file
///
/// Owning this guard is owning the lock; every exit path that drops it,
/// including parse failures during a hold, releases the file.
struct HeldFile {
    file: File,
}

impl Drop for HeldFile {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to unlock counter file: {}", e);
        }
    }
}

/// Counter store over one exclusively-locked text file
pub struct FileCounterStore {
    path: PathBuf,
    held: Option<HeldFile>,
}

impl FileCounterStore {
    /// Create a store for the given counter file path
    ///
    /// The file itself is not touched until `peek`, `hold`, or `seed`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            held: None,
        }
    }

    /// Create or overwrite the counter file with a starting value
    pub fn seed<P: AsRef<Path>>(path: P, value: i64) -> Result<()> {
        let path = path.as_ref();
        if value < 0 {
            return Err(Error::InvalidBatesNumber(format!(
                "cannot seed {} with negative value {}",
                path.display(),
                value
            )));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::Io(format!("Failed to create {}: {}", path.display(), e)))?;
        file.write_all(format!("{}\n", value).as_bytes())
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        file.sync_all()
            .map_err(|e| Error::Io(format!("Failed to sync {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), value, "Seeded counter file");
        Ok(())
    }
}

impl CounterStore for FileCounterStore {
    fn peek(&self) -> Option<i64> {
        let mut contents = String::new();
        match File::open(&self.path) {
            Ok(mut file) => {
                if file.read_to_string(&mut contents).is_err() {
                    return None;
                }
            }
            Err(_) => return None,
        }
        parse_counter_line(&contents, &self.path).ok()
    }

    fn hold(&mut self) -> Result<i64> {
        if self.held.is_some() {
            return Err(Error::LogicError(format!(
                "hold already outstanding on {}",
                self.path.display()
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Error::MissingSource(self.path.display().to_string())
                }
                _ => Error::Io(format!("Failed to open {}: {}", self.path.display(), e)),
            })?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(Error::LockUnavailable(self.path.display().to_string()));
            }
            return Err(Error::Io(format!(
                "Failed to lock {}: {}",
                self.path.display(),
                e
            )));
        }

        // From here on the guard owns the lock; early returns release it
        let mut guard = HeldFile { file };

        let mut contents = String::new();
        guard
            .file
            .read_to_string(&mut contents)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", self.path.display(), e)))?;

        let value = parse_counter_line(&contents, &self.path)?;
        self.held = Some(guard);
        debug!(path = %self.path.display(), value, "Acquired counter hold");
        Ok(value)
    }

    fn commit(&mut self, value: i64) -> Result<()> {
        let mut guard = self.held.take().ok_or_else(|| {
            Error::LogicError(format!("commit without hold on {}", self.path.display()))
        })?;

        guard
            .file
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::Io(format!("Seek failed on {}: {}", self.path.display(), e)))?;
        guard
            .file
            .set_len(0)
            .map_err(|e| Error::Io(format!("Truncate failed on {}: {}", self.path.display(), e)))?;
        guard
            .file
            .write_all(format!("{}\n", value).as_bytes())
            .map_err(|e| Error::Io(format!("Write failed on {}: {}", self.path.display(), e)))?;
        guard
            .file
            .sync_all()
            .map_err(|e| Error::Io(format!("Sync failed on {}: {}", self.path.display(), e)))?;

        drop(guard);
        debug!(path = %self.path.display(), value, "Committed counter value");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.held.take().is_some() {
            debug!(path = %self.path.display(), "Released counter hold");
        }
        Ok(())
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse the file's single line as a non-negative counter value
fn parse_counter_line(contents: &str, path: &Path) -> Result<i64> {
    let line = contents.strip_suffix('\n').unwrap_or(contents);
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
        return Err(Error::EmptySource(path.display().to_string()));
    }

    let value = line.parse::<i64>().map_err(|_| {
        Error::MalformedValue(format!("{:?} in {}", line, path.display()))
    })?;
    if value < 0 {
        return Err(Error::MalformedValue(format!(
            "negative value {} in {}",
            value,
            path.display()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_counter(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bates_{}_{}.txt", name, std::process::id()))
    }

    #[test]
    fn test_hold_commit_round_trip() -> Result<()> {
        let path = temp_counter("round_trip");
        FileCounterStore::seed(&path, 41)?;

        let mut store = FileCounterStore::new(&path);
        assert_eq!(store.hold()?, 41);
        store.commit(42)?;
        assert_eq!(store.peek(), Some(42));

        // Commit leaves exactly one line behind
        let contents = std::fs::read_to_string(&path).expect("counter file readable");
        assert_eq!(contents, "42\n");

        std::fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let path = temp_counter("missing");
        std::fs::remove_file(&path).ok();

        let mut store = FileCounterStore::new(&path);
        assert_eq!(store.peek(), None);
        assert!(matches!(store.hold(), Err(Error::MissingSource(_))));
    }

    #[test]
    fn test_empty_file() {
        let path = temp_counter("empty");
        std::fs::write(&path, "").expect("write empty file");

        let mut store = FileCounterStore::new(&path);
        assert_eq!(store.peek(), None);
        assert!(matches!(store.hold(), Err(Error::EmptySource(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_malformed_file() {
        let path = temp_counter("malformed");
        std::fs::write(&path, "abc\n").expect("write malformed file");

        let mut store = FileCounterStore::new(&path);
        assert_eq!(store.peek(), None);
        assert!(matches!(store.hold(), Err(Error::MalformedValue(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_negative_value_is_malformed() {
        let path = temp_counter("negative");
        std::fs::write(&path, "-7\n").expect("write negative file");

        let mut store = FileCounterStore::new(&path);
        assert_eq!(store.peek(), None);
        assert!(matches!(store.hold(), Err(Error::MalformedValue(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_multiline_file_is_malformed() {
        let path = temp_counter("multiline");
        std::fs::write(&path, "12\n34\n").expect("write multiline file");

        let mut store = FileCounterStore::new(&path);
        assert!(matches!(store.hold(), Err(Error::MalformedValue(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_lock_conflict_fails_fast() -> Result<()> {
        let path = temp_counter("conflict");
        FileCounterStore::seed(&path, 10)?;

        let mut first = FileCounterStore::new(&path);
        let mut second = FileCounterStore::new(&path);

        first.hold()?;
        assert!(matches!(second.hold(), Err(Error::LockUnavailable(_))));

        // Peek never needs the lock
        assert_eq!(second.peek(), Some(10));

        first.release()?;
        assert_eq!(second.hold()?, 10);
        second.release()?;

        std::fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn test_failed_hold_releases_lock() -> Result<()> {
        let path = temp_counter("parse_release");
        std::fs::write(&path, "junk\n")
            .map_err(|e| Error::Io(format!("write junk: {}", e)))?;

        let mut first = FileCounterStore::new(&path);
        assert!(matches!(first.hold(), Err(Error::MalformedValue(_))));

        // A second store must see the parse failure, not a stuck lock
        let mut second = FileCounterStore::new(&path);
        assert!(matches!(second.hold(), Err(Error::MalformedValue(_))));

        std::fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn test_release_without_hold_is_noop() -> Result<()> {
        let path = temp_counter("noop_release");
        let mut store = FileCounterStore::new(&path);
        store.release()?;
        store.release()?;
        Ok(())
    }

    #[test]
    fn test_commit_without_hold_is_logic_error() {
        let path = temp_counter("commit_unheld");
        let mut store = FileCounterStore::new(&path);
        assert!(matches!(store.commit(5), Err(Error::LogicError(_))));
    }

    #[test]
    fn test_release_preserves_value() -> Result<()> {
        let path = temp_counter("release_value");
        FileCounterStore::seed(&path, 99)?;

        let mut store = FileCounterStore::new(&path);
        store.hold()?;
        store.release()?;
        assert_eq!(store.peek(), Some(99));

        std::fs::remove_file(&path).ok();
        Ok(())
    }
}
