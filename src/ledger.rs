//! The processing ledger.
//!
//! [`Ledger`] records which source videos have been fully processed, one
//! [`Fingerprint`] per line in an append-only store. Storage sits behind the
//! small [`LedgerBackend`] trait: [`FileBackend`] for real runs and
//! [`MemoryBackend`] for tests.
//!
//! Entries are never deduplicated, rewritten, or removed. A truncated append
//! shows up only as a partial last line, which simply fails to match any
//! fingerprint.
//!
//! # Example
//!
//! ```no_run
//! use framesplit::{FileBackend, Fingerprint, Ledger};
//!
//! let mut ledger = Ledger::new(FileBackend::new(".processed_videos"));
//! let fingerprint = Fingerprint::of("BeforeSplit/holiday.mp4")?;
//! if !ledger.is_processed(&fingerprint)? {
//!     // ... process the video ...
//!     ledger.mark_processed(&fingerprint)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fs::{self, OpenOptions},
    io::{Error as IoError, ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::{error::SplitError, fingerprint::Fingerprint};

/// Read/append access to the raw ledger store.
pub trait LedgerBackend {
    /// Read the whole store. Returns `Ok(None)` if the store does not exist yet.
    fn read_all(&self) -> Result<Option<String>, IoError>;

    /// Append one line (without its terminator) to the store, creating it if needed.
    fn append_line(&mut self, line: &str) -> Result<(), IoError>;

    /// Human-readable location used in error messages.
    fn location(&self) -> String;
}

/// Ledger stored in a plain text file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Use the file at `path` as the store. The file is created on first append.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerBackend for FileBackend {
    fn read_all(&self) -> Result<Option<String>, IoError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn append_line(&mut self, line: &str) -> Result<(), IoError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory ledger store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    contents: Option<String>,
}

impl MemoryBackend {
    /// An empty backend whose store does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose store already holds `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    /// Raw store contents, if the store exists.
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl LedgerBackend for MemoryBackend {
    fn read_all(&self) -> Result<Option<String>, IoError> {
        Ok(self.contents.clone())
    }

    fn append_line(&mut self, line: &str) -> Result<(), IoError> {
        let contents = self.contents.get_or_insert_with(String::new);
        contents.push_str(line);
        contents.push('\n');
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

/// Append-only record of processed source videos.
#[derive(Debug)]
pub struct Ledger<B: LedgerBackend> {
    backend: B,
}

impl<B: LedgerBackend> Ledger<B> {
    /// Wrap a storage backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns `true` if `fingerprint` has been recorded.
    ///
    /// The store is re-read on every call so entries appended by an earlier
    /// cycle are always visible.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Ledger`] if the store exists but cannot be read.
    pub fn is_processed(&self, fingerprint: &Fingerprint) -> Result<bool, SplitError> {
        let Some(contents) = self.backend.read_all().map_err(|source| self.error(source))? else {
            return Ok(false);
        };
        Ok(contents.lines().any(|line| line == fingerprint.as_str()))
    }

    /// Append `fingerprint` to the store.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Ledger`] if the store cannot be written.
    pub fn mark_processed(&mut self, fingerprint: &Fingerprint) -> Result<(), SplitError> {
        log::debug!(
            "Recording {fingerprint} in ledger {}",
            self.backend.location()
        );
        self.backend
            .append_line(fingerprint.as_str())
            .map_err(|source| self.error(source))
    }

    /// All recorded fingerprints in store order, duplicates included.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Ledger`] if the store cannot be read.
    pub fn entries(&self) -> Result<Vec<String>, SplitError> {
        let contents = self
            .backend
            .read_all()
            .map_err(|source| self.error(source))?
            .unwrap_or_default();
        Ok(contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Borrow the storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn error(&self, source: IoError) -> SplitError {
        SplitError::Ledger {
            location: self.backend.location(),
            source,
        }
    }
}
