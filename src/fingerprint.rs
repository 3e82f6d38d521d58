//! Source video identity.
//!
//! A [`Fingerprint`] is derived from a file's base name and byte size only.
//! Content and modification time are deliberately ignored, so a replacement
//! file with the same name and size is treated as already processed.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    io::{Error as IoError, ErrorKind},
    path::Path,
};

use sha2::{Digest, Sha256};

/// Stable identity of a source video.
///
/// Rendered as lowercase hex, which is also the on-disk ledger format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file's metadata cannot be read or the path
    /// has no file name.
    pub fn of<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .ok_or_else(|| {
                IoError::new(
                    ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?
            .to_string_lossy();
        let size = fs::metadata(path)?.len();
        Ok(Self::from_parts(&name, size))
    }

    /// Compute the fingerprint for a base name and byte size.
    pub fn from_parts(name: &str, size: u64) -> Self {
        let digest = Sha256::digest(format!("{name}-{size}").as_bytes());
        Self(hex::encode(digest))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
