//! Core data types passed between pipeline stages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// An eligible photo file found by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Full path to the file
    pub path: PathBuf,

    /// The scan root the file was found under
    pub root: PathBuf,
}

impl FileDescriptor {
    /// Create a descriptor for `path` found under `root`.
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Path relative to the scan root, without a leading separator.
    ///
    /// Paths outside the root are returned with their root component
    /// stripped so they still land inside the metadata store.
    pub fn relative_path(&self) -> PathBuf {
        match self.path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => self
                .path
                .components()
                .filter(|c| matches!(c, std::path::Component::Normal(_)))
                .collect(),
        }
    }
}

/// Length of a fingerprint in bytes (160 bits).
pub const FINGERPRINT_LEN: usize = 20;

/// SHA-1 digest of a file's bytes.
///
/// Displayed as lowercase hex, which is also the storage key for hash
/// records and thumbnails.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// Error returned when a string is not a 40-character hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected 40 hex characters")]
pub struct ParseFingerprintError;

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != FINGERPRINT_LEN * 2 || !s.is_ascii() {
            return Err(ParseFingerprintError);
        }
        let mut bytes = [0u8; FINGERPRINT_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseFingerprintError)?;
        }
        Ok(Self(bytes))
    }
}

/// A file that made it through the hash stage.
#[derive(Debug, Clone)]
pub struct HashedFile {
    /// The source file
    pub file: FileDescriptor,

    /// Digest of its bytes
    pub fingerprint: Fingerprint,

    /// Whether the stored hash record already matched
    pub unchanged: bool,
}

impl HashedFile {
    /// Source path, for logging.
    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

/// A thumbnail produced (or found) for a fingerprint.
#[derive(Debug, Clone)]
pub struct ThumbnailArtifact {
    /// Fingerprint the artifact is keyed by
    pub fingerprint: Fingerprint,

    /// Location in the metadata store
    pub path: PathBuf,
}

/// EXIF metadata read while building a thumbnail. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    /// When the photo was captured, as recorded by the camera
    pub captured_at: Option<String>,

    /// GPS latitude (decimal degrees)
    pub gps_latitude: Option<f64>,

    /// GPS longitude (decimal degrees)
    pub gps_longitude: Option<f64>,

    /// Orientation tag (1-8)
    pub orientation: Option<u32>,
}
