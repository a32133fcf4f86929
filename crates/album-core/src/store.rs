//! On-disk metadata store: per-file hash records and per-fingerprint thumbnails.
//!
//! Layout under the scan root:
//!
//! ```text
//! <root>/.album/hash/<root-relative path>.sha1   lowercase hex fingerprint
//! <root>/.album/thumbs/<fingerprint>.jpg         JPEG thumbnail
//! ```
//!
//! The store is a cache. A missing or unreadable entry only costs
//! recomputation, so read failures are reported as misses.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::types::{FileDescriptor, Fingerprint};

const HASH_DIR: &str = "hash";
const THUMB_DIR: &str = "thumbs";
const HASH_SUFFIX: &str = ".sha1";
const THUMB_SUFFIX: &str = ".jpg";

/// Resolves and persists cache artifacts for one scan root.
#[derive(Debug, Clone)]
pub struct MetaStore {
    root: PathBuf,
    meta_root: PathBuf,
    dry_run: bool,
}

impl MetaStore {
    /// Create a store rooted at `<root>/<meta_dir>`.
    ///
    /// In dry-run mode every write is skipped.
    pub fn new(root: impl Into<PathBuf>, meta_dir: &str, dry_run: bool) -> Self {
        let root = root.into();
        let meta_root = root.join(meta_dir);
        Self {
            root,
            meta_root,
            dry_run,
        }
    }

    /// The scan root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The metadata directory.
    pub fn meta_root(&self) -> &Path {
        &self.meta_root
    }

    /// Whether writes are suppressed.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Where the hash record for `file` lives.
    pub fn hash_record_path(&self, file: &FileDescriptor) -> PathBuf {
        let mut path: OsString = self
            .meta_root
            .join(HASH_DIR)
            .join(file.relative_path())
            .into_os_string();
        path.push(HASH_SUFFIX);
        PathBuf::from(path)
    }

    /// Where the thumbnail for `fingerprint` lives.
    pub fn thumbnail_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.meta_root
            .join(THUMB_DIR)
            .join(format!("{}{}", fingerprint, THUMB_SUFFIX))
    }

    /// Read a stored hash record. Anything other than a valid digest is a miss.
    pub fn read_hash_record(&self, path: &Path) -> Option<Fingerprint> {
        match fs::read_to_string(path) {
            Ok(content) => match content.parse() {
                Ok(fp) => Some(fp),
                Err(_) => {
                    tracing::debug!("Ignoring malformed hash record {:?}", path);
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Could not read hash record {:?}: {}", path, e);
                None
            }
        }
    }

    /// Persist a hash record. Returns `Ok(false)` when nothing was written.
    pub fn write_hash_record(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
    ) -> Result<bool, PipelineError> {
        if self.dry_run {
            return Ok(false);
        }
        ensure_parent(path)?;
        fs::write(path, fingerprint.to_hex()).map_err(|source| PipelineError::Store {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }

    /// Whether a thumbnail already exists for `fingerprint`.
    pub fn thumbnail_exists(&self, fingerprint: &Fingerprint) -> bool {
        self.thumbnail_path(fingerprint).is_file()
    }

    /// Persist an encoded thumbnail. Returns `Ok(false)` when nothing was written.
    ///
    /// The bytes go to a temporary sibling first and are renamed into place,
    /// so the final name only ever holds a complete JPEG.
    pub fn write_thumbnail(
        &self,
        fingerprint: &Fingerprint,
        jpeg: &[u8],
    ) -> Result<bool, PipelineError> {
        if self.dry_run {
            return Ok(false);
        }
        let path = self.thumbnail_path(fingerprint);
        ensure_parent(&path)?;

        let mut tmp: OsString = path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", std::process::id()));
        let tmp = PathBuf::from(tmp);

        let result = fs::write(&tmp, jpeg).and_then(|_| fs::rename(&tmp, &path));
        if let Err(source) = result {
            let _ = fs::remove_file(&tmp);
            return Err(PipelineError::Store { path, source });
        }
        Ok(true)
    }
}

/// Create the parent directory of `path`. Concurrent callers are fine.
fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|source| PipelineError::Store {
        path: parent.to_path_buf(),
        source,
    })
}
