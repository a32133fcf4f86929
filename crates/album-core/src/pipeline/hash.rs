//! Content fingerprinting and the hash stage.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::store::MetaStore;
use crate::types::{FileDescriptor, Fingerprint, HashedFile, FINGERPRINT_LEN};

use super::channel::{StageWorker, Step, TaskToken};

/// Computes content fingerprints.
pub struct Hasher;

impl Hasher {
    /// Generate a SHA-1 fingerprint of file contents.
    ///
    /// Uses streaming to handle large files without loading them into memory.
    pub fn content_hash(path: &Path) -> Result<Fingerprint, PipelineError> {
        let file = File::open(path).map_err(|source| PipelineError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha1::new();

        // Use 64KB buffer for efficient reading
        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|source| PipelineError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(finish(hasher))
    }

    /// Generate a fingerprint from an in-memory byte buffer.
    pub fn content_hash_from_bytes(data: &[u8]) -> Fingerprint {
        let mut hasher = Sha1::new();
        hasher.update(data);
        finish(hasher)
    }
}

fn finish(hasher: Sha1) -> Fingerprint {
    let digest = hasher.finalize();
    let mut bytes = [0u8; FINGERPRINT_LEN];
    bytes.copy_from_slice(&digest);
    Fingerprint::from_bytes(bytes)
}

/// First pipeline stage: fingerprint a file and refresh its hash record.
///
/// A record that already matches is left alone, but the file is still
/// forwarded: an unchanged hash says nothing about whether a thumbnail
/// exists yet.
pub struct HashStage {
    store: Arc<MetaStore>,
}

impl HashStage {
    /// Create the stage over a shared metadata store.
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self { store }
    }
}

impl StageWorker for HashStage {
    type Input = FileDescriptor;
    type Output = HashedFile;

    fn stage(&self) -> &'static str {
        "hash"
    }

    fn task_path(&self, input: &FileDescriptor) -> PathBuf {
        input.path.clone()
    }

    fn process(
        &self,
        file: FileDescriptor,
        token: &TaskToken,
    ) -> Result<Step<HashedFile>, PipelineError> {
        tracing::debug!("Starting work on {:?}", file.path);
        let fingerprint = Hasher::content_hash(&file.path)?;
        let record = self.store.hash_record_path(&file);

        if self.store.read_hash_record(&record) == Some(fingerprint) {
            tracing::debug!("Skipping {:?}, hash unchanged", file.path);
            return Ok(Step::Skipped(HashedFile {
                file,
                fingerprint,
                unchanged: true,
            }));
        }

        token.commit(self.stage(), &file.path)?;
        // The fingerprint is still good for this run if the record can't be saved.
        match self.store.write_hash_record(&record, &fingerprint) {
            Ok(true) => tracing::debug!("Hashed {:?} -> {}", file.path, fingerprint),
            Ok(false) => tracing::debug!("Hashed {:?} -> {} (dry run)", file.path, fingerprint),
            Err(e) => tracing::warn!("Could not create hash file: {}", e),
        }

        Ok(Step::Processed(HashedFile {
            file,
            fingerprint,
            unchanged: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn token() -> TaskToken {
        TaskToken::new(Duration::from_secs(5))
    }

    #[test]
    fn test_known_digest() {
        // SHA-1 of the empty string
        let fp = Hasher::content_hash_from_bytes(b"");
        assert_eq!(fp.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_streaming_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        assert_eq!(
            Hasher::content_hash(&path).unwrap(),
            Hasher::content_hash_from_bytes(&data)
        );
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let err = Hasher::content_hash(Path::new("/nonexistent/file.jpg")).unwrap_err();
        assert!(matches!(err, PipelineError::Open { .. }));
    }

    #[test]
    fn test_hash_stage_writes_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"photo").unwrap();
        let store = Arc::new(MetaStore::new(dir.path(), ".album", false));
        let stage = HashStage::new(store.clone());
        let file = FileDescriptor::new(&path, dir.path());

        let first = stage.process(file.clone(), &token()).unwrap();
        let Step::Processed(hashed) = first else {
            panic!("first run should hash and record");
        };
        assert!(!hashed.unchanged);
        let record = store.hash_record_path(&file);
        assert_eq!(fs::read_to_string(&record).unwrap(), hashed.fingerprint.to_hex());

        let second = stage.process(file, &token()).unwrap();
        let Step::Skipped(again) = second else {
            panic!("second run should hit the hash record");
        };
        assert!(again.unchanged);
        assert_eq!(again.fingerprint, hashed.fingerprint);
    }

    #[test]
    fn test_hash_stage_dry_run_still_forwards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"photo").unwrap();
        let store = Arc::new(MetaStore::new(dir.path(), ".album", true));
        let stage = HashStage::new(store.clone());

        let step = stage.process(FileDescriptor::new(&path, dir.path()), &token()).unwrap();
        assert!(matches!(step, Step::Processed(_)));
        assert!(!store.meta_root().exists());
    }
}
