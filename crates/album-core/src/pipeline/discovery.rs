//! Tree walker producing a lazy stream of photo files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{ProcessingConfig, WalkConfig};
use crate::error::AlbumError;
use crate::types::FileDescriptor;

use super::classify::{Classification, PathClassifier};

/// Walks a directory tree, applying the [`PathClassifier`] at every node.
#[derive(Debug, Clone)]
pub struct Walker {
    classifier: PathClassifier,
    follow_links: bool,
    excluded: Vec<PathBuf>,
}

impl Walker {
    /// Create a walker from the processing and walk settings.
    pub fn new(processing: &ProcessingConfig, walk: &WalkConfig) -> Self {
        Self {
            classifier: PathClassifier::new(processing, walk),
            follow_links: walk.follow_links,
            excluded: Vec::new(),
        }
    }

    /// Never descend into `path`, whatever its name.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    /// Fail if the root cannot be listed.
    ///
    /// This is the only fatal traversal error; everything below the root is
    /// logged and skipped by [`Walker::walk`].
    pub fn check_root(root: &Path) -> Result<(), AlbumError> {
        std::fs::read_dir(root)
            .map(|_| ())
            .map_err(|source| AlbumError::RootUnreadable {
                path: root.to_path_buf(),
                source,
            })
    }

    /// Lazily enumerate accepted files under `root`.
    ///
    /// Entries are visited depth-first in file-name order. Unreadable entries
    /// are logged and skipped; the sequence ends when traversal completes.
    pub fn walk(&self, root: &Path) -> impl Iterator<Item = FileDescriptor> + Send + 'static {
        let root: PathBuf = root.to_path_buf();
        let classifier = self.classifier.clone();
        let filter = self.classifier.clone();
        let excluded = self.excluded.clone();

        WalkDir::new(&root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() > 0 && excluded.iter().any(|p| p == entry.path()) {
                    return false;
                }
                filter.classify(
                    entry.file_name(),
                    entry.file_type().is_dir(),
                    entry.depth() == 0,
                ) != Classification::Skip
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    match classifier.classify(entry.file_name(), false, entry.depth() == 0) {
                        Classification::Accept => {
                            Some(FileDescriptor::new(entry.into_path(), root.clone()))
                        }
                        _ => None,
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping unreadable entry {:?}: {}",
                        e.path().unwrap_or(root.as_path()),
                        e
                    );
                    None
                }
            })
    }
}

impl Default for Walker {
    fn default() -> Self {
        Self::new(&ProcessingConfig::default(), &WalkConfig::default())
    }
}
