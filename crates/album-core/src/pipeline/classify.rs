//! Decides which directory entries the walker descends into or emits.

use std::ffi::OsStr;
use std::path::Path;

use crate::config::{ProcessingConfig, WalkConfig};

/// What to do with a single directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Directory to traverse
    Descend,
    /// Directory subtree to leave alone
    Skip,
    /// Photo file to process
    Accept,
    /// Any other file
    Ignore,
}

/// Pure, name-based entry classifier.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    extensions: Vec<String>,
    bundle_suffixes: Vec<String>,
}

impl PathClassifier {
    /// Build a classifier from the extension allow-list and bundle suffixes.
    pub fn new(processing: &ProcessingConfig, walk: &WalkConfig) -> Self {
        Self {
            extensions: processing
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            bundle_suffixes: walk
                .bundle_suffixes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    /// Classify an entry by its file name.
    ///
    /// The root is always descended, whatever it is called: `.`, `..` and
    /// hidden or bundle-like root directories are scanned as asked.
    pub fn classify(&self, name: &OsStr, is_dir: bool, is_root: bool) -> Classification {
        if is_dir {
            if is_root {
                return Classification::Descend;
            }
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                return Classification::Skip;
            }
            let lower = name.to_lowercase();
            if self
                .bundle_suffixes
                .iter()
                .any(|suffix| lower.ends_with(suffix.as_str()))
            {
                return Classification::Skip;
            }
            return Classification::Descend;
        }

        if self.is_supported(Path::new(name)) {
            Classification::Accept
        } else {
            Classification::Ignore
        }
    }

    /// Check if a file has an allow-listed extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext_lower)
            })
            .unwrap_or(false)
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new(&ProcessingConfig::default(), &WalkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str, is_dir: bool) -> Classification {
        PathClassifier::default().classify(OsStr::new(name), is_dir, false)
    }

    #[test]
    fn test_accepts_photo_extensions_case_insensitively() {
        assert_eq!(classify("a.jpg", false), Classification::Accept);
        assert_eq!(classify("a.JPG", false), Classification::Accept);
        assert_eq!(classify("a.jpeg", false), Classification::Accept);
        assert_eq!(classify("a.JpEg", false), Classification::Accept);
    }

    #[test]
    fn test_ignores_other_files() {
        assert_eq!(classify("notes.txt", false), Classification::Ignore);
        assert_eq!(classify("jpg", false), Classification::Ignore);
        assert_eq!(classify("archive.jpg.zip", false), Classification::Ignore);
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        assert_eq!(classify(".git", true), Classification::Skip);
        assert_eq!(classify(".album", true), Classification::Skip);
    }

    #[test]
    fn test_bundle_directories_are_skipped() {
        assert_eq!(classify("Photos.app", true), Classification::Skip);
        assert_eq!(classify("Plugin.bundle", true), Classification::Skip);
        assert_eq!(classify("Library.photoslibrary", true), Classification::Skip);
        assert_eq!(classify("Old.APLIBRARY", true), Classification::Skip);
    }

    #[test]
    fn test_plain_directories_are_descended() {
        assert_eq!(classify("2020", true), Classification::Descend);
        assert_eq!(classify("appendix", true), Classification::Descend);
    }

    #[test]
    fn test_root_is_never_skipped() {
        let classifier = PathClassifier::default();
        for name in [".", "..", ".hidden-root", "Library.photoslibrary"] {
            assert_eq!(
                classifier.classify(OsStr::new(name), true, true),
                Classification::Descend,
                "root {name:?} must be descended"
            );
        }
    }

    #[test]
    fn test_custom_extensions_accept_leading_dot() {
        let processing = ProcessingConfig {
            extensions: vec![".PNG".to_string()],
            ..Default::default()
        };
        let classifier = PathClassifier::new(&processing, &WalkConfig::default());
        assert_eq!(
            classifier.classify(OsStr::new("x.png"), false, false),
            Classification::Accept
        );
        assert_eq!(
            classifier.classify(OsStr::new("x.jpg"), false, false),
            Classification::Ignore
        );
    }
}
