//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of workers in each stage's pool
    pub workers: usize,

    /// Photo extensions accepted by the walker (case-insensitive, no dot)
    pub extensions: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            extensions: vec!["jpg".to_string(), "jpeg".to_string()],
        }
    }
}

/// One worker per available core, falling back to a single worker.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Directory traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Directory suffixes treated as opaque bundles and never descended into
    pub bundle_suffixes: Vec<String>,

    /// Follow symbolic links while walking
    pub follow_links: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            bundle_suffixes: vec![
                ".app".to_string(),
                ".bundle".to_string(),
                ".photoslibrary".to_string(),
                ".photolibrary".to_string(),
                ".aplibrary".to_string(),
                ".migratedphotolibrary".to_string(),
            ],
            follow_links: false,
        }
    }
}

/// How the stages are scheduled relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Hash every file, then thumbnail every hashed file
    #[default]
    Staged,
    /// Walker, hasher and thumbnail builder all run at once
    Streaming,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineMode::Staged => write!(f, "staged"),
            PipelineMode::Streaming => write!(f, "streaming"),
        }
    }
}

/// Pipeline settings for backpressure and scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max tasks buffered between pipeline stages
    pub buffer_size: usize,

    /// Stage scheduling mode
    pub mode: PipelineMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            mode: PipelineMode::Staged,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum decoded image dimension (width or height)
    pub max_image_dimension: u32,

    /// Per-task timeout in milliseconds
    pub task_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 20000,
            task_timeout_ms: 60000,
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Bounding box edge in pixels; larger images are scaled down to fit
    pub max_dimension: u32,

    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 85,
        }
    }
}

/// Metadata store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the hidden directory created at the scan root
    pub meta_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            meta_dir: ".album".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
