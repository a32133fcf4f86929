//! Album Core - photo fingerprinting and thumbnail pipeline.
//!
//! Scans a directory tree for photos, fingerprints each one and builds an
//! orientation-corrected JPEG thumbnail, skipping work a previous run already
//! did. Results live in a hidden metadata directory at the scan root:
//!
//! ```text
//! Walk → Hash (pool) → Thumbnail (pool) → report
//! ```
//!
//! Hash records are keyed by the file's root-relative path; thumbnails are
//! keyed by fingerprint, so byte-identical photos share one thumbnail.
//!
//! # Usage
//!
//! ```rust,ignore
//! use album_core::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> album_core::Result<()> {
//!     let config = Config::load()?;
//!     let report = Pipeline::new(config, "/photos", false).run().await?;
//!     println!("{} photos", report.discovered);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, PipelineMode};
pub use error::{AlbumError, ConfigError, PipelineError, PipelineResult, Result};
pub use pipeline::{Pipeline, RunReport, StageSummary};
pub use store::MetaStore;
pub use types::{FileDescriptor, Fingerprint, HashedFile, PhotoMetadata, ThumbnailArtifact};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
