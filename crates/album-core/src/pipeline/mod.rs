//! Photo processing pipeline components.
//!
//! This module contains the stages of the pipeline and the plumbing between them:
//! - **classify**: Decide which directory entries are photos or skipped subtrees
//! - **discovery**: Lazily walk the tree for photo files
//! - **hash**: Fingerprint files and keep hash records current
//! - **metadata**: Extract EXIF metadata
//! - **orientation**: Map EXIF orientation to a rotate/flip transform
//! - **decode**: Decode JPEGs
//! - **thumbnail**: Build fingerprint-keyed JPEG thumbnails
//! - **channel**: Bounded channels and fixed-size worker pools
//! - **completion**: Per-stage fan-in of completion signals
//! - **processor**: Orchestrates the full pipeline

pub mod channel;
pub mod classify;
pub mod completion;
pub mod decode;
pub mod discovery;
pub mod hash;
pub mod metadata;
pub mod orientation;
pub mod processor;
pub mod thumbnail;

// Re-exports for convenient access
pub use channel::{StageWorker, Step, TaskToken, WorkerPool};
pub use classify::{Classification, PathClassifier};
pub use completion::{completion_channel, CompletionTracker, StageSummary, TaskOutcome};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::Walker;
pub use hash::{HashStage, Hasher};
pub use metadata::MetadataExtractor;
pub use orientation::{Flip, Orientation};
pub use processor::{Pipeline, RunReport};
pub use thumbnail::{ThumbnailGenerator, ThumbnailStage};
