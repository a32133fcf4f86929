//! Thumbnail rendering and the thumbnail stage.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::{LimitsConfig, ThumbnailConfig};
use crate::error::PipelineError;
use crate::store::MetaStore;
use crate::types::{Fingerprint, HashedFile, ThumbnailArtifact};

use super::channel::{StageWorker, Step, TaskToken};
use super::decode::ImageDecoder;
use super::metadata::MetadataExtractor;
use super::orientation::Orientation;

/// Renders and encodes thumbnails.
pub struct ThumbnailGenerator {
    config: ThumbnailConfig,
}

impl ThumbnailGenerator {
    /// Create a new thumbnail generator with the given configuration.
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Size that fits `width`x`height` in a `max`x`max` box, keeping aspect ratio.
    ///
    /// Images that already fit are left at their own size; nothing is upscaled.
    pub fn target_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
        if width <= max && height <= max {
            return (width, height);
        }
        let scale = |short: u32, long: u32| -> u32 {
            let scaled = (short as u64 * max as u64 + long as u64 / 2) / long as u64;
            scaled.max(1) as u32
        };
        if width >= height {
            (max, scale(height, width))
        } else {
            (scale(width, height), max)
        }
    }

    /// Resize to fit the bounding box, then orient.
    pub fn render(&self, image: DynamicImage, orientation: Orientation) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        let (dst_width, dst_height) =
            Self::target_dimensions(width, height, self.config.max_dimension);

        let resized = if (dst_width, dst_height) == (width, height) {
            image
        } else {
            image.resize_exact(dst_width, dst_height, FilterType::Lanczos3)
        };

        orientation.apply(resized)
    }

    /// Encode as JPEG at the configured quality.
    pub fn encode(&self, image: &DynamicImage) -> image::ImageResult<Vec<u8>> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.config.quality).encode_image(&rgb)?;
        Ok(buffer)
    }
}

/// Second pipeline stage: build the thumbnail for a hashed file.
///
/// Thumbnails are keyed by fingerprint, so an existing artifact is proof
/// enough and the file is not decoded. Within one run each fingerprint is
/// claimed by the first task that sees it; byte-identical files after that
/// are skipped.
pub struct ThumbnailStage {
    store: Arc<MetaStore>,
    decoder: ImageDecoder,
    generator: ThumbnailGenerator,
    claimed: Mutex<HashSet<Fingerprint>>,
}

impl ThumbnailStage {
    /// Create the stage over a shared metadata store.
    pub fn new(store: Arc<MetaStore>, thumbnail: ThumbnailConfig, limits: LimitsConfig) -> Self {
        Self {
            store,
            decoder: ImageDecoder::new(limits),
            generator: ThumbnailGenerator::new(thumbnail),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Claim a fingerprint for this run. False if another task already has it.
    fn claim(&self, fingerprint: Fingerprint) -> bool {
        match self.claimed.lock() {
            Ok(mut claimed) => claimed.insert(fingerprint),
            Err(poisoned) => poisoned.into_inner().insert(fingerprint),
        }
    }

    /// Hand a fingerprint back after a failed build so a sibling can retry.
    fn release(&self, fingerprint: &Fingerprint) {
        match self.claimed.lock() {
            Ok(mut claimed) => claimed.remove(fingerprint),
            Err(poisoned) => poisoned.into_inner().remove(fingerprint),
        };
    }

    /// Decode, orient, shrink and persist. Returns source and thumbnail sizes.
    fn build(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
        token: &TaskToken,
    ) -> Result<(u32, u32, u32, u32), PipelineError> {
        let bytes = std::fs::read(path).map_err(|source| PipelineError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // Metadata reads its own view of the bytes; the decoder gets the rest.
        let metadata = MetadataExtractor::from_bytes(&bytes);
        let decoded = self.decoder.decode_jpeg(&bytes, path)?;
        drop(bytes);
        token.check(self.stage(), path)?;

        let orientation = match &metadata {
            Some(meta) => {
                tracing::trace!(
                    "{:?}: captured {:?}, location {:?}/{:?}",
                    path,
                    meta.captured_at,
                    meta.gps_latitude,
                    meta.gps_longitude
                );
                meta.orientation
                    .map(Orientation::from_exif)
                    .unwrap_or(Orientation::UPRIGHT)
            }
            None => Orientation::UPRIGHT,
        };

        let thumbnail = self.generator.render(decoded.image, orientation);
        let (thumb_width, thumb_height) = (thumbnail.width(), thumbnail.height());
        let jpeg = self
            .generator
            .encode(&thumbnail)
            .map_err(|e| PipelineError::Encode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        token.commit(self.stage(), path)?;
        self.store.write_thumbnail(fingerprint, &jpeg)?;

        Ok((decoded.width, decoded.height, thumb_width, thumb_height))
    }
}

impl StageWorker for ThumbnailStage {
    type Input = HashedFile;
    type Output = ThumbnailArtifact;

    fn stage(&self) -> &'static str {
        "thumbnail"
    }

    fn task_path(&self, input: &HashedFile) -> PathBuf {
        input.file.path.clone()
    }

    fn process(
        &self,
        task: HashedFile,
        token: &TaskToken,
    ) -> Result<Step<ThumbnailArtifact>, PipelineError> {
        let fingerprint = task.fingerprint;
        let artifact = ThumbnailArtifact {
            fingerprint,
            path: self.store.thumbnail_path(&fingerprint),
        };

        if self.store.thumbnail_exists(&fingerprint) {
            tracing::debug!("Skipping {:?}, thumbnail {} exists", task.path(), fingerprint);
            return Ok(Step::Skipped(artifact));
        }
        if !self.claim(fingerprint) {
            tracing::debug!(
                "Skipping {:?}, thumbnail {} already built this run",
                task.path(),
                fingerprint
            );
            return Ok(Step::Skipped(artifact));
        }

        tracing::debug!("Starting thumbnail work on {:?} ({})", task.path(), fingerprint);
        let (width, height, thumb_width, thumb_height) =
            match self.build(task.path(), &fingerprint, token) {
                Ok(sizes) => sizes,
                Err(e) => {
                    self.release(&fingerprint);
                    return Err(e);
                }
            };
        tracing::debug!(
            "Processed image, {}x{}, thumbnail is {}x{}",
            width,
            height,
            thumb_width,
            thumb_height
        );

        Ok(Step::Processed(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn generator() -> ThumbnailGenerator {
        ThumbnailGenerator::new(ThumbnailConfig::default())
    }

    #[test]
    fn test_target_dimensions_landscape() {
        assert_eq!(
            ThumbnailGenerator::target_dimensions(3000, 2000, 800),
            (800, 533)
        );
    }

    #[test]
    fn test_target_dimensions_portrait() {
        assert_eq!(
            ThumbnailGenerator::target_dimensions(2000, 3000, 800),
            (533, 800)
        );
    }

    #[test]
    fn test_target_dimensions_small_image_untouched() {
        assert_eq!(
            ThumbnailGenerator::target_dimensions(400, 300, 800),
            (400, 300)
        );
        assert_eq!(
            ThumbnailGenerator::target_dimensions(800, 800, 800),
            (800, 800)
        );
    }

    #[test]
    fn test_target_dimensions_extreme_aspect() {
        assert_eq!(
            ThumbnailGenerator::target_dimensions(10000, 1, 800),
            (800, 1)
        );
    }

    #[test]
    fn test_render_resizes_and_keeps_aspect() {
        let img = DynamicImage::new_rgb8(3000, 2000);
        let out = generator().render(img, Orientation::UPRIGHT);
        let (w, h) = out.dimensions();
        assert_eq!(w.max(h), 800);
        let ratio = 3000.0 / 2000.0;
        assert!((w as f64 - h as f64 * ratio).abs() <= ratio + 1.0);
    }

    #[test]
    fn test_render_small_image_identity() {
        let img = DynamicImage::new_rgb8(400, 300);
        let out = generator().render(img, Orientation::UPRIGHT);
        assert_eq!(out.dimensions(), (400, 300));
    }

    #[test]
    fn test_render_rotates_after_resize() {
        let img = DynamicImage::new_rgb8(1600, 1000);
        let out = generator().render(img, Orientation::from_exif(6));
        assert_eq!(out.dimensions(), (500, 800));
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let img = DynamicImage::new_rgba8(64, 32);
        let bytes = generator().encode(&img).unwrap();
        assert_eq!(&bytes[0..2], &[0xff, 0xd8]);
    }

    fn stage_in(root: &Path) -> (Arc<MetaStore>, ThumbnailStage) {
        let store = Arc::new(MetaStore::new(root, ".album", false));
        let stage = ThumbnailStage::new(
            store.clone(),
            ThumbnailConfig::default(),
            LimitsConfig::default(),
        );
        (store, stage)
    }

    fn write_jpeg(path: &Path) {
        let bytes = generator().encode(&DynamicImage::new_rgb8(64, 48)).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn hashed(path: &Path, root: &Path, fingerprint: Fingerprint) -> HashedFile {
        HashedFile {
            file: crate::types::FileDescriptor::new(path, root),
            fingerprint,
            unchanged: false,
        }
    }

    fn token() -> TaskToken {
        TaskToken::new(std::time::Duration::from_secs(5))
    }

    #[test]
    fn test_failed_build_releases_claim_for_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.jpg");
        write_jpeg(&good);
        let fingerprint = Fingerprint::from_bytes([7; 20]);
        let (store, stage) = stage_in(dir.path());

        let missing = hashed(&dir.path().join("gone.jpg"), dir.path(), fingerprint);
        let err = stage.process(missing, &token()).unwrap_err();
        assert!(matches!(err, PipelineError::Open { .. }));

        let step = stage
            .process(hashed(&good, dir.path(), fingerprint), &token())
            .unwrap();
        assert!(matches!(step, Step::Processed(_)));
        assert!(store.thumbnail_exists(&fingerprint));
    }

    #[test]
    fn test_abandoned_task_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        write_jpeg(&path);
        let fingerprint = Fingerprint::from_bytes([9; 20]);
        let (store, stage) = stage_in(dir.path());

        let abandoned = token();
        assert!(abandoned.abandon());
        let err = stage
            .process(hashed(&path, dir.path(), fingerprint), &abandoned)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
        assert!(!store.thumbnail_exists(&fingerprint));

        // The claim was released, so a later sibling still builds it.
        let step = stage
            .process(hashed(&path, dir.path(), fingerprint), &token())
            .unwrap();
        assert!(matches!(step, Step::Processed(_)));
        assert!(store.thumbnail_exists(&fingerprint));
    }
}
