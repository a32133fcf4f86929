//! EXIF orientation: tag lookup and the matching pixel transform.

use image::DynamicImage;

/// Mirror applied after rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flip {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// Rotation angle (degrees, counter-clockwise positive) plus flip needed to
/// display an image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    /// One of 0, 90, 180, -90
    pub angle: i16,
    pub flip: Flip,
}

impl Orientation {
    /// Identity transform.
    pub const UPRIGHT: Orientation = Orientation {
        angle: 0,
        flip: Flip::None,
    };

    /// Map an EXIF orientation tag (1-8) to a transform.
    ///
    /// Unknown values are treated as upright.
    pub fn from_exif(tag: u32) -> Self {
        let (angle, flip) = match tag {
            1 => (0, Flip::None),
            2 => (0, Flip::Horizontal),
            3 => (180, Flip::None),
            4 => (180, Flip::Horizontal),
            5 => (-90, Flip::Horizontal),
            6 => (-90, Flip::None),
            7 => (90, Flip::Horizontal),
            8 => (90, Flip::None),
            _ => (0, Flip::None),
        };
        Self { angle, flip }
    }

    /// Whether this transform changes the image at all.
    pub fn is_upright(&self) -> bool {
        *self == Self::UPRIGHT
    }

    /// Rotate, then flip.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        let rotated = match self.angle {
            90 => image.rotate270(),
            -90 => image.rotate90(),
            180 => image.rotate180(),
            _ => image,
        };
        match self.flip {
            Flip::None => rotated,
            Flip::Horizontal => rotated.fliph(),
            Flip::Vertical => rotated.flipv(),
        }
    }
}
