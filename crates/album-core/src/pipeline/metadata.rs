//! EXIF metadata extraction from in-memory image bytes.

use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

use crate::types::PhotoMetadata;

/// Extracts EXIF metadata from image bytes.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract EXIF data from the bytes of a JPEG (or other EXIF container).
    ///
    /// Reads through its own cursor, so the caller's bytes stay untouched for
    /// the image decoder. Returns `None` if there is no EXIF block or it can't
    /// be parsed; partial data is returned when only some tags are present.
    pub fn from_bytes(bytes: &[u8]) -> Option<PhotoMetadata> {
        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::trace!("Could not decode Exif information: {}", e);
                return None;
            }
        };

        let data = PhotoMetadata {
            captured_at: Self::get_datetime(&exif),
            gps_latitude: Self::get_gps_coord(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
            gps_longitude: Self::get_gps_coord(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
            orientation: Self::get_u32(&exif, Tag::Orientation),
        };

        if data == PhotoMetadata::default() {
            None
        } else {
            Some(data)
        }
    }

    /// Get a u32 field from EXIF data.
    fn get_u32(exif: &exif::Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Short(v) => v.first().map(|&x| x as u32),
                Value::Long(v) => v.first().copied(),
                _ => None,
            })
    }

    /// Get the capture datetime, preferring DateTimeOriginal over DateTime.
    fn get_datetime(exif: &exif::Exif) -> Option<String> {
        exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))
            .map(|f| {
                let s = f.display_value().to_string();
                s.trim_matches('"').to_string()
            })
    }

    /// Get GPS coordinate, converting from degrees/minutes/seconds to decimal.
    fn get_gps_coord(exif: &exif::Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let reference = exif.get_field(ref_tag, In::PRIMARY)?;

        let degrees = Self::parse_gps_rationals(&coord.value)?;
        let ref_str = reference.display_value().to_string();

        // N/E positive, S/W negative
        let sign = if ref_str.contains('S') || ref_str.contains('W') {
            -1.0
        } else {
            1.0
        };

        Some(sign * degrees)
    }

    /// Parse GPS rationals (degrees, minutes, seconds) to decimal degrees.
    fn parse_gps_rationals(value: &Value) -> Option<f64> {
        match value {
            Value::Rational(rationals) if rationals.len() >= 3 => {
                let degrees = rationals[0].to_f64();
                let minutes = rationals[1].to_f64();
                let seconds = rationals[2].to_f64();
                Some(degrees + minutes / 60.0 + seconds / 3600.0)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// JPEG SOI followed by an APP1 segment holding a big-endian TIFF
    /// header with a single Orientation entry, then EOI.
    fn jpeg_with_orientation(orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut out = vec![0xff, 0xd8, 0xff, 0xe1];
        let len = (2 + 6 + tiff.len()) as u16;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(b"Exif\x00\x00");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&[0xff, 0xd9]);
        out
    }

    #[test]
    fn test_reads_orientation_tag() {
        let bytes = jpeg_with_orientation(6);
        let meta = MetadataExtractor::from_bytes(&bytes).unwrap();
        assert_eq!(meta.orientation, Some(6));
        assert_eq!(meta.captured_at, None);
        assert_eq!(meta.gps_latitude, None);
    }

    #[test]
    fn test_no_exif_is_none() {
        assert!(MetadataExtractor::from_bytes(&[0xff, 0xd8, 0xff, 0xd9]).is_none());
        assert!(MetadataExtractor::from_bytes(b"not an image").is_none());
        assert!(MetadataExtractor::from_bytes(&[]).is_none());
    }

    #[test]
    fn test_gps_rationals_to_decimal() {
        let value = Value::Rational(vec![
            exif::Rational { num: 51, denom: 1 },
            exif::Rational { num: 30, denom: 1 },
            exif::Rational { num: 36, denom: 1 },
        ]);
        let degrees = MetadataExtractor::parse_gps_rationals(&value).unwrap();
        assert!((degrees - 51.51).abs() < 1e-9);
    }
}
