//! Checks a submitted frame before any engine resource is consumed.
//!
//! Input is the `frameData` string of a request: base64 image bytes,
//! optionally prefixed with a `data:<mime>;base64,` URL header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ColorType, DynamicImage};
use thiserror::Error;

use crate::shared::constants::{MIN_DECODED_BYTES, MIN_FRAME_DATA_LENGTH, MIN_FRAME_DIMENSION};
use crate::shared::frame::Frame;

const DATA_URL_MARKER: &str = "base64,";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Frame data too short: {length} characters (minimum {min})")]
    TooShort { length: usize, min: usize },
    #[error("Invalid base64 padding")]
    InvalidPadding,
    #[error("Invalid base64 data: {0}")]
    InvalidBase64(String),
    #[error("Decoded frame too small: {length} bytes (minimum {min})")]
    TooFewBytes { length: usize, min: usize },
    #[error("Cannot decode image: {0}")]
    Undecodable(String),
    #[error("Image dimensions {width}x{height} below minimum {min}x{min}")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("Unsupported channel layout: {0}")]
    UnsupportedLayout(String),
}

/// A frame that passed every check, decoded to RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedFrame {
    pub frame: Frame,
    /// Size of the decoded (still encoded-image) payload in bytes.
    pub encoded_len: usize,
}

pub fn validate(frame_data: &str) -> Result<ValidatedFrame, ValidationError> {
    if frame_data.len() < MIN_FRAME_DATA_LENGTH {
        return Err(ValidationError::TooShort {
            length: frame_data.len(),
            min: MIN_FRAME_DATA_LENGTH,
        });
    }

    let payload = strip_data_url(frame_data);
    let padded = fix_padding(payload)?;
    let bytes = STANDARD
        .decode(padded.as_bytes())
        .map_err(|e| ValidationError::InvalidBase64(e.to_string()))?;

    if bytes.len() < MIN_DECODED_BYTES {
        return Err(ValidationError::TooFewBytes {
            length: bytes.len(),
            min: MIN_DECODED_BYTES,
        });
    }

    let image =
        image::load_from_memory(&bytes).map_err(|e| ValidationError::Undecodable(e.to_string()))?;

    let (width, height) = (image.width(), image.height());
    if width < MIN_FRAME_DIMENSION || height < MIN_FRAME_DIMENSION {
        return Err(ValidationError::TooSmall {
            width,
            height,
            min: MIN_FRAME_DIMENSION,
        });
    }

    let frame = to_rgb_frame(image)?;
    Ok(ValidatedFrame {
        frame,
        encoded_len: bytes.len(),
    })
}

/// Drops everything up to and including the first `base64,` marker.
fn strip_data_url(data: &str) -> &str {
    match data.find(DATA_URL_MARKER) {
        Some(pos) => &data[pos + DATA_URL_MARKER.len()..],
        None => data,
    }
}

/// Removes whitespace and restores missing `=` padding.
fn fix_padding(payload: &str) -> Result<String, ValidationError> {
    let mut cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match cleaned.len() % 4 {
        0 => {}
        1 => return Err(ValidationError::InvalidPadding),
        rem => cleaned.extend(std::iter::repeat('=').take(4 - rem)),
    }
    Ok(cleaned)
}

/// Accepts 8-bit RGB or RGBA; alpha is discarded.
fn to_rgb_frame(image: DynamicImage) -> Result<Frame, ValidationError> {
    let rgb = match image.color() {
        ColorType::Rgb8 => image.into_rgb8(),
        ColorType::Rgba8 => image.to_rgb8(),
        other => return Err(ValidationError::UnsupportedLayout(format!("{other:?}"))),
    };
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> String {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        STANDARD.encode(bytes)
    }

    /// Base64 BMP of a `size`² RGB gradient.
    pub(crate) fn rgb_frame_data(size: u32) -> String {
        let img = RgbImage::from_fn(size, size, |x, y| image::Rgb([x as u8, y as u8, 128]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Bmp)
    }

    #[test]
    fn test_valid_rgb_frame() {
        let validated = validate(&rgb_frame_data(64)).unwrap();
        assert_eq!(validated.frame.width(), 64);
        assert_eq!(validated.frame.height(), 64);
        assert_eq!(validated.frame.channels(), 3);
        assert_eq!(&validated.frame.data()[..3], &[0, 0, 128]);
        assert!(validated.encoded_len > 64 * 64 * 3);
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let data = format!("data:image/bmp;base64,{}", rgb_frame_data(64));
        assert!(validate(&data).is_ok());
    }

    #[test]
    fn test_missing_padding_is_restored() {
        // 34x34 BMP is 3590 bytes, so its base64 ends in padding
        let data = rgb_frame_data(34);
        assert!(data.ends_with('='));
        assert!(validate(data.trim_end_matches('=')).is_ok());
    }

    #[test]
    fn test_fix_padding() {
        assert_eq!(fix_padding("QUJD").unwrap(), "QUJD");
        assert_eq!(fix_padding("QUI").unwrap(), "QUI=");
        assert_eq!(fix_padding("QQ").unwrap(), "QQ==");
        assert_eq!(fix_padding("Q U\nI").unwrap(), "QUI=");
        assert_eq!(fix_padding("QUJDR"), Err(ValidationError::InvalidPadding));
    }

    #[test]
    fn test_embedded_whitespace_is_ignored() {
        let data = rgb_frame_data(64);
        let (a, b) = data.split_at(200);
        assert!(validate(&format!("{a}\n  {b}")).is_ok());
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            validate("abcd"),
            Err(ValidationError::TooShort { length: 4, min: 100 })
        );
        assert!(matches!(validate(""), Err(ValidationError::TooShort { .. })));
    }

    #[test]
    fn test_impossible_padding() {
        let data = "A".repeat(101);
        assert_eq!(validate(&data).unwrap_err(), ValidationError::InvalidPadding);
    }

    #[test]
    fn test_invalid_base64_characters() {
        let data = "!".repeat(120);
        assert!(matches!(validate(&data), Err(ValidationError::InvalidBase64(_))));
    }

    #[test]
    fn test_too_few_decoded_bytes() {
        // long data URL header around a tiny payload
        let data = format!("data:image/png;{}base64,{}", "x".repeat(70), STANDARD.encode([0u8; 10]));
        assert!(matches!(
            validate(&data),
            Err(ValidationError::TooFewBytes { length: 10, .. })
        ));
    }

    #[test]
    fn test_garbage_bytes_do_not_decode() {
        let data = STANDARD.encode([7u8; 300]);
        assert!(matches!(validate(&data), Err(ValidationError::Undecodable(_))));
    }

    #[test]
    fn test_small_dimensions_rejected() {
        let img = RgbImage::from_pixel(16, 40, image::Rgb([1, 2, 3]));
        let data = encode(DynamicImage::ImageRgb8(img), ImageFormat::Bmp);
        assert_eq!(
            validate(&data).unwrap_err(),
            ValidationError::TooSmall { width: 16, height: 40, min: 32 }
        );
    }

    #[test]
    fn test_rgba_alpha_is_dropped() {
        let img = image::RgbaImage::from_pixel(40, 40, image::Rgba([9, 8, 7, 0]));
        let data = encode(DynamicImage::ImageRgba8(img), ImageFormat::Pnm);
        let validated = validate(&data).unwrap();
        assert_eq!(validated.frame.channels(), 3);
        assert_eq!(&validated.frame.data()[..3], &[9, 8, 7]);
    }

    #[test]
    fn test_grayscale_rejected() {
        let img = image::GrayImage::from_fn(48, 48, |x, _| image::Luma([x as u8]));
        let data = encode(DynamicImage::ImageLuma8(img), ImageFormat::Pnm);
        assert!(matches!(
            validate(&data),
            Err(ValidationError::UnsupportedLayout(_))
        ));
    }
}
