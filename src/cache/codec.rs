//! Image decoding and JPEG encoding.
//!
//! Fetched bytes are decoded once into a [`CachedImage`] and shared between
//! the tiers. The disk tier stores images re-encoded as JPEG at a configured
//! quality.
//!
//! # Design Decisions
//!
//! - **Always re-encode for disk**: whatever format the server returned, the
//!   disk tier holds JPEG, so every file in the cache directory has one format.
//!
//! - **Fractional quality**: quality is configured as a fraction in `(0, 1]`
//!   and mapped to the JPEG encoder's 1-100 scale.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageReader};

use crate::error::CacheError;

/// Default encode quality as a fraction.
pub const DEFAULT_ENCODE_QUALITY: f32 = 0.75;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Cached Image
// =============================================================================

/// Decoded image handle shared between cache tiers.
///
/// Cloning only bumps a reference count.
#[derive(Debug, Clone)]
pub struct CachedImage {
    inner: Arc<DynamicImage>,
}

impl CachedImage {
    /// Wrap an already decoded image.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            inner: Arc::new(image),
        }
    }

    /// Decode raw bytes in any supported format (format is sniffed).
    pub fn decode(data: &[u8]) -> Result<Self, image::ImageError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        Ok(Self::new(reader.decode()?))
    }

    /// The decoded image.
    pub fn image(&self) -> &DynamicImage {
        &self.inner
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.width(), self.inner.height())
    }

    /// Approximate memory cost: the size of the decoded pixel buffer.
    pub fn cost(&self) -> usize {
        self.inner.as_bytes().len()
    }

    /// Whether two handles point at the same decoded image.
    pub fn ptr_eq(&self, other: &CachedImage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<DynamicImage> for CachedImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

// =============================================================================
// JPEG Encoding
// =============================================================================

/// Encode an image as JPEG at the given quality (1-100).
///
/// Images without a JPEG-compatible color type are converted to RGB8 first.
///
/// # Errors
///
/// Returns [`CacheError::Encode`] if the image has a zero dimension or the
/// encoder rejects it.
pub fn encode_jpeg(image: &CachedImage, quality: u8) -> Result<Bytes, CacheError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CacheError::Encode {
            message: format!("image has zero dimension ({}x{})", width, height),
        });
    }

    let quality = clamp_quality(quality);
    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);

    let converted;
    let (pixels, color) = match image.image() {
        DynamicImage::ImageLuma8(gray) => (gray.as_raw().as_slice(), ExtendedColorType::L8),
        DynamicImage::ImageRgb8(rgb) => (rgb.as_raw().as_slice(), ExtendedColorType::Rgb8),
        other => {
            converted = other.to_rgb8();
            (converted.as_raw().as_slice(), ExtendedColorType::Rgb8)
        }
    };

    encoder
        .encode(pixels, width, height, color)
        .map_err(|e| CacheError::Encode {
            message: e.to_string(),
        })?;

    Ok(Bytes::from(output))
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Map a fractional quality in `(0, 1]` to the JPEG 1-100 scale.
///
/// Out-of-range and non-finite values are clamped.
pub fn jpeg_quality_from_fraction(fraction: f32) -> u8 {
    if !fraction.is_finite() {
        return MAX_JPEG_QUALITY;
    }
    let scaled = (fraction * 100.0).round();
    clamp_quality(scaled.clamp(0.0, 255.0) as u8)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
