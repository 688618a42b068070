//! Payload decoders.
//!
//! - [`ImageDecoder`]: decodes PNG/JPEG/WebP into a shared `DynamicImage`,
//!   downscaling wide images to a thumbnail.
//! - [`RawBytesDecoder`]: keeps the payload as-is.

use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::trace;

use crate::domain::errors::FetchError;
use crate::domain::ports::Decoder;
use crate::infrastructure::config::DecodeConfig;

/// Decodes image payloads.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    max_width: u32,
    max_height: u32,
}

impl ImageDecoder {
    /// Creates a decoder that downscales images wider than `max_width`.
    ///
    /// A `max_width` of zero disables downscaling; a `max_height` of zero
    /// leaves the height unbounded.
    #[must_use]
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Creates a decoder from decode settings.
    #[must_use]
    pub const fn from_config(config: &DecodeConfig) -> Self {
        Self::new(config.thumbnail_max_width, config.thumbnail_max_height)
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::from_config(&DecodeConfig::default())
    }
}

impl Decoder<Arc<DynamicImage>> for ImageDecoder {
    fn decode(&self, payload: &Bytes) -> Result<Arc<DynamicImage>, FetchError> {
        let img = image::load_from_memory(payload)
            .map_err(|e| FetchError::decode(format!("Failed to decode image: {e}")))?;

        let img = if self.max_width > 0 && img.width() > self.max_width {
            trace!(
                width = img.width(),
                height = img.height(),
                "Downscaling to thumbnail"
            );
            // Zero height means the width alone bounds the thumbnail.
            let max_height = if self.max_height == 0 {
                u32::MAX
            } else {
                self.max_height
            };
            img.resize(self.max_width, max_height, FilterType::Lanczos3)
        } else {
            img
        };

        Ok(Arc::new(img))
    }
}

/// Passes payloads through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesDecoder;

impl Decoder<Bytes> for RawBytesDecoder {
    fn decode(&self, payload: &Bytes) -> Result<Bytes, FetchError> {
        if payload.is_empty() {
            return Err(FetchError::decode("empty payload"));
        }
        Ok(payload.clone())
    }
}

/// Encodes a blank PNG of the given size. Test helper.
#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Bytes {
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    Bytes::from(out.into_inner())
}
