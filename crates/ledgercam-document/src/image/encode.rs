// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture encoder — turns the final raster into upload bytes.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbaImage};
use ledgercam_core::error::{LedgercamError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Qualities tried, best first, when an upload has a size budget.
pub const QUALITY_LADDER: [u8; 5] = [95, 90, 85, 75, 60];

/// Output container for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureFormat {
    #[default]
    Jpeg,
    Png,
}

impl CaptureFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Encoded bytes and the quality that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: CaptureFormat,
    /// JPEG quality used; ignored for PNG.
    pub quality: u8,
    /// False when even the lowest ladder step exceeded the budget.
    pub within_budget: bool,
}

/// Encode `image`. JPEG drops the alpha channel; `quality` is clamped to 1..=100.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn encode(image: &RgbaImage, format: CaptureFormat, quality: u8) -> Result<Vec<u8>> {
    let bytes = match format {
        CaptureFormat::Jpeg => {
            let mut buffer = Vec::new();
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder).map_err(|err| {
                LedgercamError::EncodeError(format!("JPEG encoding failed: {}", err))
            })?;
            buffer
        }
        CaptureFormat::Png => {
            let mut buffer = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|err| LedgercamError::EncodeError(format!("PNG encoding failed: {}", err)))?;
            buffer
        }
    };
    debug!(bytes = bytes.len(), ?format, "Image encoded");
    Ok(bytes)
}

/// Encode as JPEG at the first ladder quality whose output fits `max_bytes`.
///
/// The ladder is walked at most once. When nothing fits, the smallest
/// encoding is returned with `within_budget` set to false.
#[instrument(skip(image, ladder), fields(width = image.width(), height = image.height()))]
pub fn encode_within_budget(image: &RgbaImage, max_bytes: usize, ladder: &[u8]) -> Result<EncodedImage> {
    let mut smallest: Option<EncodedImage> = None;

    for &quality in ladder {
        let bytes = encode(image, CaptureFormat::Jpeg, quality)?;
        if bytes.len() <= max_bytes {
            debug!(quality, bytes = bytes.len(), max_bytes, "Encoding fits the budget");
            return Ok(EncodedImage {
                bytes,
                format: CaptureFormat::Jpeg,
                quality,
                within_budget: true,
            });
        }
        if smallest.as_ref().is_none_or(|s| bytes.len() < s.bytes.len()) {
            smallest = Some(EncodedImage {
                bytes,
                format: CaptureFormat::Jpeg,
                quality,
                within_budget: false,
            });
        }
    }

    match smallest {
        Some(best) => {
            warn!(
                bytes = best.bytes.len(),
                max_bytes,
                quality = best.quality,
                "No quality step fits the budget; using the smallest encoding"
            );
            Ok(best)
        }
        None => Err(LedgercamError::EncodeError("empty quality ladder".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn noisy(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 7919 + y * 104_729) % 251) as u8;
            Rgba([v, v.wrapping_mul(3), v.wrapping_add(90), 255])
        })
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let bytes = encode(&noisy(32, 24), CaptureFormat::Jpeg, 95).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn png_round_trips_losslessly() {
        let image = noisy(16, 16);
        let bytes = encode(&image, CaptureFormat::Png, 95).expect("encode");
        let decoded = image::load_from_memory(&bytes).expect("decode").to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn encoding_is_deterministic() {
        let image = noisy(40, 30);
        let a = encode(&image, CaptureFormat::Jpeg, 90).expect("encode");
        let b = encode(&image, CaptureFormat::Jpeg, 90).expect("encode");
        assert_eq!(a, b);
    }

    #[test]
    fn generous_budget_keeps_top_quality() {
        let encoded = encode_within_budget(&noisy(64, 64), usize::MAX, &QUALITY_LADDER).expect("encode");
        assert_eq!(encoded.quality, 95);
        assert!(encoded.within_budget);
    }

    #[test]
    fn impossible_budget_returns_smallest() {
        let encoded = encode_within_budget(&noisy(64, 64), 10, &QUALITY_LADDER).expect("encode");
        assert!(!encoded.within_budget);
        assert_eq!(encoded.quality, 60);
    }

    #[test]
    fn empty_ladder_is_an_error() {
        assert!(encode_within_budget(&noisy(8, 8), 1000, &[]).is_err());
    }
}
