//! PNG encoding for captured pixels
//!
//! Captures are always delivered as lossless PNG. The compression level is a
//! speed/size trade-off chosen at startup; every level decodes to the same
//! pixels.
//!
//! # Examples
//!
//! ```
//! use windowcap_core::{
//!     capture::PixelBuffer,
//!     util::encode::{PngCompression, encode_png_with_compression, has_png_signature},
//! };
//!
//! let pixels = PixelBuffer::from_test_pattern(320, 200);
//! let png = encode_png_with_compression(&pixels, PngCompression::Fast).unwrap();
//! assert!(has_png_signature(&png));
//! ```

use std::{fmt, io::Cursor, str::FromStr};

use base64::Engine as _;
use image::{
    ExtendedColorType, ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};
use serde::{Deserialize, Serialize};

use crate::{
    capture::PixelBuffer,
    error::{CaptureError, CaptureResult},
};

/// The eight bytes every PNG stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// PNG compression level.
///
/// `Fast` is the default: screenshots are encoded on the request path and
/// the size difference rarely matters to an MCP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    #[default]
    Fast,
    Default,
    Best,
}

impl PngCompression {
    pub const ALL: [PngCompression; 3] = [Self::Fast, Self::Default, Self::Best];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Default => "default",
            Self::Best => "best",
        }
    }

    fn compression_type(self) -> CompressionType {
        match self {
            Self::Fast => CompressionType::Fast,
            Self::Default => CompressionType::Default,
            Self::Best => CompressionType::Best,
        }
    }
}

impl fmt::Display for PngCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PngCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "default" => Ok(Self::Default),
            "best" => Ok(Self::Best),
            other => Err(format!(
                "unknown PNG compression '{other}' (expected fast, default or best)"
            )),
        }
    }
}

/// Encodes pixels as PNG with [`PngCompression::Default`].
pub fn encode_png(buffer: &PixelBuffer) -> CaptureResult<Vec<u8>> {
    encode_png_with_compression(buffer, PngCompression::Default)
}

/// Encodes pixels as PNG at the given compression level.
///
/// # Errors
///
/// [`CaptureError::EncodingFailed`] for an empty buffer or an encoder failure.
pub fn encode_png_with_compression(
    buffer: &PixelBuffer,
    compression: PngCompression,
) -> CaptureResult<Vec<u8>> {
    let (width, height) = buffer.dimensions();
    if buffer.is_empty() {
        return Err(CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: format!("cannot encode an empty {width}x{height} image"),
        });
    }

    // Raw RGBA compresses to well under one byte per pixel for screen content.
    let mut output = Vec::with_capacity((width as usize * height as usize) / 4);
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut output),
        compression.compression_type(),
        FilterType::Adaptive,
    );
    encoder
        .write_image(buffer.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: e.to_string(),
        })?;

    tracing::trace!(width, height, bytes = output.len(), %compression, "encoded png");
    Ok(output)
}

/// Returns true when `bytes` starts with the PNG signature.
pub fn has_png_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Standard base64 (with padding), as used for MCP image content.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
