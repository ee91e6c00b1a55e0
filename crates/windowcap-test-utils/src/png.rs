//! PNG payload checks
//!
//! Every capture the server returns must decode to bytes starting with the
//! 8-byte PNG signature. These helpers check that at the byte level and by
//! actually decoding the image.

use base64::Engine as _;

/// `\x89PNG\r\n\x1a\n`
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// True when `bytes` carries the PNG signature and decodes as a PNG.
///
/// ```
/// use windowcap_test_utils::png::is_valid_png;
///
/// assert!(!is_valid_png(&[]));
/// assert!(!is_valid_png(b"\x89PNG\r\n\x1a\n"));
/// ```
pub fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
        && image::load_from_memory_with_format(bytes, image::ImageFormat::Png).is_ok()
}

/// Decoded dimensions, or `None` if the bytes are not a decodable PNG.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return None;
    }
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .ok()
        .map(|img| (img.width(), img.height()))
}

/// Decodes a base64 image payload and checks it is a non-empty PNG.
///
/// # Panics
///
/// Panics with a description of what was wrong with the payload.
pub fn decode_base64_png(data: &str) -> Vec<u8> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .unwrap_or_else(|e| panic!("image payload is not valid base64: {e}"));
    assert!(!bytes.is_empty(), "image payload decoded to zero bytes");
    assert!(
        bytes.starts_with(&PNG_SIGNATURE),
        "image payload does not start with the PNG signature (first bytes: {:02x?})",
        &bytes[..bytes.len().min(8)]
    );
    bytes
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_valid_png() {
        let png = sample_png(3, 2);
        assert!(is_valid_png(&png));
        assert_eq!(png_dimensions(&png), Some((3, 2)));
    }

    #[test]
    fn test_signature_only_is_not_valid() {
        assert!(!is_valid_png(&PNG_SIGNATURE));
        assert_eq!(png_dimensions(&PNG_SIGNATURE), None);
    }

    #[test]
    fn test_decode_base64_png() {
        let png = sample_png(4, 4);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
        assert_eq!(decode_base64_png(&encoded), png);
    }

    #[test]
    #[should_panic(expected = "PNG signature")]
    fn test_decode_base64_rejects_non_png() {
        decode_base64_png("R0lGODlh");
    }
}
