//! Raw RGBA pixel buffers produced by backends
//!
//! A [`PixelBuffer`] is what a backend hands to the engine: uncompressed
//! RGBA8 pixels plus dimensions. The engine never resizes or recompresses it;
//! the buffer is encoded to PNG exactly as captured.

use image::{Rgba, RgbaImage};

use crate::error::{CaptureError, CaptureResult};

/// Wrapper around `image::RgbaImage`
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    inner: RgbaImage,
}

impl PixelBuffer {
    /// Creates a new PixelBuffer from an RGBA image
    pub fn new(image: RgbaImage) -> Self {
        Self { inner: image }
    }

    /// Creates a buffer from raw RGBA8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::CaptureFailed`] if `data` does not hold
    /// exactly `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> CaptureResult<Self> {
        let actual = data.len();
        RgbaImage::from_raw(width, height, data)
            .map(Self::new)
            .ok_or_else(|| CaptureError::CaptureFailed {
                target: format!("{width}x{height} buffer"),
                reason: format!(
                    "expected {} bytes of RGBA data, got {actual}",
                    u64::from(width) * u64::from(height) * 4
                ),
            })
    }

    /// Creates a deterministic gradient test pattern.
    ///
    /// ```
    /// use windowcap_core::capture::PixelBuffer;
    ///
    /// let buffer = PixelBuffer::from_test_pattern(64, 32);
    /// assert_eq!(buffer.dimensions(), (64, 32));
    /// ```
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        let w = width.max(1);
        let h = height.max(1);
        let image = RgbaImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / w) as u8;
            let g = (y * 255 / h) as u8;
            let b = ((x + y) % 256) as u8;
            Rgba([r, g, b, 255])
        });
        Self::new(image)
    }

    /// Returns the image dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// True when the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.inner.width() == 0 || self.inner.height() == 0
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.inner.as_raw()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.inner
    }

    pub fn into_inner(self) -> RgbaImage {
        self.inner
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_accepts_exact_length() {
        let buffer = PixelBuffer::from_raw(2, 2, vec![0u8; 16]).unwrap();
        assert_eq!(buffer.dimensions(), (2, 2));
        assert_eq!(buffer.as_raw().len(), 16);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        let err = PixelBuffer::from_raw(4, 4, vec![0u8; 10]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected 64 bytes"));
        assert!(msg.contains("got 10"));
    }

    #[test]
    fn test_test_pattern_is_deterministic() {
        let a = PixelBuffer::from_test_pattern(16, 8);
        let b = PixelBuffer::from_test_pattern(16, 8);
        assert_eq!(a.as_raw(), b.as_raw());
        assert_eq!(a.as_rgba().get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_zero_sized_buffer_is_empty() {
        let buffer = PixelBuffer::from_test_pattern(0, 10);
        assert!(buffer.is_empty());
        assert_eq!(buffer.width(), 0);
    }

    #[test]
    fn test_from_rgba_image() {
        let image = RgbaImage::new(3, 5);
        let buffer: PixelBuffer = image.into();
        assert_eq!(buffer.height(), 5);
        assert_eq!(buffer.into_inner().width(), 3);
    }
}
