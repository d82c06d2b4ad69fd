//! Lossy encode step at the end of the transmission pipeline.

use crate::detector::PixelBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

/// Quality factor the original tuning settled on (0.7 on a 0..1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    ShapeMismatch { width: u32, height: u32, len: usize },
    #[error(transparent)]
    Image(#[from] image::error::ImageError),
}

/// Turns a raw pixel snapshot into the bytes that go on the wire.
pub trait FrameEncoder {
    fn encode(&self, frame: &PixelBuffer) -> Result<Vec<u8>, EncodeError>;
}

/// JPEG at a fixed quality factor.
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new(quality: u8) -> Self {
        JpegFrameEncoder { quality }
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        JpegFrameEncoder::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.data.len() != expected {
            return Err(EncodeError::ShapeMismatch {
                width: frame.width,
                height: frame.height,
                len: frame.data.len(),
            });
        }

        // JPEG carries no alpha; the change detector ignores it too.
        let mut rgb = Vec::with_capacity(expected / 4 * 3);
        for pixel in frame.data.chunks_exact(4) {
            rgb.extend_from_slice(&pixel[..3]);
        }

        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
        encoder.encode(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)?;
        Ok(buffer)
    }
}
