//! Camera frames and the face crop cut out of them.
//!
//! [ImageFrame] mirrors `sensor_msgs/Image`: a raw pixel buffer with a
//! row stride and an explicit encoding tag. Frames are converted to
//! RGB before detection, and the crop is re-encoded as JPEG for upload.

use eyre::{Result, WrapErr, bail, ensure};
use image::{RgbImage, codecs::jpeg::JpegEncoder, imageops};
use std::{fmt, str::FromStr};

/// JPEG quality used for the uploaded crop.
pub const JPEG_QUALITY: u8 = 95;

/// Pixel layout tag of an [ImageFrame].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Mono8,
}

impl Encoding {
    pub fn channels(self) -> usize {
        match self {
            Encoding::Rgb8 | Encoding::Bgr8 => 3,
            Encoding::Rgba8 | Encoding::Bgra8 => 4,
            Encoding::Mono8 => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Rgb8 => "rgb8",
            Encoding::Bgr8 => "bgr8",
            Encoding::Rgba8 => "rgba8",
            Encoding::Bgra8 => "bgra8",
            Encoding::Mono8 => "mono8",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let encoding = match s {
            "rgb8" => Encoding::Rgb8,
            "bgr8" => Encoding::Bgr8,
            "rgba8" => Encoding::Rgba8,
            "bgra8" => Encoding::Bgra8,
            "mono8" | "8UC1" => Encoding::Mono8,
            _ => bail!("Unsupported image encoding: {}", s),
        };
        Ok(encoding)
    }
}

/// A raw camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub encoding: Encoding,
    /// Row length in bytes, including any padding.
    pub step: usize,
    pub data: Vec<u8>,
}

impl ImageFrame {
    /// Create a tightly packed frame (no row padding).
    pub fn packed(width: u32, height: u32, encoding: Encoding, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            encoding,
            step: width as usize * encoding.channels(),
            data,
        }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::packed(width, height, Encoding::Rgb8, image.into_raw())
    }

    /// Convert to the RGB layout the detector expects.
    pub fn to_rgb(&self) -> Result<RgbImage> {
        let channels = self.encoding.channels();
        let row_len = self.width as usize * channels;
        let height = self.height as usize;

        ensure!(
            self.width > 0 && self.height > 0,
            "Empty frame: {}x{}",
            self.width,
            self.height
        );
        ensure!(
            self.step >= row_len,
            "Row stride {} is shorter than {} bytes for {}x{} {}",
            self.step,
            row_len,
            self.width,
            self.height,
            self.encoding
        );
        let Some(required) = self
            .step
            .checked_mul(height - 1)
            .and_then(|rows| rows.checked_add(row_len))
        else {
            bail!(
                "Frame stride overflows: step {} over {} rows",
                self.step,
                self.height
            );
        };
        ensure!(
            self.data.len() >= required,
            "Frame buffer holds {} bytes, expected at least {}",
            self.data.len(),
            required
        );

        let mut rgb = Vec::with_capacity(self.width as usize * height * 3);
        for row in self.data.chunks(self.step).take(height) {
            for px in row[..row_len].chunks_exact(channels) {
                match self.encoding {
                    Encoding::Rgb8 | Encoding::Rgba8 => rgb.extend_from_slice(&px[..3]),
                    Encoding::Bgr8 | Encoding::Bgra8 => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
                    Encoding::Mono8 => rgb.extend_from_slice(&[px[0]; 3]),
                }
            }
        }

        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| eyre::eyre!("Pixel buffer does not match frame dimensions"))
    }
}

/// Face location in pixel coordinates. `right` and `bottom` are
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BoundingBox {
    pub fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Build from a detector rectangle whose origin may lie outside the
    /// frame.
    pub fn from_rect(x: i32, y: i32, width: u32, height: u32) -> Self {
        let left = x.max(0) as u32;
        let top = y.max(0) as u32;
        let right = (x as i64 + width as i64).clamp(0, u32::MAX as i64) as u32;
        let bottom = (y as i64 + height as i64).clamp(0, u32::MAX as i64) as u32;
        Self::new(top, right, bottom, left)
    }
}

/// Cut `bbox` out of `image`, clamping it to the image bounds.
pub fn crop(image: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let left = bbox.left.min(width);
    let right = bbox.right.min(width);
    let top = bbox.top.min(height);
    let bottom = bbox.bottom.min(height);

    ensure!(
        left < right && top < bottom,
        "Face box {:?} is empty within a {}x{} frame",
        bbox,
        width,
        height
    );

    Ok(imageops::crop_imm(image, left, top, right - left, bottom - top).to_image())
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(image)
        .wrap_err("Failed to encode face crop as JPEG")?;
    Ok(bytes)
}
