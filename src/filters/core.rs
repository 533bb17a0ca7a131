//! Core pixel data model shared by every blur kernel.
//!
//! This module provides:
//! - `PixelBuffer`, a row-major grid of packed `0xAARRGGBB` samples
//! - Channel pack/unpack helpers
//! - Conversion from/to RGBA u8 arrays (height, width, 4)

use ndarray::{Array3, ArrayView3};

use crate::error::{BlurError, Result};

/// Bits of a packed pixel holding alpha. Blurs never modify them.
pub const ALPHA_MASK: u32 = 0xFF00_0000;
/// Bits of a packed pixel holding the colour channels.
pub const RGB_MASK: u32 = 0x00FF_FFFF;

// ============================================================================
// Channel helpers
// ============================================================================

#[inline]
pub fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

#[inline]
pub fn red(pixel: u32) -> u8 {
    (pixel >> 16) as u8
}

#[inline]
pub fn green(pixel: u32) -> u8 {
    (pixel >> 8) as u8
}

#[inline]
pub fn blue(pixel: u32) -> u8 {
    pixel as u8
}

/// Pack four channels into `0xAARRGGBB`.
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Colour channels of a pixel as `[r, g, b]`, widened for accumulation.
#[inline]
pub(crate) fn rgb_channels(pixel: u32) -> [u64; 3] {
    [
        red(pixel) as u64,
        green(pixel) as u64,
        blue(pixel) as u64,
    ]
}

/// Combine the alpha of `alpha_source` with already-computed colour channels.
/// Channel values above 255 saturate.
#[inline]
pub(crate) fn with_rgb(alpha_source: u32, rgb: [u64; 3]) -> u32 {
    (alpha_source & ALPHA_MASK)
        | (rgb[0].min(255) as u32) << 16
        | (rgb[1].min(255) as u32) << 8
        | rgb[2].min(255) as u32
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// A `width` x `height` image of packed ARGB pixels, row-major
/// (`index = y * width + x`).
///
/// The pixel count always equals `width * height` and both dimensions are
/// non-zero; the constructors reject anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Wrap existing pixels.
    ///
    /// # Errors
    /// `InvalidDimensions` if a dimension is zero or `pixels.len() != width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        let expected = (width as usize).checked_mul(height as usize);
        if width == 0 || height == 0 || expected != Some(pixels.len()) {
            return Err(BlurError::InvalidDimensions {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: u32) -> Result<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(BlurError::InvalidDimensions {
                width,
                height,
                len: 0,
            })?;
        Self::new(width, height, vec![color; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable access to the pixels. The length cannot change through a slice.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Overwrite the pixel at `(x, y)`. Returns `false` outside the image.
    pub fn set(&mut self, x: u32, y: u32, color: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = self.index(x, y);
        self.pixels[index] = color;
        true
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Swap in the output of a completed pass.
    pub(crate) fn replace_pixels(&mut self, pixels: Vec<u32>) {
        debug_assert_eq!(pixels.len(), self.pixels.len());
        self.pixels = pixels;
    }

    // ========================================================================
    // RGBA conversion
    // ========================================================================

    /// Build a buffer from an RGBA u8 array of shape (height, width, 4).
    ///
    /// # Arguments
    /// * `input` - 3D array view with channels in `[r, g, b, a]` order
    ///
    /// # Errors
    /// `UnsupportedChannels` unless the last axis has length 4,
    /// `InvalidDimensions` for empty or oversized arrays.
    pub fn from_rgba(input: ArrayView3<u8>) -> Result<Self> {
        let (height, width, channels) = input.dim();
        if channels != 4 {
            return Err(BlurError::UnsupportedChannels(channels));
        }
        let (w, h) = dimensions(width, height)?;

        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(pack_argb(
                    input[[y, x, 3]],
                    input[[y, x, 0]],
                    input[[y, x, 1]],
                    input[[y, x, 2]],
                ));
            }
        }
        Self::new(w, h, pixels)
    }

    /// RGBA u8 array of shape (height, width, 4).
    pub fn to_rgba(&self) -> Array3<u8> {
        let (height, width) = (self.height as usize, self.width as usize);
        Array3::from_shape_fn((height, width, 4), |(y, x, c)| {
            let pixel = self.pixels[y * width + x];
            match c {
                0 => red(pixel),
                1 => green(pixel),
                2 => blue(pixel),
                _ => alpha(pixel),
            }
        })
    }

    /// Build a buffer from flat RGBA bytes (length = width * height * 4).
    pub fn from_rgba_bytes(data: &[u8], width: usize, height: usize) -> Result<Self> {
        let (w, h) = dimensions(width, height)?;
        if Some(data.len()) != width.checked_mul(height).and_then(|n| n.checked_mul(4)) {
            return Err(BlurError::InvalidDimensions {
                width: w,
                height: h,
                len: data.len() / 4,
            });
        }
        let pixels = data
            .chunks_exact(4)
            .map(|px| pack_argb(px[3], px[0], px[1], px[2]))
            .collect();
        Self::new(w, h, pixels)
    }

    /// Flat RGBA bytes in row-major order.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| [red(p), green(p), blue(p), alpha(p)])
            .collect()
    }
}

fn dimensions(width: usize, height: usize) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(BlurError::InvalidDimensions {
            width: u32::MAX,
            height: u32::MAX,
            len: 0,
        }),
    }
}
