//! Cartesian <-> polar resampling for radial and circular blurs.
//!
//! A polar buffer has one row per radius sample and one column per angle
//! sample (`index = i * angular_samples + j`). Blurring its columns smears
//! along the radius (zoom look); blurring its rows smears along the angle
//! (rotation look). Sampling is nearest-neighbour in both directions.

use std::f64::consts::{PI, TAU};

use crate::error::{BlurError, Result};
use crate::filters::core::PixelBuffer;

/// Fill value for polar samples that fall outside the Cartesian image, and
/// for Cartesian pixels beyond the sampled radius.
pub const POLAR_SENTINEL: u32 = 0xFFFF_FFFF;

/// Largest polar grid (`radius_samples * angular_samples`) that will be
/// allocated. Centres far outside the image hit this limit.
pub const MAX_POLAR_SAMPLES: usize = 1 << 28;

/// Centre and resolution of a polar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolarGeometry {
    pub center_x: i32,
    pub center_y: i32,
    /// Number of radius samples (`r_max`); radius indices are `0..r_max`.
    pub radius_samples: u32,
    /// Number of angle samples (`l`); sample `j` sits at `2π(j + 1) / l`.
    pub angular_samples: u32,
}

impl PolarGeometry {
    pub fn new(center_x: i32, center_y: i32, radius_samples: u32, angular_samples: u32) -> Self {
        Self {
            center_x,
            center_y,
            radius_samples: radius_samples.max(1),
            angular_samples: angular_samples.max(1),
        }
    }

    /// Default centre of a `width` x `height` image.
    pub fn default_center(width: u32, height: u32) -> (i32, i32) {
        ((width / 2) as i32, (height / 2) as i32)
    }

    /// `radius_samples * angular_samples`, or `None` on overflow.
    pub fn sample_count(&self) -> Option<usize> {
        (self.radius_samples as usize).checked_mul(self.angular_samples as usize)
    }

    fn too_large(&self) -> BlurError {
        BlurError::PolarGridTooLarge {
            center_x: self.center_x,
            center_y: self.center_y,
            max: MAX_POLAR_SAMPLES,
        }
    }

    /// Geometry whose rings reach every corner of the image, with about one
    /// angular sample per pixel of arc on the outermost ring.
    ///
    /// # Errors
    /// `PolarGridTooLarge` when the grid would exceed [`MAX_POLAR_SAMPLES`].
    pub fn covering(width: u32, height: u32, center: Option<(i32, i32)>) -> Result<Self> {
        let (cx, cy) = center.unwrap_or_else(|| Self::default_center(width, height));
        let corners = [
            (0i64, 0i64),
            (width as i64 - 1, 0),
            (0, height as i64 - 1),
            (width as i64 - 1, height as i64 - 1),
        ];
        let farthest = corners
            .iter()
            .map(|&(x, y)| {
                let dx = (x - cx as i64) as f64;
                let dy = (y - cy as i64) as f64;
                dx.hypot(dy)
            })
            .fold(0.0f64, f64::max);
        let radius_samples = farthest.ceil() + 1.0;
        let angular_samples = (TAU * radius_samples).ceil();
        if radius_samples * angular_samples > MAX_POLAR_SAMPLES as f64 {
            return Err(BlurError::PolarGridTooLarge {
                center_x: cx,
                center_y: cy,
                max: MAX_POLAR_SAMPLES,
            });
        }
        Ok(Self::new(cx, cy, radius_samples as u32, angular_samples as u32))
    }
}

/// An image resampled onto a `radius_samples x angular_samples` grid.
///
/// The grid is stored as a `PixelBuffer` of width `angular_samples` and
/// height `radius_samples`, so the regular kernels and executor run on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolarBuffer {
    geometry: PolarGeometry,
    grid: PixelBuffer,
}

impl PolarBuffer {
    pub fn geometry(&self) -> &PolarGeometry {
        &self.geometry
    }

    pub fn grid(&self) -> &PixelBuffer {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut PixelBuffer {
        &mut self.grid
    }

    /// Sample at radius index `i`, angle index `j`.
    pub fn sample(&self, i: u32, j: u32) -> Option<u32> {
        self.grid.get(j, i)
    }
}

/// Resample `src` onto the polar grid described by `geometry`.
///
/// Sample `(i, j)` takes the pixel nearest to
/// `(cx + i·cosθ, cy − i·sinθ)` with `θ = 2π(j + 1)/l`, or
/// [`POLAR_SENTINEL`] when that point lies outside the image.
///
/// # Errors
/// `PolarGridTooLarge` when `geometry` exceeds [`MAX_POLAR_SAMPLES`].
pub fn to_polar(src: &PixelBuffer, geometry: PolarGeometry) -> Result<PolarBuffer> {
    let samples = geometry
        .sample_count()
        .filter(|&n| n <= MAX_POLAR_SAMPLES)
        .ok_or_else(|| geometry.too_large())?;
    let (width, height) = (src.width() as i64, src.height() as i64);
    let r_max = geometry.radius_samples as usize;
    let l = geometry.angular_samples as usize;
    let (cx, cy) = (geometry.center_x as i64, geometry.center_y as i64);

    let mut pixels = vec![POLAR_SENTINEL; samples];
    for j in 0..l {
        let theta = TAU * (j + 1) as f64 / l as f64;
        let (sin, cos) = theta.sin_cos();
        for i in 0..r_max {
            let x = cx + (i as f64 * cos).round() as i64;
            let y = cy - (i as f64 * sin).round() as i64;
            if (0..width).contains(&x) && (0..height).contains(&y) {
                pixels[i * l + j] = src.pixels()[(y * width + x) as usize];
            }
        }
    }

    let grid = PixelBuffer::new(geometry.angular_samples, geometry.radius_samples, pixels)?;
    Ok(PolarBuffer { geometry, grid })
}

/// Map a polar buffer back onto a `width` x `height` image.
///
/// Each pixel takes the polar sample at its rounded distance from the centre
/// and the angle index `floor(θ·l/2π) − 1` (wrapped into `0..l`), where
/// `θ = atan2(cy − y, x − cx)` in `[0, 2π)`. Pixels at or beyond
/// `radius_samples` get [`POLAR_SENTINEL`].
pub fn to_cartesian(polar: &PolarBuffer, width: u32, height: u32) -> Result<PixelBuffer> {
    let geometry = polar.geometry;
    let r_max = geometry.radius_samples as i64;
    let l = geometry.angular_samples as i64;
    let (cx, cy) = (geometry.center_x as i64, geometry.center_y as i64);
    let samples = polar.grid.pixels();

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let theta = if x == cx {
                if y <= cy {
                    PI / 2.0
                } else {
                    3.0 * PI / 2.0
                }
            } else {
                let t = ((cy - y) as f64).atan2((x - cx) as f64);
                if t < 0.0 {
                    t + TAU
                } else {
                    t
                }
            };
            let j = ((theta * l as f64 / TAU).floor() as i64 - 1).rem_euclid(l);
            let i = (((x - cx) as f64).hypot((y - cy) as f64)).round() as i64;

            let px = if i < r_max {
                samples[(i * l + j) as usize]
            } else {
                POLAR_SENTINEL
            };
            pixels.push(px);
        }
    }
    PixelBuffer::new(width, height, pixels)
}
