//! Sliding-window box blur.
//!
//! Each output pixel is the truncated mean of the `2r + 1` pixels centred on
//! it. Samples past either end of a line repeat the edge pixel. The window
//! sum is updated in O(1) per pixel: add the incoming sample, drop the
//! outgoing one.
//!
//! Radii are capped at [`MAX_BOX_RADIUS`], far past any real line length, so
//! the window arithmetic cannot overflow.

use crate::executor::{sweep_columns, sweep_rows, LineKernel, Slice};
use crate::filters::core::{rgb_channels, with_rgb};

/// Largest radius a box window is evaluated with. Larger radii are capped.
pub const MAX_BOX_RADIUS: usize = 1 << 24;

/// Box kernel of a fixed radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxKernel {
    pub radius: usize,
}

impl BoxKernel {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }
}

impl LineKernel for BoxKernel {
    fn blur_line(&self, src: &[u32], out: &mut [u32]) {
        box_blur_line(src, self.radius, out);
    }
}

/// Box-blur one line. Alpha is copied from `src` at each position.
pub fn box_blur_line(src: &[u32], radius: usize, out: &mut [u32]) {
    let radius = radius.min(MAX_BOX_RADIUS);
    let n = src.len();
    if n == 0 {
        return;
    }
    if radius == 0 {
        out.copy_from_slice(src);
        return;
    }

    let last = n - 1;
    let at = |i: isize| src[i.clamp(0, last as isize) as usize];
    let window = (2 * radius + 1) as u64;
    let r = radius as isize;

    // Left half (and centre) all see the first pixel.
    let mut sums = rgb_channels(src[0]).map(|c| c * (radius as u64 + 1));
    // Right half: real pixels up to the line end, then the last one repeated.
    let inside = radius.min(last);
    for &px in &src[1..=inside] {
        add(&mut sums, px);
    }
    let repeated = (radius - inside) as u64;
    for (sum, c) in sums.iter_mut().zip(rgb_channels(src[last])) {
        *sum += c * repeated;
    }

    for (x, out_px) in out.iter_mut().enumerate() {
        *out_px = with_rgb(src[x], sums.map(|s| s / window));
        let x = x as isize;
        add(&mut sums, at(x + r + 1));
        sub(&mut sums, at(x - r));
    }
}

#[inline]
fn add(sums: &mut [u64; 3], pixel: u32) {
    for (sum, c) in sums.iter_mut().zip(rgb_channels(pixel)) {
        *sum += c;
    }
}

#[inline]
fn sub(sums: &mut [u64; 3], pixel: u32) {
    for (sum, c) in sums.iter_mut().zip(rgb_channels(pixel)) {
        *sum -= c;
    }
}

/// Box-blur the rows in `rows`; `out` holds those rows back to back.
pub fn box_blur_horizontal(src: &[u32], width: usize, radius: usize, rows: Slice, out: &mut [u32]) {
    sweep_rows(&BoxKernel::new(radius), src, width, rows, out);
}

/// Box-blur the columns in `columns`; `out` holds those columns back to back.
pub fn box_blur_vertical(
    src: &[u32],
    width: usize,
    height: usize,
    radius: usize,
    columns: Slice,
    out: &mut [u32],
) {
    sweep_columns(&BoxKernel::new(radius), src, width, height, columns, out);
}
