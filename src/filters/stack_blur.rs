//! Stack blur (Mario Klingemann's moving-stack approximation of a Gaussian).
//!
//! A window of `2r + 1` pixels is weighted `1, 2, .., r + 1, .., 2, 1`. The
//! weighted sum is kept incrementally with two running totals: `sum_in`
//! (pixels on the incoming side of the peak) and `sum_out` (pixels on the
//! outgoing side). Each step subtracts `sum_out`, pushes one pixel into the
//! ring buffer, adds `sum_in`, then moves the peak one slot, so every pixel
//! costs O(1) regardless of the radius. Division by the total weight
//! `(r + 1)^2` is replaced by the multiply/shift pair from
//! [`mul_table`](super::mul_table).
//!
//! Samples past either end of a line repeat the edge pixel.

use crate::error::{BlurError, Result};
use crate::executor::{sweep_columns, sweep_rows, LineKernel, Slice};
use crate::filters::core::{rgb_channels, with_rgb};
use crate::filters::mul_table::{mul_shr, MAX_STACK_RADIUS};

/// Stack-blur kernel for one radius, with its fixed-point divisor resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackKernel {
    radius: usize,
    mul: u64,
    shr: u32,
}

impl StackKernel {
    /// # Errors
    /// `RadiusOutOfRange` when `radius > MAX_STACK_RADIUS`.
    pub fn new(radius: usize) -> Result<Self> {
        let (mul, shr) = mul_shr(radius).ok_or(BlurError::RadiusOutOfRange {
            radius: radius as f32,
            max: MAX_STACK_RADIUS,
        })?;
        Ok(Self { radius, mul, shr })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    #[inline]
    fn scale(&self, sums: [u64; 3]) -> [u64; 3] {
        sums.map(|s| (s * self.mul) >> self.shr)
    }
}

impl LineKernel for StackKernel {
    fn blur_line(&self, src: &[u32], out: &mut [u32]) {
        let n = src.len();
        if n == 0 {
            return;
        }
        let radius = self.radius;
        if radius == 0 {
            out.copy_from_slice(src);
            return;
        }

        let last = n - 1;
        let div = 2 * radius + 1;
        let mut stack = vec![0u32; div];

        let mut sum = [0u64; 3];
        let mut sum_in = [0u64; 3];
        let mut sum_out = [0u64; 3];

        // Left half of the stack, peak included: the first pixel repeated.
        let first = src[0];
        let first_rgb = rgb_channels(first);
        for (i, slot) in stack.iter_mut().take(radius + 1).enumerate() {
            *slot = first;
            for c in 0..3 {
                sum[c] += first_rgb[c] * (i as u64 + 1);
                sum_out[c] += first_rgb[c];
            }
        }
        // Right half: the next `radius` pixels, clamped at the line end.
        for i in 1..=radius {
            let px = src[i.min(last)];
            stack[i + radius] = px;
            let rgb = rgb_channels(px);
            for c in 0..3 {
                sum[c] += rgb[c] * (radius + 1 - i) as u64;
                sum_in[c] += rgb[c];
            }
        }

        let mut sp = radius;
        let mut xp = radius.min(last);

        for (x, out_px) in out.iter_mut().enumerate() {
            *out_px = with_rgb(src[x], self.scale(sum));

            for c in 0..3 {
                sum[c] -= sum_out[c];
            }

            // The slot leaving the window is reused for the incoming pixel.
            let mut stack_start = sp + div - radius;
            if stack_start >= div {
                stack_start -= div;
            }
            let leaving = rgb_channels(stack[stack_start]);
            for c in 0..3 {
                sum_out[c] -= leaving[c];
            }

            if xp < last {
                xp += 1;
            }
            let incoming = src[xp];
            stack[stack_start] = incoming;
            let incoming = rgb_channels(incoming);
            for c in 0..3 {
                sum_in[c] += incoming[c];
                sum[c] += sum_in[c];
            }

            sp += 1;
            if sp >= div {
                sp = 0;
            }
            let peak = rgb_channels(stack[sp]);
            for c in 0..3 {
                sum_out[c] += peak[c];
                sum_in[c] -= peak[c];
            }
        }
    }
}

/// Stack-blur the rows in `rows`; `out` holds those rows back to back.
pub fn stack_blur_horizontal(
    src: &[u32],
    width: usize,
    kernel: &StackKernel,
    rows: Slice,
    out: &mut [u32],
) {
    sweep_rows(kernel, src, width, rows, out);
}

/// Stack-blur the columns in `columns`; `out` holds those columns back to back.
pub fn stack_blur_vertical(
    src: &[u32],
    width: usize,
    height: usize,
    kernel: &StackKernel,
    columns: Slice,
    out: &mut [u32],
) {
    sweep_columns(kernel, src, width, height, columns, out);
}
