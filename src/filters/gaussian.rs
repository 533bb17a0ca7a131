//! Gaussian blur approximated by three chained box blurs.
//!
//! Based on <http://blog.ivank.net/fastest-gaussian-blur.html>: `n` box
//! filters whose widths are chosen so their combined variance matches
//! `sigma^2`.

use crate::executor::{scatter_columns, PassKind, Slice};
use crate::filters::box_blur::{box_blur_horizontal, box_blur_vertical, BoxKernel, MAX_BOX_RADIUS};

/// Number of box passes used for the Gaussian approximation.
pub const GAUSS_BOXES: usize = 3;

/// Box widths approximating a Gaussian: `small_count` copies of `small`,
/// followed by `n - small_count` copies of `small + 2`.
///
/// `small` is always odd and at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxWidths {
    pub small: usize,
    pub small_count: usize,
    widths: Vec<usize>,
}

impl BoxWidths {
    /// The widths in pass order.
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn large(&self) -> usize {
        self.small + 2
    }

    /// Box radius `(width - 1) / 2` of every pass.
    pub fn radii(&self) -> impl Iterator<Item = usize> + '_ {
        self.widths.iter().map(|w| (w - 1) / 2)
    }

    /// True when every box has width 1, i.e. the blur is a no-op.
    pub fn is_identity(&self) -> bool {
        self.widths.iter().all(|&w| w == 1)
    }
}

/// Compute `n` box widths whose chained variance approximates a Gaussian of
/// standard deviation `sigma`. `sigma <= 0` (or NaN) yields all-ones widths.
///
/// Widths never exceed `2 * MAX_BOX_RADIUS + 1`; very large sigmas saturate
/// there.
pub fn boxes_for_gauss(sigma: f32, n: usize) -> BoxWidths {
    if !(sigma > 0.0) || n == 0 {
        return BoxWidths {
            small: 1,
            small_count: n,
            widths: vec![1; n],
        };
    }

    let sigma = sigma as f64;
    let n_f = n as f64;

    // Ideal averaging filter width, leaving room for the `+ 2` of the wider box.
    let max_small = (2 * MAX_BOX_RADIUS - 1) as f64;
    let w_ideal = (12.0 * sigma * sigma / n_f + 1.0).sqrt().min(max_small);
    let mut wl = w_ideal.floor() as i64;
    if wl % 2 == 0 {
        wl -= 1;
    }
    let wl = wl.max(1);
    let wl_f = wl as f64;

    let m_ideal = (12.0 * sigma * sigma - n_f * wl_f * wl_f - 4.0 * n_f * wl_f - 3.0 * n_f)
        / (-4.0 * wl_f - 4.0);
    let m = (m_ideal.round().max(0.0) as usize).min(n);

    let small = wl as usize;
    let widths = (0..n)
        .map(|i| if i < m { small } else { small + 2 })
        .collect();
    BoxWidths {
        small,
        small_count: m,
        widths,
    }
}

/// The sweeps of a Gaussian blur along `axes`, in execution order.
///
/// For each of the three boxes every axis is swept once, so a full 2-D blur
/// (`[Horizontal, Vertical]`) is six sweeps. Boxes of radius 0 are skipped.
pub fn gaussian_schedule(sigma: f32, axes: &[PassKind]) -> Vec<(PassKind, BoxKernel)> {
    boxes_for_gauss(sigma, GAUSS_BOXES)
        .radii()
        .filter(|&r| r > 0)
        .flat_map(|r| axes.iter().map(move |&axis| (axis, BoxKernel::new(r))))
        .collect()
}

/// Single-threaded Gaussian blur of a `width` x `height` buffer.
///
/// Runs the same six sweeps as the parallel path, ping-ponging between two
/// owned buffers. `sigma <= 0` returns a copy of `src`.
pub fn gaussian_blur(src: &[u32], width: usize, height: usize, sigma: f32) -> Vec<u32> {
    let mut current = src.to_vec();
    let mut next = vec![0u32; current.len()];
    let mut lines = vec![0u32; current.len()];
    let (rows, columns) = (Slice::new(0, height), Slice::new(0, width));

    for (kind, kernel) in gaussian_schedule(sigma, &[PassKind::Horizontal, PassKind::Vertical]) {
        match kind {
            PassKind::Horizontal => {
                box_blur_horizontal(&current, width, kernel.radius, rows, &mut next);
            }
            PassKind::Vertical => {
                box_blur_vertical(&current, width, height, kernel.radius, columns, &mut lines);
                scatter_columns(&lines, width, height, columns, &mut next);
            }
        }
        std::mem::swap(&mut current, &mut next);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_sigma_is_identity() {
        for sigma in [0.0, -3.0, f32::NAN] {
            let boxes = boxes_for_gauss(sigma, 3);
            assert!(boxes.is_identity());
            assert_eq!(boxes.widths(), &[1, 1, 1]);
        }
        assert!(gaussian_schedule(0.0, &[PassKind::Horizontal]).is_empty());
    }

    #[test]
    fn test_widths_invariants() {
        for i in 1..200 {
            let sigma = i as f32 * 0.37;
            let boxes = boxes_for_gauss(sigma, 3);
            assert_eq!(boxes.small % 2, 1, "sigma {sigma}");
            assert!(boxes.small_count <= 3);
            assert_eq!(boxes.widths().len(), 3);
            for (i, &w) in boxes.widths().iter().enumerate() {
                let expected = if i < boxes.small_count { boxes.small } else { boxes.large() };
                assert_eq!(w, expected);
            }
        }
    }

    #[test]
    fn test_variance_close_to_sigma() {
        for sigma in [2.0f32, 5.0, 12.5, 40.0] {
            let boxes = boxes_for_gauss(sigma, 3);
            let variance: f64 = boxes
                .widths()
                .iter()
                .map(|&w| ((w * w) as f64 - 1.0) / 12.0)
                .sum();
            let actual = variance.sqrt();
            assert!((actual - sigma as f64).abs() < 0.6, "sigma {sigma} -> {actual}");
        }
    }

    #[test]
    fn test_huge_sigma_saturates() {
        for sigma in [1.0e7f32, 1.0e30, f32::MAX, f32::INFINITY] {
            let boxes = boxes_for_gauss(sigma, 3);
            assert_eq!(boxes.small % 2, 1, "sigma {sigma}");
            assert!(boxes.radii().all(|r| r <= MAX_BOX_RADIUS), "sigma {sigma}");
        }
        let src = vec![0xFF33_6699; 4 * 4];
        assert_eq!(gaussian_blur(&src, 4, 4, 1.0e30), src);
    }

    #[test]
    fn test_known_widths() {
        // sigma = 5: w_ideal = sqrt(101) ~ 10.05 -> wl = 9, wu = 11, m = round(1.5) = 2.
        let boxes = boxes_for_gauss(5.0, 3);
        assert_eq!(boxes.widths(), &[9, 9, 11]);
        assert_eq!(boxes.radii().collect::<Vec<_>>(), vec![4, 4, 5]);
    }

    #[test]
    fn test_sequential_blur_keeps_uniform_and_alpha() {
        let src = vec![0x80FF_8000; 6 * 4];
        assert_eq!(gaussian_blur(&src, 6, 4, 3.0), src);

        let src: Vec<u32> = (0..20u32).map(|i| (i << 24) | (i * 12_345)).collect();
        let out = gaussian_blur(&src, 5, 4, 1.5);
        assert_eq!(out.len(), src.len());
        for (a, b) in src.iter().zip(&out) {
            assert_eq!(a >> 24, b >> 24);
        }
        assert_eq!(gaussian_blur(&src, 5, 4, 0.0), src);
    }

    #[test]
    fn test_schedule_alternates_axes() {
        let schedule = gaussian_schedule(5.0, &[PassKind::Horizontal, PassKind::Vertical]);
        let kinds: Vec<_> = schedule.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds.len(), 6);
        assert_eq!(kinds[0], PassKind::Horizontal);
        assert_eq!(kinds[1], PassKind::Vertical);
        assert_eq!(schedule[0].1, BoxKernel::new(4));
        assert_eq!(schedule[5].1, BoxKernel::new(5));
    }
}
