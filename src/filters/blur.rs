//! Blur entry points and the pass orchestrator.
//!
//! `BlurProcess` turns a [`BlurVariant`] and a radius into a sequence of
//! executor passes. Every pass reads the image as the previous pass left it
//! and replaces it only once all of its slices are done, so on error the
//! image holds the output of the last completed pass.

use crate::error::{BlurError, Result};
use crate::executor::{BlurExecutor, CancelToken, LineKernel, PassKind};
use crate::filters::box_blur::BoxKernel;
use crate::filters::core::{PixelBuffer, ALPHA_MASK, RGB_MASK};
use crate::filters::gaussian::gaussian_schedule;
use crate::filters::mul_table::MAX_STACK_RADIUS;
use crate::filters::polar::{to_cartesian, to_polar, PolarGeometry};
use crate::filters::stack_blur::StackKernel;

/// Which blur to run.
///
/// Stack-blur variants (`StackBlur`, `HorizontalOnly`, `VerticalOnly`) take an
/// integer radius up to 254. The others treat the radius as a Gaussian sigma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurVariant {
    /// Stack blur, horizontal then vertical.
    StackBlur,
    /// Three chained box blurs approximating a Gaussian.
    Gaussian,
    /// Stack blur along rows only.
    HorizontalOnly,
    /// Stack blur along columns only.
    VerticalOnly,
    /// Gaussian along the radius around `center` (zoom blur).
    /// `None` means the image centre.
    Radial { center: Option<(i32, i32)> },
    /// Gaussian along the angle around `center` (spin blur).
    Circular { center: Option<(i32, i32)> },
}

impl BlurVariant {
    /// Same variant with an explicit polar centre. Non-polar variants are
    /// returned unchanged.
    pub fn with_center(self, center_x: i32, center_y: i32) -> Self {
        let center = Some((center_x, center_y));
        match self {
            BlurVariant::Radial { .. } => BlurVariant::Radial { center },
            BlurVariant::Circular { .. } => BlurVariant::Circular { center },
            other => other,
        }
    }

    fn uses_stack_table(&self) -> bool {
        matches!(
            self,
            BlurVariant::StackBlur | BlurVariant::HorizontalOnly | BlurVariant::VerticalOnly
        )
    }
}

/// Where a [`BlurProcess`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurState {
    Idle,
    HorizontalRunning,
    VerticalRunning,
    Done,
}

impl From<PassKind> for BlurState {
    fn from(kind: PassKind) -> Self {
        match kind {
            PassKind::Horizontal => BlurState::HorizontalRunning,
            PassKind::Vertical => BlurState::VerticalRunning,
        }
    }
}

/// Reject radii no variant accepts.
fn check_radius(radius: f32) -> Result<()> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(BlurError::RadiusOutOfRange {
            radius,
            max: MAX_STACK_RADIUS,
        });
    }
    Ok(())
}

/// Stack kernel for the truncated `radius`.
fn stack_kernel(radius: f32) -> Result<StackKernel> {
    let r = radius.trunc();
    if r > MAX_STACK_RADIUS as f32 {
        return Err(BlurError::RadiusOutOfRange {
            radius,
            max: MAX_STACK_RADIUS,
        });
    }
    StackKernel::new(r as usize)
}

/// One blur run: variant, executor, and the state machine
/// `Idle -> HorizontalRunning / VerticalRunning -> Done`.
#[derive(Debug)]
pub struct BlurProcess<'a> {
    executor: &'a BlurExecutor,
    variant: BlurVariant,
    cancel: Option<CancelToken>,
    state: BlurState,
    visited: Vec<BlurState>,
}

impl<'a> BlurProcess<'a> {
    pub fn new(executor: &'a BlurExecutor, variant: BlurVariant) -> Self {
        Self {
            executor,
            variant,
            cancel: None,
            state: BlurState::Idle,
            visited: Vec::new(),
        }
    }

    /// Stop between slices once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn variant(&self) -> BlurVariant {
        self.variant
    }

    /// Current state. After a failed run this is the state the failure
    /// happened in.
    pub fn state(&self) -> BlurState {
        self.state
    }

    /// Running states entered so far, without repeats of consecutive entries.
    pub fn visited(&self) -> &[BlurState] {
        &self.visited
    }

    /// Blur `image` in place.
    ///
    /// # Errors
    /// - `RadiusOutOfRange` before any work starts.
    /// - `Interrupted` if a slice was cancelled or failed; `image` then holds
    ///   the result of the last completed pass.
    pub fn run(&mut self, image: &mut PixelBuffer, radius: f32) -> Result<()> {
        check_radius(radius)?;
        let identity = if self.variant.uses_stack_table() {
            radius.trunc() == 0.0
        } else {
            radius == 0.0
        };
        log::debug!(
            "{:?} blur of {}x{} image, radius {radius}",
            self.variant,
            image.width(),
            image.height()
        );

        if !identity {
            match self.variant {
                BlurVariant::StackBlur => {
                    let kernel = stack_kernel(radius)?;
                    self.pass(image, PassKind::Horizontal, &kernel)?;
                    self.pass(image, PassKind::Vertical, &kernel)?;
                }
                BlurVariant::HorizontalOnly => {
                    let kernel = stack_kernel(radius)?;
                    self.pass(image, PassKind::Horizontal, &kernel)?;
                }
                BlurVariant::VerticalOnly => {
                    let kernel = stack_kernel(radius)?;
                    self.pass(image, PassKind::Vertical, &kernel)?;
                }
                BlurVariant::Gaussian => {
                    self.gaussian(image, radius, &[PassKind::Horizontal, PassKind::Vertical])?;
                }
                BlurVariant::Radial { center } => {
                    self.polar(image, radius, center, PassKind::Vertical)?;
                }
                BlurVariant::Circular { center } => {
                    self.polar(image, radius, center, PassKind::Horizontal)?;
                }
            }
        }

        self.transition(BlurState::Done);
        Ok(())
    }

    fn transition(&mut self, next: BlurState) {
        if self.state != next {
            log::trace!("blur state {:?} -> {:?}", self.state, next);
            self.state = next;
            if next != BlurState::Done && self.visited.last() != Some(&next) {
                self.visited.push(next);
            }
        }
    }

    fn pass<K: LineKernel + ?Sized>(
        &mut self,
        image: &mut PixelBuffer,
        kind: PassKind,
        kernel: &K,
    ) -> Result<()> {
        self.transition(kind.into());
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            log::warn!("{kind} pass cancelled before it started");
            return Err(BlurError::Interrupted {
                pass: kind,
                reason: "cancelled".to_owned(),
            });
        }
        let pixels = self
            .executor
            .run_pass(image, kind, kernel, self.cancel.as_ref())?;
        image.replace_pixels(pixels);
        Ok(())
    }

    fn gaussian(&mut self, image: &mut PixelBuffer, sigma: f32, axes: &[PassKind]) -> Result<()> {
        self.run_schedule(image, gaussian_schedule(sigma, axes))
    }

    fn run_schedule(&mut self, image: &mut PixelBuffer, schedule: Vec<(PassKind, BoxKernel)>) -> Result<()> {
        for (kind, kernel) in schedule {
            self.pass(image, kind, &kernel)?;
        }
        Ok(())
    }

    /// Resample to polar, blur one axis of the polar grid, resample back.
    /// The original alpha of every pixel is restored afterwards. A sigma too
    /// small to produce any box pass leaves the image untouched.
    fn polar(
        &mut self,
        image: &mut PixelBuffer,
        sigma: f32,
        center: Option<(i32, i32)>,
        axis: PassKind,
    ) -> Result<()> {
        let schedule = gaussian_schedule(sigma, &[axis]);
        if schedule.is_empty() {
            log::debug!("sigma {sigma} needs no box pass, skipping polar remap");
            return Ok(());
        }

        let geometry = PolarGeometry::covering(image.width(), image.height(), center)?;
        log::debug!(
            "polar grid {}x{} around ({}, {})",
            geometry.radius_samples,
            geometry.angular_samples,
            geometry.center_x,
            geometry.center_y
        );

        let mut polar = to_polar(image, geometry)?;
        self.run_schedule(polar.grid_mut(), schedule)?;
        let blurred = to_cartesian(&polar, image.width(), image.height())?;

        let pixels = image
            .pixels()
            .iter()
            .zip(blurred.pixels())
            .map(|(&orig, &px)| (orig & ALPHA_MASK) | (px & RGB_MASK))
            .collect();
        image.replace_pixels(pixels);
        Ok(())
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Blur `image` in place with `variant`.
pub fn blur_in_place(
    executor: &BlurExecutor,
    image: &mut PixelBuffer,
    radius: f32,
    variant: BlurVariant,
) -> Result<()> {
    BlurProcess::new(executor, variant).run(image, radius)
}

/// Blurred copy of `image`, same dimensions.
pub fn blur(
    executor: &BlurExecutor,
    image: &PixelBuffer,
    radius: f32,
    variant: BlurVariant,
) -> Result<PixelBuffer> {
    let mut out = image.clone();
    blur_in_place(executor, &mut out, radius, variant)?;
    Ok(out)
}

/// Like [`blur`], with an explicit centre for `Radial` and `Circular`.
pub fn blur_with_center(
    executor: &BlurExecutor,
    image: &PixelBuffer,
    radius: f32,
    variant: BlurVariant,
    center_x: i32,
    center_y: i32,
) -> Result<PixelBuffer> {
    blur(executor, image, radius, variant.with_center(center_x, center_y))
}

// ============================================================================
// Backends
// ============================================================================

/// Something that can run the blur contract: same dimensions out, alpha
/// untouched, radius 0 is identity.
///
/// The CPU engine below is the in-tree implementation; an accelerated
/// backend can be swapped in behind the same trait.
pub trait BlurBackend: Send + Sync {
    fn name(&self) -> &str;

    fn blur_in_place(&self, image: &mut PixelBuffer, radius: f32, variant: &BlurVariant) -> Result<()>;
}

/// Multi-threaded CPU backend.
#[derive(Debug)]
pub struct CpuBackend {
    executor: BlurExecutor,
}

impl CpuBackend {
    pub fn new(executor: BlurExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &BlurExecutor {
        &self.executor
    }
}

impl BlurBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn blur_in_place(&self, image: &mut PixelBuffer, radius: f32, variant: &BlurVariant) -> Result<()> {
        blur_in_place(&self.executor, image, radius, *variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::gaussian::gaussian_blur;

    const RED: u32 = 0xFFFF_0000;

    const ALL_VARIANTS: [BlurVariant; 6] = [
        BlurVariant::StackBlur,
        BlurVariant::Gaussian,
        BlurVariant::HorizontalOnly,
        BlurVariant::VerticalOnly,
        BlurVariant::Radial { center: None },
        BlurVariant::Circular { center: None },
    ];

    fn noise(width: u32, height: u32, seed: u32) -> PixelBuffer {
        let mut state = seed;
        let pixels = (0..width * height)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                state
            })
            .collect();
        PixelBuffer::new(width, height, pixels).unwrap()
    }

    fn executor(workers: usize) -> BlurExecutor {
        BlurExecutor::new(workers).unwrap()
    }

    #[test]
    fn test_radius_zero_is_identity_for_every_variant() {
        let img = noise(9, 7, 1);
        let exec = executor(2);
        for variant in ALL_VARIANTS {
            assert_eq!(blur(&exec, &img, 0.0, variant).unwrap(), img, "{variant:?}");
        }
        // Integer variants truncate: 0.7 is radius 0.
        assert_eq!(blur(&exec, &img, 0.7, BlurVariant::StackBlur).unwrap(), img);
    }

    #[test]
    fn test_dimensions_and_alpha_preserved() {
        let img = noise(13, 8, 2);
        let exec = executor(3);
        for variant in ALL_VARIANTS {
            let out = blur(&exec, &img, 3.0, variant).unwrap();
            assert_eq!(out.width(), img.width());
            assert_eq!(out.height(), img.height());
            for (a, b) in img.pixels().iter().zip(out.pixels()) {
                assert_eq!(a & ALPHA_MASK, b & ALPHA_MASK, "{variant:?}");
            }
        }
    }

    #[test]
    fn test_deterministic_across_worker_counts() {
        let img = noise(17, 11, 3);
        for variant in ALL_VARIANTS {
            let reference = blur(&executor(1), &img, 4.0, variant).unwrap();
            for workers in [2, 8] {
                let out = blur(&executor(workers), &img, 4.0, variant).unwrap();
                assert_eq!(out, reference, "{variant:?} with {workers} workers");
            }
        }
    }

    #[test]
    fn test_parallel_gaussian_matches_sequential() {
        let img = noise(15, 9, 9);
        let out = blur(&executor(4), &img, 2.5, BlurVariant::Gaussian).unwrap();
        assert_eq!(out.pixels(), gaussian_blur(img.pixels(), 15, 9, 2.5).as_slice());
    }

    #[test]
    fn test_huge_sigma_keeps_uniform_image() {
        let img = PixelBuffer::filled(4, 4, 0xFF33_6699).unwrap();
        for workers in [1, 3] {
            let exec = executor(workers);
            for sigma in [1.0e6, 1.0e30, f32::MAX] {
                let out = blur(&exec, &img, sigma, BlurVariant::Gaussian).unwrap();
                assert_eq!(out, img, "sigma {sigma}");
            }
        }
    }

    #[test]
    fn test_distant_polar_center_is_an_error() {
        let img = PixelBuffer::filled(4, 4, RED).unwrap();
        let exec = executor(2);
        for variant in [
            BlurVariant::Radial { center: None },
            BlurVariant::Circular { center: None },
        ] {
            let err = blur_with_center(&exec, &img, 2.0, variant, i32::MAX, 0).unwrap_err();
            assert!(matches!(err, BlurError::PolarGridTooLarge { .. }), "{variant:?}");
        }
        // Near but outside the image is still a valid centre.
        assert!(blur_with_center(&exec, &img, 2.0, BlurVariant::Radial { center: None }, -5, 9).is_ok());
    }

    #[test]
    fn test_small_sigma_without_passes_is_identity() {
        let img = noise(8, 8, 10);
        let exec = executor(2);
        for variant in [
            BlurVariant::Gaussian,
            BlurVariant::Radial { center: None },
            BlurVariant::Circular { center: None },
        ] {
            let mut out = img.clone();
            let mut process = BlurProcess::new(&exec, variant);
            process.run(&mut out, 0.5).unwrap();
            assert_eq!(out, img, "{variant:?}");
            assert!(process.visited().is_empty());
            assert_eq!(process.state(), BlurState::Done);
        }
    }

    #[test]
    fn test_solid_red_stack_blur_is_fixed_point() {
        let img = PixelBuffer::filled(4, 4, RED).unwrap();
        let out = blur(&executor(2), &img, 2.0, BlurVariant::StackBlur).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_uniform_single_line_stays_uniform() {
        let exec = executor(2);
        let column = PixelBuffer::filled(1, 9, 0xFF33_6699).unwrap();
        let row = PixelBuffer::filled(9, 1, 0xFF33_6699).unwrap();
        for radius in [1.0, 5.0, 40.0, 254.0] {
            for variant in [BlurVariant::StackBlur, BlurVariant::Gaussian] {
                assert_eq!(blur(&exec, &column, radius, variant).unwrap(), column);
                assert_eq!(blur(&exec, &row, radius, variant).unwrap(), row);
            }
        }
    }

    #[test]
    fn test_horizontal_only_leaves_columns_independent() {
        // Rows are uniform, so a horizontal blur changes nothing.
        let pixels = (0..5u32).flat_map(|y| [0xFF00_0000 | y * 40; 6]).collect();
        let img = PixelBuffer::new(6, 5, pixels).unwrap();
        let out = blur(&executor(2), &img, 3.0, BlurVariant::HorizontalOnly).unwrap();
        assert_eq!(out, img);
        let out = blur(&executor(2), &img, 3.0, BlurVariant::VerticalOnly).unwrap();
        assert_ne!(out, img);
    }

    #[test]
    fn test_stack_blur_is_horizontal_then_vertical() {
        let img = noise(10, 6, 4);
        let exec = executor(2);
        let h = blur(&exec, &img, 2.0, BlurVariant::HorizontalOnly).unwrap();
        let hv = blur(&exec, &h, 2.0, BlurVariant::VerticalOnly).unwrap();
        assert_eq!(blur(&exec, &img, 2.0, BlurVariant::StackBlur).unwrap(), hv);
    }

    #[test]
    fn test_radius_out_of_range() {
        let img = noise(4, 4, 5);
        let exec = executor(1);
        let err = blur(&exec, &img, 255.0, BlurVariant::StackBlur).unwrap_err();
        assert!(matches!(err, BlurError::RadiusOutOfRange { max: 254, .. }));
        let err = blur(&exec, &img, 255.5, BlurVariant::HorizontalOnly).unwrap_err();
        assert!(matches!(err, BlurError::RadiusOutOfRange { radius, .. } if radius == 255.5));
        assert!(blur(&exec, &img, 254.9, BlurVariant::VerticalOnly).is_ok());
        assert!(blur(&exec, &img, -1.0, BlurVariant::Gaussian).is_err());
        assert!(blur(&exec, &img, f32::NAN, BlurVariant::Radial { center: None }).is_err());
        // Sigma variants have no table bound.
        assert!(blur(&exec, &img, 300.0, BlurVariant::Gaussian).is_ok());
    }

    #[test]
    fn test_states_visited_per_variant() {
        let exec = executor(2);
        let cases = [
            (BlurVariant::StackBlur, vec![BlurState::HorizontalRunning, BlurState::VerticalRunning]),
            (BlurVariant::HorizontalOnly, vec![BlurState::HorizontalRunning]),
            (BlurVariant::VerticalOnly, vec![BlurState::VerticalRunning]),
            (BlurVariant::Radial { center: None }, vec![BlurState::VerticalRunning]),
            (BlurVariant::Circular { center: None }, vec![BlurState::HorizontalRunning]),
        ];
        for (variant, expected) in cases {
            let mut img = noise(8, 8, 6);
            let mut process = BlurProcess::new(&exec, variant);
            assert_eq!(process.state(), BlurState::Idle);
            process.run(&mut img, 3.0).unwrap();
            assert_eq!(process.state(), BlurState::Done);
            assert_eq!(process.visited(), expected.as_slice(), "{variant:?}");
        }

        // Gaussian alternates six times.
        let mut img = noise(8, 8, 6);
        let mut process = BlurProcess::new(&exec, BlurVariant::Gaussian);
        process.run(&mut img, 5.0).unwrap();
        assert_eq!(process.visited().len(), 6);
    }

    #[test]
    fn test_cancelled_run_leaves_image_untouched() {
        let original = noise(8, 8, 7);
        let mut img = original.clone();
        let token = CancelToken::new();
        token.cancel();
        let exec = executor(2);
        let mut process = BlurProcess::new(&exec, BlurVariant::StackBlur).with_cancel_token(token);
        let err = process.run(&mut img, 2.0).unwrap_err();
        assert!(matches!(
            err,
            BlurError::Interrupted { pass: PassKind::Horizontal, .. }
        ));
        assert_eq!(process.state(), BlurState::HorizontalRunning);
        assert_eq!(img, original);
    }

    #[test]
    fn test_radial_and_circular_keep_center_of_uniform_image() {
        let img = PixelBuffer::filled(41, 41, RED).unwrap();
        let exec = executor(4);
        for variant in [
            BlurVariant::Radial { center: None },
            BlurVariant::Circular { center: None },
        ] {
            let out = blur(&exec, &img, 2.0, variant).unwrap();
            assert_eq!(out.get(20, 20), Some(RED), "{variant:?}");
            assert_eq!(out.get(23, 20), Some(RED), "{variant:?}");
        }
    }

    #[test]
    fn test_explicit_center_changes_result() {
        let img = noise(12, 12, 8);
        let exec = executor(2);
        let centred = blur(&exec, &img, 2.0, BlurVariant::Circular { center: None }).unwrap();
        let corner =
            blur_with_center(&exec, &img, 2.0, BlurVariant::Circular { center: None }, 0, 0).unwrap();
        assert_ne!(centred, corner);
        assert_eq!(
            BlurVariant::Radial { center: None }.with_center(3, 4),
            BlurVariant::Radial { center: Some((3, 4)) }
        );
        assert_eq!(BlurVariant::Gaussian.with_center(3, 4), BlurVariant::Gaussian);
    }

    #[test]
    fn test_cpu_backend() {
        let backend = CpuBackend::new(executor(2));
        assert_eq!(backend.name(), "cpu");
        let mut img = PixelBuffer::filled(5, 5, RED).unwrap();
        backend
            .blur_in_place(&mut img, 2.0, &BlurVariant::Gaussian)
            .unwrap();
        assert_eq!(img, PixelBuffer::filled(5, 5, RED).unwrap());
    }
}
