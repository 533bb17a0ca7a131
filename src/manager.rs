//! Holds a source image and the most recent blur of it.

use crate::error::Result;
use crate::filters::blur::{BlurBackend, BlurVariant, CpuBackend};
use crate::filters::core::PixelBuffer;

/// Source image plus the result of the last successful blur.
///
/// Every `process*` call blurs the original image, never a previous result,
/// so switching variants or radii does not accumulate. A failed call keeps
/// the previous result.
#[derive(Debug)]
pub struct BlurManager<B: BlurBackend = CpuBackend> {
    image: PixelBuffer,
    result: Option<PixelBuffer>,
    backend: B,
}

impl<B: BlurBackend> BlurManager<B> {
    pub fn new(image: PixelBuffer, backend: B) -> Self {
        Self {
            image,
            result: None,
            backend,
        }
    }

    /// Replace the source image. Drops the previous result.
    pub fn set_image(&mut self, image: PixelBuffer) {
        self.image = image;
        self.result = None;
    }

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    /// Result of the last successful `process*` call.
    pub fn result(&self) -> Option<&PixelBuffer> {
        self.result.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stack blur, horizontal then vertical.
    pub fn process(&mut self, radius: f32) -> Result<&PixelBuffer> {
        self.run(radius, BlurVariant::StackBlur)
    }

    /// Gaussian blur with standard deviation `sigma`.
    pub fn process_gaussian(&mut self, sigma: f32) -> Result<&PixelBuffer> {
        self.run(sigma, BlurVariant::Gaussian)
    }

    pub fn process_horizontal(&mut self, radius: f32) -> Result<&PixelBuffer> {
        self.run(radius, BlurVariant::HorizontalOnly)
    }

    pub fn process_vertical(&mut self, radius: f32) -> Result<&PixelBuffer> {
        self.run(radius, BlurVariant::VerticalOnly)
    }

    /// Zoom blur around `center` (image centre when `None`).
    pub fn process_radial(&mut self, sigma: f32, center: Option<(i32, i32)>) -> Result<&PixelBuffer> {
        self.run(sigma, BlurVariant::Radial { center })
    }

    /// Spin blur around `center` (image centre when `None`).
    pub fn process_circular(&mut self, sigma: f32, center: Option<(i32, i32)>) -> Result<&PixelBuffer> {
        self.run(sigma, BlurVariant::Circular { center })
    }

    fn run(&mut self, radius: f32, variant: BlurVariant) -> Result<&PixelBuffer> {
        let mut out = self.image.clone();
        self.backend.blur_in_place(&mut out, radius, &variant)?;
        log::debug!("{} backend finished {variant:?}", self.backend.name());
        Ok(self.result.insert(out))
    }
}
