//! WebAssembly exports for the blur engine.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. They take and
//! return flat RGBA byte arrays (length = width * height * 4) and run on a
//! single-threaded executor.

use wasm_bindgen::prelude::*;

use crate::config::BlurConfig;
use crate::error::Result;
use crate::executor::BlurExecutor;
use crate::filters::blur::{blur_in_place, BlurVariant};
use crate::filters::core::PixelBuffer;

fn run(data: &[u8], width: usize, height: usize, radius: f32, variant: BlurVariant) -> Result<Vec<u8>> {
    let executor = BlurExecutor::from_config(&BlurConfig::single_threaded())?;
    let mut buffer = PixelBuffer::from_rgba_bytes(data, width, height)?;
    blur_in_place(&executor, &mut buffer, radius, variant)?;
    Ok(buffer.to_rgba_bytes())
}

fn to_js(result: Result<Vec<u8>>) -> std::result::Result<Vec<u8>, JsValue> {
    result.map_err(|err| JsValue::from_str(&err.to_string()))
}

// ============================================================================
// Stack blur
// ============================================================================

/// Stack blur an RGBA u8 image.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `radius` - Blur radius, truncated to an integer in 0-254
///
/// # Returns
/// Flat array of blurred RGBA bytes
#[wasm_bindgen]
pub fn stack_blur_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    radius: f32,
) -> std::result::Result<Vec<u8>, JsValue> {
    to_js(run(data, width, height, radius, BlurVariant::StackBlur))
}

// ============================================================================
// Gaussian blur
// ============================================================================

/// Gaussian blur (three box passes) of an RGBA u8 image.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `sigma` - Standard deviation in pixels
#[wasm_bindgen]
pub fn gaussian_blur_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    sigma: f32,
) -> std::result::Result<Vec<u8>, JsValue> {
    to_js(run(data, width, height, sigma, BlurVariant::Gaussian))
}

// ============================================================================
// Polar blurs
// ============================================================================

/// Zoom blur of an RGBA u8 image around `(center_x, center_y)`.
#[wasm_bindgen]
pub fn radial_blur_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    sigma: f32,
    center_x: i32,
    center_y: i32,
) -> std::result::Result<Vec<u8>, JsValue> {
    let center = Some((center_x, center_y));
    to_js(run(data, width, height, sigma, BlurVariant::Radial { center }))
}

/// Spin blur of an RGBA u8 image around `(center_x, center_y)`.
#[wasm_bindgen]
pub fn circular_blur_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    sigma: f32,
    center_x: i32,
    center_y: i32,
) -> std::result::Result<Vec<u8>, JsValue> {
    let center = Some((center_x, center_y));
    to_js(run(data, width, height, sigma, BlurVariant::Circular { center }))
}
