//! Error type shared by every blur entry point.

use thiserror::Error;

use crate::executor::PassKind;

/// Errors that can occur while validating or running a blur.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BlurError {
    /// The requested radius is negative, not finite, or larger than the
    /// precomputed stack-blur tables allow.
    #[error("blur radius {radius} is outside the supported range 0..={max}")]
    RadiusOutOfRange { radius: f32, max: u32 },

    /// Width or height is zero, or the pixel count does not match them.
    #[error("invalid image dimensions {width}x{height} for {len} pixels")]
    InvalidDimensions { width: u32, height: u32, len: usize },

    /// An array handed to the RGBA conversion did not have 4 channels.
    #[error("expected 4 channels (RGBA), got {0}")]
    UnsupportedChannels(usize),

    /// The polar grid for this centre would exceed `max` samples.
    #[error("polar grid around ({center_x}, {center_y}) would exceed {max} samples")]
    PolarGridTooLarge { center_x: i32, center_y: i32, max: usize },

    /// A slice task was cancelled or failed. The buffer holds the output of
    /// the last pass that completed.
    #[error("blur interrupted during {pass} pass: {reason}")]
    Interrupted { pass: PassKind, reason: String },

    /// The worker pool could not be created.
    #[error("couldn't build blur worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T, E = BlurError> = std::result::Result<T, E>;
