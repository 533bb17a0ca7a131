//! Blur kernels and the pass orchestrator.
//!
//! ## Pixel Format
//!
//! Every kernel works on [`PixelBuffer`](core::PixelBuffer): row-major
//! `u32` pixels packed as `0xAARRGGBB`. Only the RGB channels are blurred;
//! alpha is copied from the source pixel at the same position.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `core` | `PixelBuffer`, channel pack/unpack, RGBA array conversion |
//! | `mul_table` | Multiply/shift tables replacing the stack-blur division |
//! | `box_blur` | Sliding-window box blur |
//! | `gaussian` | Box widths approximating a Gaussian, sequential Gaussian blur |
//! | `stack_blur` | Stack blur |
//! | `polar` | Cartesian/polar resampling for radial and circular blurs |
//! | `blur` | `BlurVariant`, `BlurProcess`, entry points, backends |
//!
//! ## Architecture
//!
//! Kernels are 1-D: they blur one line at a time through
//! [`LineKernel`](crate::executor::LineKernel). The executor splits each
//! pass into row or column slices and runs them on its worker pool; the
//! orchestrator in `blur` chains passes with a barrier between them.

pub mod core;
pub mod mul_table;
pub mod box_blur;
pub mod gaussian;
pub mod stack_blur;
pub mod polar;
pub mod blur;
