//! StackBlur Rust
//!
//! Separable image blurs on packed `0xAARRGGBB` buffers, with Python
//! bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Blurs
//! - **Stack blur**: triangular-weighted moving window, O(1) per pixel,
//!   integer radius up to 254.
//! - **Gaussian**: three chained box blurs sized from `sigma`.
//! - **Horizontal / vertical only**: one stack-blur pass.
//! - **Radial / circular**: Gaussian along the radius or the angle of a polar
//!   resampling of the image.
//!
//! RGB channels are blurred, alpha is preserved bit for bit, and a radius of
//! 0 returns the input unchanged.
//!
//! ## Execution
//! A [`BlurExecutor`] owns the worker pool and is passed to every call. Each
//! pass is split into row (horizontal) or column (vertical) slices that run
//! in parallel; the next pass starts only after every slice has finished.
//!
//! ```
//! use stackblur_rust::{blur, BlurExecutor, BlurVariant, PixelBuffer};
//!
//! let executor = BlurExecutor::new(2)?;
//! let image = PixelBuffer::filled(4, 4, 0xFFFF_0000)?;
//! let out = blur(&executor, &image, 2.0, BlurVariant::StackBlur)?;
//! assert_eq!(out, image);
//! # Ok::<(), stackblur_rust::BlurError>(())
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod filters;
pub mod manager;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::BlurConfig;
pub use error::{BlurError, Result};
pub use executor::{BlurExecutor, CancelToken, PassKind, Slice};
pub use filters::blur::{
    blur, blur_in_place, blur_with_center, BlurBackend, BlurProcess, BlurState, BlurVariant,
    CpuBackend,
};
pub use filters::core::PixelBuffer;
pub use manager::BlurManager;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::config::BlurConfig;
    use crate::error::BlurError;
    use crate::executor::BlurExecutor;
    use crate::filters::blur::{blur_in_place, BlurVariant};
    use crate::filters::core::PixelBuffer;
    use crate::filters::mul_table::MAX_STACK_RADIUS;
    use crate::filters::polar::PolarGeometry;

    impl From<BlurError> for PyErr {
        fn from(err: BlurError) -> Self {
            PyValueError::new_err(err.to_string())
        }
    }

    /// Polar centre from optional coordinates; a missing one falls back to
    /// the image centre on that axis.
    fn polar_center(
        image: &PixelBuffer,
        center_x: Option<i32>,
        center_y: Option<i32>,
    ) -> Option<(i32, i32)> {
        if center_x.is_none() && center_y.is_none() {
            return None;
        }
        let (dx, dy) = PolarGeometry::default_center(image.width(), image.height());
        Some((center_x.unwrap_or(dx), center_y.unwrap_or(dy)))
    }

    /// Blur engine owning a worker pool.
    ///
    /// All methods take an RGBA u8 image of shape (height, width, 4) and
    /// return a new array of the same shape. The GIL is released while the
    /// blur runs.
    #[pyclass(module = "stackblur_rust")]
    pub struct BlurEngine {
        executor: BlurExecutor,
    }

    impl BlurEngine {
        fn run<'py>(
            &self,
            py: Python<'py>,
            mut buffer: PixelBuffer,
            radius: f32,
            variant: BlurVariant,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let executor = &self.executor;
            py.allow_threads(|| blur_in_place(executor, &mut buffer, radius, variant))?;
            Ok(buffer.to_rgba().into_pyarray(py))
        }
    }

    #[pymethods]
    impl BlurEngine {
        /// Create an engine.
        ///
        /// # Arguments
        /// * `workers` - Worker threads (default: available parallelism; 1 runs inline)
        #[new]
        #[pyo3(signature = (workers=None))]
        fn new(workers: Option<usize>) -> PyResult<Self> {
            let mut config = BlurConfig::default();
            if let Some(workers) = workers {
                config = config.with_workers(workers);
            }
            Ok(Self {
                executor: BlurExecutor::from_config(&config)?,
            })
        }

        #[getter]
        fn workers(&self) -> usize {
            self.executor.workers()
        }

        /// Stack blur (horizontal then vertical), integer radius 0-254.
        fn stack_blur<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
            radius: f32,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let buffer = PixelBuffer::from_rgba(image.as_array())?;
            self.run(py, buffer, radius, BlurVariant::StackBlur)
        }

        /// Gaussian blur approximated by three box blurs.
        fn gaussian_blur<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
            sigma: f32,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let buffer = PixelBuffer::from_rgba(image.as_array())?;
            self.run(py, buffer, sigma, BlurVariant::Gaussian)
        }

        /// Stack blur along rows only.
        fn horizontal_blur<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
            radius: f32,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let buffer = PixelBuffer::from_rgba(image.as_array())?;
            self.run(py, buffer, radius, BlurVariant::HorizontalOnly)
        }

        /// Stack blur along columns only.
        fn vertical_blur<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
            radius: f32,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let buffer = PixelBuffer::from_rgba(image.as_array())?;
            self.run(py, buffer, radius, BlurVariant::VerticalOnly)
        }

        /// Zoom blur around a centre (default: image centre).
        #[pyo3(signature = (image, sigma, center_x=None, center_y=None))]
        fn radial_blur<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
            sigma: f32,
            center_x: Option<i32>,
            center_y: Option<i32>,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let buffer = PixelBuffer::from_rgba(image.as_array())?;
            let center = polar_center(&buffer, center_x, center_y);
            self.run(py, buffer, sigma, BlurVariant::Radial { center })
        }

        /// Spin blur around a centre (default: image centre).
        #[pyo3(signature = (image, sigma, center_x=None, center_y=None))]
        fn circular_blur<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
            sigma: f32,
            center_x: Option<i32>,
            center_y: Option<i32>,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let buffer = PixelBuffer::from_rgba(image.as_array())?;
            let center = polar_center(&buffer, center_x, center_y);
            self.run(py, buffer, sigma, BlurVariant::Circular { center })
        }
    }

    /// Python module definition
    #[pymodule]
    pub fn stackblur_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<BlurEngine>()?;
        m.add("MAX_STACK_RADIUS", MAX_STACK_RADIUS)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::stackblur_rust;
