//! Engine configuration.

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "stackblur-worker";

/// Settings used to build a [`BlurExecutor`](crate::executor::BlurExecutor).
///
/// The worker count defaults to the hardware parallelism reported by the OS,
/// queried once when the config is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlurConfig {
    /// Number of slices per pass and threads in the pool. `1` runs every
    /// slice inline on the calling thread; `0` is treated as `1`.
    pub workers: usize,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            workers: available_workers(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_owned(),
        }
    }
}

impl BlurConfig {
    /// Single-threaded configuration, used where threads are unavailable (wasm).
    pub fn single_threaded() -> Self {
        Self {
            workers: 1,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Worker count with the `0 => 1` rule applied.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
