//! Parallel pass executor.
//!
//! A pass sweeps a 1-D kernel over every row (horizontal) or every column
//! (vertical) of an image. The lines are split into contiguous slices, one
//! task per slice, and `run_pass` returns only after every task finished.
//! That return is the barrier between the two halves of a separable blur.
//!
//! Each pass reads the whole source and writes a fresh destination, so a
//! failed pass never leaves a half-written slice in the caller's image.

use std::fmt;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::BlurConfig;
use crate::error::{BlurError, Result};
use crate::filters::core::PixelBuffer;

/// Direction of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// One line per row, partitioned over `[0, height)`.
    Horizontal,
    /// One line per column, partitioned over `[0, width)`.
    Vertical,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Horizontal => f.write_str("horizontal"),
            PassKind::Vertical => f.write_str("vertical"),
        }
    }
}

/// A 1-D blur applied to one row or column at a time.
///
/// `out` has the same length as `src`. Implementations must write every
/// element of `out` and keep each pixel's alpha from `src`.
pub trait LineKernel: Sync {
    fn blur_line(&self, src: &[u32], out: &mut [u32]);
}

// ============================================================================
// Slices
// ============================================================================

/// Half-open range `[begin, end)` of row or column indices owned by one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub begin: usize,
    pub end: usize,
}

impl Slice {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Slice `index` of `count` over `[0, n)`: `[index*n/count, (index+1)*n/count)`.
    pub fn nth(index: usize, count: usize, n: usize) -> Self {
        Self::new(index * n / count, (index + 1) * n / count)
    }

    /// Split `[0, n)` into `count` slices as evenly as integer division allows.
    /// Slices are disjoint, ordered, and cover the range. Some are empty when
    /// `count > n`.
    pub fn partition(n: usize, count: usize) -> Vec<Slice> {
        let count = count.max(1);
        (0..count).map(|i| Self::nth(i, count, n)).collect()
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    pub fn range(&self) -> Range<usize> {
        self.begin..self.end
    }
}

// ============================================================================
// Sweeps
// ============================================================================

/// Blur rows `rows` of `src`. `out` receives the rows back to back.
pub fn sweep_rows<K: LineKernel + ?Sized>(
    kernel: &K,
    src: &[u32],
    width: usize,
    rows: Slice,
    out: &mut [u32],
) {
    for (y, out_row) in rows.range().zip(out.chunks_exact_mut(width)) {
        kernel.blur_line(&src[y * width..(y + 1) * width], out_row);
    }
}

/// Blur columns `columns` of `src`. `out` receives the columns back to back
/// (column-major); [`scatter_columns`] moves them into a row-major image.
pub fn sweep_columns<K: LineKernel + ?Sized>(
    kernel: &K,
    src: &[u32],
    width: usize,
    height: usize,
    columns: Slice,
    out: &mut [u32],
) {
    let mut column = vec![0u32; height];
    for (x, out_column) in columns.range().zip(out.chunks_exact_mut(height)) {
        for (y, px) in column.iter_mut().enumerate() {
            *px = src[y * width + x];
        }
        kernel.blur_line(&column, out_column);
    }
}

/// Copy column-major lines produced by [`sweep_columns`] into `dst`.
pub fn scatter_columns(lines: &[u32], width: usize, height: usize, columns: Slice, dst: &mut [u32]) {
    for (x, column) in columns.range().zip(lines.chunks_exact(height)) {
        for (y, &px) in column.iter().enumerate() {
            dst[y * width + x] = px;
        }
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag a caller flips to stop a blur between slices.
///
/// Tasks that already started finish their slice; tasks that have not
/// started yet fail with `Interrupted`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Worker pool that runs blur passes slice by slice.
///
/// Construct it once and pass it to every blur call. With one worker no pool
/// is created and slices run inline on the caller's thread.
pub struct BlurExecutor {
    pool: Option<ThreadPool>,
    workers: usize,
}

impl fmt::Debug for BlurExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlurExecutor")
            .field("workers", &self.workers)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl BlurExecutor {
    /// Executor with `workers` slices per pass.
    pub fn new(workers: usize) -> Result<Self> {
        Self::from_config(&BlurConfig::default().with_workers(workers))
    }

    /// Executor sized to the available hardware parallelism.
    pub fn with_available_parallelism() -> Result<Self> {
        Self::from_config(&BlurConfig::default())
    }

    pub fn from_config(config: &BlurConfig) -> Result<Self> {
        let workers = config.effective_workers();
        let pool = if workers == 1 {
            None
        } else {
            let prefix = config.thread_name_prefix.clone();
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(move |i| format!("{prefix}-{i}"))
                    .build()?,
            )
        };
        log::debug!("blur executor ready with {workers} worker(s)");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run one pass of `kernel` over `src` and return the destination pixels.
    ///
    /// Blocks until every slice task has finished. If any task was cancelled
    /// or panicked, the error of the lowest-indexed failing slice is returned
    /// and the destination is dropped.
    pub fn run_pass<K: LineKernel + ?Sized>(
        &self,
        src: &PixelBuffer,
        kind: PassKind,
        kernel: &K,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<u32>> {
        let (width, height) = (src.width() as usize, src.height() as usize);
        let (lines, line_len) = match kind {
            PassKind::Horizontal => (height, width),
            PassKind::Vertical => (width, height),
        };
        let slices: Vec<Slice> = Slice::partition(lines, self.workers)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();

        let started = Instant::now();
        let mut output = vec![0u32; width * height];
        let mut outcomes: Vec<Option<Result<()>>> = slices.iter().map(|_| None).collect();

        {
            let mut chunks = Vec::with_capacity(slices.len());
            let mut rest: &mut [u32] = &mut output;
            for slice in &slices {
                let (head, tail) = std::mem::take(&mut rest).split_at_mut(slice.len() * line_len);
                chunks.push(head);
                rest = tail;
            }

            let tasks = slices.iter().zip(chunks).zip(outcomes.iter_mut());
            match &self.pool {
                Some(pool) => pool.scope(|scope| {
                    for ((&slice, chunk), slot) in tasks {
                        scope.spawn(move |_| {
                            *slot = Some(run_slice(kernel, src, kind, slice, chunk, cancel));
                        });
                    }
                }),
                None => {
                    for ((&slice, chunk), slot) in tasks {
                        *slot = Some(run_slice(kernel, src, kind, slice, chunk, cancel));
                    }
                }
            }
        }

        for outcome in outcomes {
            match outcome {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    log::warn!("{err}");
                    return Err(err);
                }
                None => {
                    return Err(BlurError::Interrupted {
                        pass: kind,
                        reason: "slice task never ran".to_owned(),
                    })
                }
            }
        }

        let pixels = match kind {
            PassKind::Horizontal => output,
            PassKind::Vertical => {
                let mut dst = vec![0u32; width * height];
                for slice in &slices {
                    let lines = &output[slice.begin * height..slice.end * height];
                    scatter_columns(lines, width, height, *slice, &mut dst);
                }
                dst
            }
        };

        log::debug!(
            "{kind} pass over {lines} lines in {} slice(s) took {:?}",
            slices.len(),
            started.elapsed()
        );
        Ok(pixels)
    }
}

/// Body of one slice task. Never unwinds: a panic becomes `Interrupted`.
fn run_slice<K: LineKernel + ?Sized>(
    kernel: &K,
    src: &PixelBuffer,
    kind: PassKind,
    slice: Slice,
    out: &mut [u32],
    cancel: Option<&CancelToken>,
) -> Result<()> {
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(BlurError::Interrupted {
            pass: kind,
            reason: format!("cancelled before slice {}..{}", slice.begin, slice.end),
        });
    }

    let (width, height) = (src.width() as usize, src.height() as usize);
    panic::catch_unwind(AssertUnwindSafe(|| match kind {
        PassKind::Horizontal => sweep_rows(kernel, src.pixels(), width, slice, out),
        PassKind::Vertical => sweep_columns(kernel, src.pixels(), width, height, slice, out),
    }))
    .map_err(|payload| BlurError::Interrupted {
        pass: kind,
        reason: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "slice task panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replaces every pixel with the line's first pixel.
    struct FirstOfLine;

    impl LineKernel for FirstOfLine {
        fn blur_line(&self, src: &[u32], out: &mut [u32]) {
            out.fill(src[0]);
        }
    }

    struct Panics;

    impl LineKernel for Panics {
        fn blur_line(&self, _src: &[u32], _out: &mut [u32]) {
            panic!("kernel exploded");
        }
    }

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let pixels = (0..width * height).map(|i| 0xFF00_0000 | i).collect();
        PixelBuffer::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_partition_covers_range() {
        let slices = Slice::partition(10, 3);
        assert_eq!(
            slices,
            vec![Slice::new(0, 3), Slice::new(3, 6), Slice::new(6, 10)]
        );
        assert_eq!(slices.iter().map(Slice::len).sum::<usize>(), 10);
    }

    #[test]
    fn test_partition_more_slices_than_lines() {
        let slices = Slice::partition(2, 4);
        assert_eq!(slices.len(), 4);
        assert_eq!(slices.iter().filter(|s| !s.is_empty()).count(), 2);
        assert_eq!(slices.last().unwrap().end, 2);
    }

    #[test]
    fn test_horizontal_pass_matches_across_worker_counts() {
        let img = gradient(5, 7);
        let expected: Vec<u32> = (0..7).flat_map(|y| [0xFF00_0000 | (y * 5); 5]).collect();
        for workers in [1, 2, 3, 8] {
            let executor = BlurExecutor::new(workers).unwrap();
            let out = executor
                .run_pass(&img, PassKind::Horizontal, &FirstOfLine, None)
                .unwrap();
            assert_eq!(out, expected, "workers = {workers}");
        }
    }

    #[test]
    fn test_vertical_pass_writes_row_major() {
        let img = gradient(4, 3);
        let executor = BlurExecutor::new(2).unwrap();
        let out = executor
            .run_pass(&img, PassKind::Vertical, &FirstOfLine, None)
            .unwrap();
        // Every row equals the first row.
        for y in 0..3 {
            assert_eq!(&out[y * 4..(y + 1) * 4], &img.pixels()[0..4]);
        }
    }

    #[test]
    fn test_cancelled_pass_is_interrupted() {
        let img = gradient(4, 4);
        let token = CancelToken::new();
        token.cancel();
        let executor = BlurExecutor::new(2).unwrap();
        let err = executor
            .run_pass(&img, PassKind::Horizontal, &FirstOfLine, Some(&token))
            .unwrap_err();
        assert!(matches!(
            err,
            BlurError::Interrupted { pass: PassKind::Horizontal, .. }
        ));
    }

    #[test]
    fn test_panicking_task_becomes_interrupted() {
        let img = gradient(6, 6);
        for workers in [1, 3] {
            let executor = BlurExecutor::new(workers).unwrap();
            let err = executor
                .run_pass(&img, PassKind::Vertical, &Panics, None)
                .unwrap_err();
            match err {
                BlurError::Interrupted { pass, reason } => {
                    assert_eq!(pass, PassKind::Vertical);
                    assert!(reason.contains("kernel exploded"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_scatter_columns() {
        // Two columns of a 3x2 image, column-major.
        let lines = [1, 2, 3, 4];
        let mut dst = [0u32; 6];
        scatter_columns(&lines, 3, 2, Slice::new(1, 3), &mut dst);
        assert_eq!(dst, [0, 1, 3, 0, 2, 4]);
    }
}
