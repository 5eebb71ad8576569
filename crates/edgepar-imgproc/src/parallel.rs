use std::fmt;
use std::ops::Range;

use rayon::prelude::*;
use thiserror::Error;

use edgepar_image::Image;

use crate::partition::{self, BlockGrid, Tile, Traversal};

/// Errors that can occur while configuring parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The chunk size of a row or column strategy is invalid.
    #[error("chunk size must be > 0, got {0}")]
    InvalidChunkSize(usize),

    /// The block count of a block strategy is invalid.
    #[error("block count must be > 0, got {0}")]
    InvalidBlockCount(usize),

    /// A parallel strategy was built without a worker count.
    #[error("worker count must be set for a parallel strategy")]
    MissingWorkerCount,

    /// A row or column strategy was built without a chunk size.
    #[error("chunk size must be set for the {0} strategy")]
    MissingChunkSize(&'static str),

    /// A block strategy was built without a block count.
    #[error("block count must be set for the blocks strategy")]
    MissingBlockCount,
}

/// Controls how a filter pass is spread across worker threads.
///
/// Every variant produces the same pixels; only the assignment of pixels to
/// workers and the visiting order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread, row by row.
    #[default]
    Serial,

    /// Distribute chunks of `chunk_size` consecutive rows round-robin over `workers` threads.
    Rows {
        /// Number of worker threads.
        workers: usize,
        /// Number of consecutive rows per scheduling unit.
        chunk_size: usize,
    },

    /// Distribute chunks of `chunk_size` consecutive columns round-robin over `workers` threads.
    Columns {
        /// Number of worker threads.
        workers: usize,
        /// Number of consecutive columns per scheduling unit.
        chunk_size: usize,
    },

    /// Split the image into rectangular blocks, each handled wholly by one of `workers` threads.
    ///
    /// The block layout comes from [`partition::block_layout`].
    Blocks {
        /// Number of worker threads.
        workers: usize,
        /// Requested number of blocks.
        blocks: usize,
    },
}

impl ExecutionStrategy {
    /// Check the strategy parameters.
    pub fn validate(&self) -> Result<(), ParallelError> {
        match *self {
            ExecutionStrategy::Serial => Ok(()),
            ExecutionStrategy::Rows {
                workers,
                chunk_size,
            }
            | ExecutionStrategy::Columns {
                workers,
                chunk_size,
            } => {
                if workers == 0 {
                    return Err(ParallelError::InvalidThreadCount(workers));
                }
                if chunk_size == 0 {
                    return Err(ParallelError::InvalidChunkSize(chunk_size));
                }
                Ok(())
            }
            ExecutionStrategy::Blocks { workers, blocks } => {
                if workers == 0 {
                    return Err(ParallelError::InvalidThreadCount(workers));
                }
                if blocks == 0 {
                    return Err(ParallelError::InvalidBlockCount(blocks));
                }
                Ok(())
            }
        }
    }

    /// Number of threads the strategy runs on.
    pub fn workers(&self) -> usize {
        match *self {
            ExecutionStrategy::Serial => 1,
            ExecutionStrategy::Rows { workers, .. }
            | ExecutionStrategy::Columns { workers, .. }
            | ExecutionStrategy::Blocks { workers, .. } => workers,
        }
    }

    /// Short lowercase name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStrategy::Serial => "serial",
            ExecutionStrategy::Rows { .. } => "rows",
            ExecutionStrategy::Columns { .. } => "columns",
            ExecutionStrategy::Blocks { .. } => "blocks",
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ExecutionStrategy::Serial => write!(f, "serial"),
            ExecutionStrategy::Rows {
                workers,
                chunk_size,
            } => write!(f, "rows (workers: {workers}, chunk size: {chunk_size})"),
            ExecutionStrategy::Columns {
                workers,
                chunk_size,
            } => write!(f, "columns (workers: {workers}, chunk size: {chunk_size})"),
            ExecutionStrategy::Blocks { workers, blocks } => {
                write!(f, "blocks (workers: {workers}, blocks: {blocks})")
            }
        }
    }
}

/// Incrementally collect strategy parameters, then build a validated [`ExecutionStrategy`].
///
/// # Examples
///
/// ```
/// use edgepar_imgproc::parallel::{ExecutionStrategy, ParallelError, StrategyBuilder};
///
/// let strategy = StrategyBuilder::new().workers(4).chunk_size(16).rows().unwrap();
/// assert_eq!(strategy, ExecutionStrategy::Rows { workers: 4, chunk_size: 16 });
///
/// let missing = StrategyBuilder::new().workers(4).columns();
/// assert_eq!(missing, Err(ParallelError::MissingChunkSize("columns")));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyBuilder {
    workers: Option<usize>,
    chunk_size: Option<usize>,
    blocks: Option<usize>,
}

impl StrategyBuilder {
    /// Create a builder with no parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }

    /// Set the number of rows or columns per scheduling unit.
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    /// Set the number of blocks.
    pub fn block_count(mut self, n: usize) -> Self {
        self.blocks = Some(n);
        self
    }

    /// Build a row-chunked strategy.
    pub fn rows(self) -> Result<ExecutionStrategy, ParallelError> {
        let workers = self.workers.ok_or(ParallelError::MissingWorkerCount)?;
        let chunk_size = self
            .chunk_size
            .ok_or(ParallelError::MissingChunkSize("rows"))?;
        let strategy = ExecutionStrategy::Rows {
            workers,
            chunk_size,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Build a column-chunked strategy.
    pub fn columns(self) -> Result<ExecutionStrategy, ParallelError> {
        let workers = self.workers.ok_or(ParallelError::MissingWorkerCount)?;
        let chunk_size = self
            .chunk_size
            .ok_or(ParallelError::MissingChunkSize("columns"))?;
        let strategy = ExecutionStrategy::Columns {
            workers,
            chunk_size,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Build a block strategy.
    pub fn blocks(self) -> Result<ExecutionStrategy, ParallelError> {
        let workers = self.workers.ok_or(ParallelError::MissingWorkerCount)?;
        let blocks = self.blocks.ok_or(ParallelError::MissingBlockCount)?;
        let strategy = ExecutionStrategy::Blocks { workers, blocks };
        strategy.validate()?;
        Ok(strategy)
    }
}

/// A pixel whose neighborhood could not be read.
///
/// The pixel is left at its default value in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelFault {
    /// Row of the faulted pixel.
    pub row: usize,
    /// Column of the faulted pixel.
    pub col: usize,
}

impl fmt::Display for PixelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pixel ({}, {})", self.row, self.col)
    }
}

/// How work items are dealt to the workers before execution starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    /// Item `k` goes to worker `k % workers`.
    RoundRobin,
    /// Worker `w` takes the `w`-th contiguous run of items.
    Contiguous,
}

/// Deal `items` to `workers` lists according to `schedule`, dropping empty lists.
fn assign<I>(items: Vec<I>, workers: usize, schedule: Schedule) -> Vec<Vec<I>> {
    let workers = workers.max(1);
    let mut lists: Vec<Vec<I>> = (0..workers).map(|_| Vec::new()).collect();
    let per_worker = items.len().div_ceil(workers).max(1);
    for (k, item) in items.into_iter().enumerate() {
        let w = match schedule {
            Schedule::RoundRobin => k % workers,
            Schedule::Contiguous => k / per_worker,
        };
        lists[w].push(item);
    }
    lists.retain(|list| !list.is_empty());
    lists
}

/// Runs filter passes with a fixed strategy and, for parallel strategies, a dedicated thread pool.
///
/// The pool is built once when the executor is created and reused by every pass,
/// so it can be shared across the stages of a pipeline or across images.
pub struct Executor {
    strategy: ExecutionStrategy,
    pool: Option<rayon::ThreadPool>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl Executor {
    /// Validate `strategy` and build the thread pool it needs.
    ///
    /// # Errors
    ///
    /// Returns a [`ParallelError`] when the strategy parameters are invalid or
    /// the pool cannot be built.
    pub fn new(strategy: ExecutionStrategy) -> Result<Self, ParallelError> {
        strategy.validate()?;

        let pool = match strategy {
            ExecutionStrategy::Serial => None,
            _ => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(strategy.workers())
                    .build()
                    .map_err(|e| ParallelError::BuildError(e.to_string()))?,
            ),
        };

        Ok(Self { strategy, pool })
    }

    /// Executor running every pass on the calling thread.
    pub fn serial() -> Self {
        Self {
            strategy: ExecutionStrategy::Serial,
            pool: None,
        }
    }

    /// The strategy this executor applies.
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Compute every interior pixel of `dst` with `kernel`.
    ///
    /// The interior is `[margin, rows - margin) x [margin, cols - margin)`; the
    /// band outside it is not touched. `kernel(row, col)` returns the value of
    /// the pixel or a [`PixelFault`], in which case the pixel keeps its current
    /// value and the fault is returned. Callers log faults with the identity of
    /// their input.
    ///
    /// Workers write disjoint tiles of `dst` and only read through `kernel`,
    /// so no synchronization is involved.
    pub fn map_interior<T, F>(&self, dst: &mut Image<T>, margin: usize, kernel: F) -> Vec<PixelFault>
    where
        T: Send,
        F: Fn(usize, usize) -> Result<T, PixelFault> + Sync,
    {
        let size = dst.size();
        let rows = margin..size.height.saturating_sub(margin).max(margin);
        let cols = margin..size.width.saturating_sub(margin).max(margin);
        if rows.is_empty() || cols.is_empty() {
            return Vec::new();
        }

        let (row_cuts, col_cuts, traversal, schedule) = self.layout(size, rows, cols);
        let width = size.width;
        let tiles = partition::split_tiles(dst.as_slice_mut(), width, &row_cuts, &col_cuts);

        let tiles = match self.strategy {
            // blocks are dealt column of blocks first
            ExecutionStrategy::Blocks { .. } => {
                let num_col_bands = col_cuts.len() - 1;
                let num_row_bands = row_cuts.len() - 1;
                let mut by_column: Vec<Option<Tile<'_, T>>> = tiles.into_iter().map(Some).collect();
                let mut ordered = Vec::with_capacity(by_column.len());
                for bc in 0..num_col_bands {
                    for br in 0..num_row_bands {
                        if let Some(tile) = by_column[br * num_col_bands + bc].take() {
                            ordered.push(tile);
                        }
                    }
                }
                ordered
            }
            _ => tiles,
        };

        let tiles: Vec<Tile<'_, T>> = tiles.into_iter().filter(|t| !t.is_empty()).collect();

        let process = |work: Vec<Tile<'_, T>>| -> Vec<PixelFault> {
            let mut faults = Vec::new();
            for mut tile in work {
                tile.for_each_mut(traversal, |row, col, px| match kernel(row, col) {
                    Ok(val) => *px = val,
                    Err(fault) => faults.push(fault),
                });
            }
            faults
        };

        match &self.pool {
            None => process(tiles),
            Some(pool) => {
                let work = assign(tiles, self.strategy.workers(), schedule);
                log::debug!(
                    "{}: {} work lists over {}x{}",
                    self.strategy,
                    work.len(),
                    size.width,
                    size.height
                );
                pool.install(|| work.into_par_iter().map(process).collect::<Vec<_>>())
                    .into_iter()
                    .flatten()
                    .collect()
            }
        }
    }

    /// Cut points, traversal and schedule for one pass over the given interior.
    fn layout(
        &self,
        size: edgepar_image::ImageSize,
        rows: Range<usize>,
        cols: Range<usize>,
    ) -> (Vec<usize>, Vec<usize>, Traversal, Schedule) {
        let whole = |r: &Range<usize>| vec![r.start, r.end];
        match self.strategy {
            ExecutionStrategy::Serial => (
                whole(&rows),
                whole(&cols),
                Traversal::RowMajor,
                Schedule::Contiguous,
            ),
            ExecutionStrategy::Rows { chunk_size, .. } => (
                partition::chunk_cuts(rows, chunk_size),
                whole(&cols),
                Traversal::RowMajor,
                Schedule::RoundRobin,
            ),
            ExecutionStrategy::Columns { chunk_size, .. } => (
                whole(&rows),
                partition::chunk_cuts(cols, chunk_size),
                Traversal::ColumnMajor,
                Schedule::RoundRobin,
            ),
            ExecutionStrategy::Blocks { blocks, .. } => match BlockGrid::new(blocks, size) {
                Ok(grid) => {
                    log::debug!("block grid for {size}: {grid:?}");
                    (
                        grid.row_cuts(rows),
                        grid.col_cuts(cols),
                        Traversal::RowMajor,
                        Schedule::Contiguous,
                    )
                }
                // unreachable after validation; fall back to a single block
                Err(_) => (
                    whole(&rows),
                    whole(&cols),
                    Traversal::RowMajor,
                    Schedule::Contiguous,
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert_eq!(ExecutionStrategy::Serial.validate(), Ok(()));
        assert_eq!(
            ExecutionStrategy::Rows {
                workers: 0,
                chunk_size: 1
            }
            .validate(),
            Err(ParallelError::InvalidThreadCount(0))
        );
        assert_eq!(
            ExecutionStrategy::Columns {
                workers: 2,
                chunk_size: 0
            }
            .validate(),
            Err(ParallelError::InvalidChunkSize(0))
        );
        assert_eq!(
            ExecutionStrategy::Blocks {
                workers: 2,
                blocks: 0
            }
            .validate(),
            Err(ParallelError::InvalidBlockCount(0))
        );
    }

    #[test]
    fn test_builder_requires_parameters() {
        assert_eq!(
            StrategyBuilder::new().chunk_size(4).rows(),
            Err(ParallelError::MissingWorkerCount)
        );
        assert_eq!(
            StrategyBuilder::new().workers(2).rows(),
            Err(ParallelError::MissingChunkSize("rows"))
        );
        assert_eq!(
            StrategyBuilder::new().workers(2).chunk_size(8).blocks(),
            Err(ParallelError::MissingBlockCount)
        );
        assert_eq!(
            StrategyBuilder::new().workers(2).block_count(9).blocks(),
            Ok(ExecutionStrategy::Blocks {
                workers: 2,
                blocks: 9
            })
        );
        assert_eq!(
            StrategyBuilder::new().workers(3).chunk_size(0).columns(),
            Err(ParallelError::InvalidChunkSize(0))
        );
    }

    #[test]
    fn test_assign_round_robin() {
        let lists = assign((0..7).collect(), 3, Schedule::RoundRobin);
        assert_eq!(lists, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn test_assign_contiguous() {
        let lists = assign((0..7).collect(), 3, Schedule::Contiguous);
        assert_eq!(lists, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);

        let lists = assign((0..2).collect(), 4, Schedule::Contiguous);
        assert_eq!(lists, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_executor_invalid() {
        assert_eq!(
            Executor::new(ExecutionStrategy::Rows {
                workers: 0,
                chunk_size: 4
            })
            .err(),
            Some(ParallelError::InvalidThreadCount(0))
        );
    }

    #[test]
    fn test_map_interior_all_strategies() -> Result<(), ParallelError> {
        let strategies = [
            ExecutionStrategy::Serial,
            ExecutionStrategy::Rows {
                workers: 3,
                chunk_size: 2,
            },
            ExecutionStrategy::Columns {
                workers: 2,
                chunk_size: 3,
            },
            ExecutionStrategy::Blocks {
                workers: 4,
                blocks: 32,
            },
        ];

        for strategy in strategies {
            let executor = Executor::new(strategy)?;
            let mut dst = Image::from_size_val([9, 7].into(), 0usize);
            let faults = executor.map_interior(&mut dst, 1, |row, col| Ok(row * 100 + col));
            assert!(faults.is_empty());

            let expected = Image::from_fn([9, 7].into(), |row, col| {
                if (1..6).contains(&row) && (1..8).contains(&col) {
                    row * 100 + col
                } else {
                    0
                }
            });
            assert_eq!(dst, expected, "strategy {strategy}");
        }

        Ok(())
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_map_interior_huge_block_count() -> Result<(), ParallelError> {
        let expected = Image::from_fn([64, 48].into(), |row, col| {
            if (1..47).contains(&row) && (1..63).contains(&col) {
                row * 100 + col
            } else {
                0
            }
        });

        for blocks in [10_000_000_000, 1 << 63, usize::MAX] {
            let executor = Executor::new(ExecutionStrategy::Blocks { workers: 3, blocks })?;
            let mut dst = Image::from_size_val([64, 48].into(), 0usize);
            let faults = executor.map_interior(&mut dst, 1, |row, col| Ok(row * 100 + col));
            assert!(faults.is_empty());
            assert_eq!(dst, expected, "blocks {blocks}");
        }

        Ok(())
    }

    #[test]
    fn test_map_interior_collects_faults() -> Result<(), ParallelError> {
        let executor = Executor::new(ExecutionStrategy::Blocks {
            workers: 2,
            blocks: 4,
        })?;
        let mut dst = Image::from_size_val([5, 5].into(), 0u8);
        let mut faults = executor.map_interior(&mut dst, 1, |row, col| {
            if row == col {
                Err(PixelFault { row, col })
            } else {
                Ok(1)
            }
        });
        faults.sort();

        assert_eq!(
            faults,
            vec![
                PixelFault { row: 1, col: 1 },
                PixelFault { row: 2, col: 2 },
                PixelFault { row: 3, col: 3 },
            ]
        );
        assert_eq!(dst.get(2, 2), Some(&0));
        assert_eq!(dst.get(2, 3), Some(&1));
        assert_eq!(dst.count(|&px| px == 1), 6);

        Ok(())
    }
}
