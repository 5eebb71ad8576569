use std::ops::Range;

use edgepar_image::ImageSize;

use crate::parallel::ParallelError;

/// Check whether `n` is the square of an integer.
pub fn is_perfect_square(n: usize) -> bool {
    let root = (n as f64).sqrt().round() as usize;
    root.checked_mul(root) == Some(n)
}

/// Turn a requested block count into a `(num_rows, num_cols)` layout.
///
/// Starting from one row, the row count is incremented and the remaining count
/// divided by it until the remainder is a perfect square, which becomes the
/// column count. A perfect square request is split evenly instead.
///
/// The search does not look for the most balanced factorization: `32` gives
/// `2x16` rather than `4x8`, and counts such as `6` give a layout whose product
/// is smaller than the request (`3x1`). When the division reaches zero the
/// column count is kept at one so every layout covers the image.
///
/// # Examples
///
/// ```
/// use edgepar_imgproc::partition::block_layout;
///
/// assert_eq!(block_layout(8).unwrap(), (2, 4));
/// assert_eq!(block_layout(16).unwrap(), (4, 4));
/// assert_eq!(block_layout(32).unwrap(), (2, 16));
/// assert_eq!(block_layout(64).unwrap(), (8, 8));
/// ```
pub fn block_layout(num_blocks: usize) -> Result<(usize, usize), ParallelError> {
    if num_blocks == 0 {
        return Err(ParallelError::InvalidBlockCount(num_blocks));
    }

    if is_perfect_square(num_blocks) {
        let side = (num_blocks as f64).sqrt().round() as usize;
        return Ok((side, side));
    }

    let mut num_rows = 1;
    let mut remaining = num_blocks;
    while !is_perfect_square(remaining) {
        num_rows += 1;
        remaining /= num_rows;
    }

    Ok((num_rows, remaining.max(1)))
}

/// Block grid descriptor derived from a block count and an image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    /// Number of block rows.
    pub num_rows: usize,
    /// Number of block columns.
    pub num_cols: usize,
    /// Nominal height of a block in pixels.
    pub row_height: usize,
    /// Nominal width of a block in pixels.
    pub col_width: usize,
}

impl BlockGrid {
    /// Describe the block grid for `num_blocks` blocks over an image of `size`.
    ///
    /// The nominal block extent is the image extent divided by the number of
    /// blocks along that axis. The last block on each axis absorbs the remainder.
    pub fn new(num_blocks: usize, size: ImageSize) -> Result<Self, ParallelError> {
        let (num_rows, num_cols) = block_layout(num_blocks)?;
        Ok(Self {
            num_rows,
            num_cols,
            row_height: size.height / num_rows,
            col_width: size.width / num_cols,
        })
    }

    /// Row cut points over `interior`, one band per non-empty block row.
    pub fn row_cuts(&self, interior: Range<usize>) -> Vec<usize> {
        band_cuts(interior, self.num_rows, self.row_height)
    }

    /// Column cut points over `interior`, one band per non-empty block column.
    pub fn col_cuts(&self, interior: Range<usize>) -> Vec<usize> {
        band_cuts(interior, self.num_cols, self.col_width)
    }
}

/// Cut points for `bands` bands of `step` elements starting at `interior.start`.
///
/// Bands that would start at or past `interior.end` are empty and collapse into
/// the last one, so there are never more bands than interior elements.
fn band_cuts(interior: Range<usize>, bands: usize, step: usize) -> Vec<usize> {
    let mut cuts = vec![interior.start];
    if step > 0 {
        cuts.extend(
            (1..bands)
                .map(|k| interior.start.saturating_add(k.saturating_mul(step)))
                .take_while(|&cut| cut < interior.end),
        );
    }
    cuts.push(interior.end);
    cuts.dedup();
    cuts
}

/// Cut points splitting `interior` into chunks of `chunk_size` elements.
pub fn chunk_cuts(interior: Range<usize>, chunk_size: usize) -> Vec<usize> {
    let mut cuts: Vec<usize> = interior.clone().step_by(chunk_size.max(1)).collect();
    cuts.push(interior.end);
    cuts
}

/// Pixel visiting order inside a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Outer loop over rows, inner loop over columns.
    RowMajor,
    /// Outer loop over columns, inner loop over rows.
    ColumnMajor,
}

/// A rectangular region of an image buffer with exclusive access to its pixels.
///
/// A tile holds one mutable segment per covered row. Tiles produced by
/// [`split_tiles`] never overlap, so they can be handed to different workers.
#[derive(Debug)]
pub struct Tile<'a, T> {
    rows: Range<usize>,
    cols: Range<usize>,
    segments: Vec<&'a mut [T]>,
}

impl<T> Tile<'_, T> {
    /// Absolute rows covered by the tile.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Absolute columns covered by the tile.
    pub fn cols(&self) -> Range<usize> {
        self.cols.clone()
    }

    /// Whether the tile covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    /// Visit every pixel of the tile with its absolute `(row, col)`.
    pub fn for_each_mut(&mut self, order: Traversal, mut f: impl FnMut(usize, usize, &mut T)) {
        match order {
            Traversal::RowMajor => {
                for (i, segment) in self.segments.iter_mut().enumerate() {
                    for (j, px) in segment.iter_mut().enumerate() {
                        f(self.rows.start + i, self.cols.start + j, px);
                    }
                }
            }
            Traversal::ColumnMajor => {
                for j in 0..self.cols.len() {
                    for (i, segment) in self.segments.iter_mut().enumerate() {
                        f(self.rows.start + i, self.cols.start + j, &mut segment[j]);
                    }
                }
            }
        }
    }
}

/// Split a row-major buffer into the tiles of a `row_cuts x col_cuts` grid.
///
/// Tiles are returned in row-major block order, `band_row * num_col_bands + band_col`.
/// Pixels outside `[row_cuts[0], row_cuts[last]) x [col_cuts[0], col_cuts[last])`
/// are not covered by any tile.
///
/// PRECONDITION: both cut lists hold at least two non-decreasing entries within the buffer.
pub fn split_tiles<'a, T>(
    data: &'a mut [T],
    width: usize,
    row_cuts: &[usize],
    col_cuts: &[usize],
) -> Vec<Tile<'a, T>> {
    let num_row_bands = row_cuts.len().saturating_sub(1);
    let num_col_bands = col_cuts.len().saturating_sub(1);
    if num_row_bands == 0 || num_col_bands == 0 || width == 0 {
        return Vec::new();
    }

    let mut tiles: Vec<Tile<'a, T>> = (0..num_row_bands)
        .flat_map(|br| (0..num_col_bands).map(move |bc| (br, bc)))
        .map(|(br, bc)| Tile {
            rows: row_cuts[br]..row_cuts[br + 1],
            cols: col_cuts[bc]..col_cuts[bc + 1],
            segments: Vec::with_capacity(row_cuts[br + 1] - row_cuts[br]),
        })
        .collect();

    let (first_row, last_row) = (row_cuts[0], row_cuts[num_row_bands]);
    let (first_col, last_col) = (col_cuts[0], col_cuts[num_col_bands]);

    let mut band = 0;
    for (row, line) in data
        .chunks_mut(width)
        .enumerate()
        .take(last_row)
        .skip(first_row)
    {
        while row >= row_cuts[band + 1] {
            band += 1;
        }

        let mut rest = &mut line[first_col..last_col];
        for bc in 0..num_col_bands {
            let len = col_cuts[bc + 1] - col_cuts[bc];
            let (segment, tail) = std::mem::take(&mut rest).split_at_mut(len);
            tiles[band * num_col_bands + bc].segments.push(segment);
            rest = tail;
        }
    }

    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_layout_table() -> Result<(), ParallelError> {
        assert_eq!(block_layout(1)?, (1, 1));
        assert_eq!(block_layout(4)?, (2, 2));
        assert_eq!(block_layout(8)?, (2, 4));
        assert_eq!(block_layout(16)?, (4, 4));
        assert_eq!(block_layout(32)?, (2, 16));
        assert_eq!(block_layout(64)?, (8, 8));
        assert_eq!(block_layout(2)?, (2, 1));
        assert_eq!(block_layout(18)?, (2, 9));
        Ok(())
    }

    #[test]
    fn test_block_layout_degenerate() -> Result<(), ParallelError> {
        // 6 -> 3 -> 1: fewer blocks than requested
        assert_eq!(block_layout(6)?, (3, 1));
        // 5 -> 2 -> 0: the column count is kept at one
        assert_eq!(block_layout(5)?, (3, 1));
        assert_eq!(block_layout(0), Err(ParallelError::InvalidBlockCount(0)));
        Ok(())
    }

    #[test]
    fn test_perfect_square() {
        assert!(is_perfect_square(0));
        assert!(is_perfect_square(1));
        assert!(is_perfect_square(49));
        assert!(!is_perfect_square(2));
        assert!(!is_perfect_square(50));
    }

    #[test]
    fn test_block_grid_cuts() -> Result<(), ParallelError> {
        let grid = BlockGrid::new(8, [20, 11].into())?;
        assert_eq!(
            grid,
            BlockGrid {
                num_rows: 2,
                num_cols: 4,
                row_height: 5,
                col_width: 5,
            }
        );
        assert_eq!(grid.row_cuts(1..10), vec![1, 6, 10]);
        assert_eq!(grid.col_cuts(1..19), vec![1, 6, 11, 16, 19]);
        Ok(())
    }

    #[test]
    fn test_block_grid_more_blocks_than_pixels() -> Result<(), ParallelError> {
        let grid = BlockGrid::new(64, [3, 3].into())?;
        assert_eq!(grid.row_height, 0);
        assert_eq!(grid.row_cuts(1..2), vec![1, 2]);
        assert_eq!(grid.col_cuts(1..2), vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_block_layout_huge_counts() -> Result<(), ParallelError> {
        let (num_rows, num_cols) = block_layout(usize::MAX)?;
        assert!(num_rows >= 2 && num_cols >= 1);
        assert!(!is_perfect_square(usize::MAX));
        Ok(())
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_block_grid_huge_count_small_image() -> Result<(), ParallelError> {
        let grid = BlockGrid::new(10_000_000_000, [64, 48].into())?;
        assert_eq!((grid.num_rows, grid.num_cols), (100_000, 100_000));

        let row_cuts = grid.row_cuts(1..47);
        let col_cuts = grid.col_cuts(1..63);
        assert_eq!(row_cuts, vec![1, 47]);
        assert_eq!(col_cuts, vec![1, 63]);

        let mut data = vec![0u8; 64 * 48];
        let tiles = split_tiles(&mut data, 64, &row_cuts, &col_cuts);
        assert_eq!(tiles.len(), 1);

        // 2^63 -> 2 x 2^62
        let grid = BlockGrid::new(1 << 63, [64, 48].into())?;
        assert_eq!(grid.num_rows, 2);
        assert_eq!(grid.row_cuts(1..47), vec![1, 25, 47]);
        assert_eq!(grid.col_cuts(1..63), vec![1, 63]);
        Ok(())
    }

    #[test]
    fn test_band_cuts_collapse_empty_bands() {
        assert_eq!(band_cuts(1..4, 8, 1), vec![1, 2, 3, 4]);
        assert_eq!(band_cuts(1..10, 3, 5), vec![1, 6, 10]);
        assert_eq!(band_cuts(2..2, 4, 1), vec![2]);
    }

    #[test]
    fn test_chunk_cuts() {
        assert_eq!(chunk_cuts(1..9, 3), vec![1, 4, 7, 9]);
        assert_eq!(chunk_cuts(1..7, 3), vec![1, 4, 7]);
        assert_eq!(chunk_cuts(1..2, 16), vec![1, 2]);
    }

    #[test]
    fn test_split_tiles_disjoint_cover() {
        let (width, height) = (7, 6);
        let mut data = vec![0usize; width * height];
        let row_cuts = [1, 3, 5];
        let col_cuts = [1, 2, 4, 6];

        let mut tiles = split_tiles(&mut data, width, &row_cuts, &col_cuts);
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles[4].rows(), 3..5);
        assert_eq!(tiles[4].cols(), 2..4);

        for (id, tile) in tiles.iter_mut().enumerate() {
            tile.for_each_mut(Traversal::ColumnMajor, |_, _, px| *px += id + 1);
        }

        for row in 0..height {
            for col in 0..width {
                let val = data[row * width + col];
                if (1..5).contains(&row) && (1..6).contains(&col) {
                    let br = if row < 3 { 0 } else { 1 };
                    let bc = if col < 2 {
                        0
                    } else if col < 4 {
                        1
                    } else {
                        2
                    };
                    assert_eq!(val, br * 3 + bc + 1);
                } else {
                    assert_eq!(val, 0);
                }
            }
        }
    }

    #[test]
    fn test_tile_traversal_order() {
        let width = 4;
        let mut data = vec![0u8; 12];
        let mut tiles = split_tiles(&mut data, width, &[0, 3], &[1, 3]);

        let mut visited = Vec::new();
        tiles[0].for_each_mut(Traversal::ColumnMajor, |row, col, _| visited.push((row, col)));
        assert_eq!(
            visited,
            vec![(0, 1), (1, 1), (2, 1), (0, 2), (1, 2), (2, 2)]
        );

        visited.clear();
        tiles[0].for_each_mut(Traversal::RowMajor, |row, col, _| visited.push((row, col)));
        assert_eq!(
            visited,
            vec![(0, 1), (0, 2), (1, 1), (1, 2), (2, 1), (2, 2)]
        );
    }
}
