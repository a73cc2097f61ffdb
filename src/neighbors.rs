//! Neighbor counting for bands and whole grids.
//!
//! Every count is assembled from two pieces: the two horizontal neighbors in the
//! cell's own row, and the "border row" of each vertically adjacent row, which
//! for column `c` is the number of live cells at `c - 1`, `c` and `c + 1` of that
//! row. A band can produce border rows for everything it holds; the ones for the
//! rows just outside the band come from the ring neighbors.

use crate::grid::{Band, Grid, DEAD};

#[inline]
fn alive(cell: u8) -> u8 {
    (cell != DEAD) as u8
}

#[inline]
fn left_of(col: usize, cols: usize) -> usize {
    if col == 0 {
        cols - 1
    } else {
        col - 1
    }
}

#[inline]
fn right_of(col: usize, cols: usize) -> usize {
    if col + 1 == cols {
        0
    } else {
        col + 1
    }
}

/// Number of live cells each column of a neighboring row would see in `row`,
/// with the columns wrapping around.
pub fn border_row(row: &[u8]) -> Vec<u8> {
    let cols = row.len();
    (0..cols)
        .map(|col| alive(row[left_of(col, cols)]) + alive(row[col]) + alive(row[right_of(col, cols)]))
        .collect()
}

/// Neighbor counts in the same row-major shape as the band or grid they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborCounts {
    cols: usize,
    counts: Vec<u8>,
}

impl NeighborCounts {
    fn zeroed(rows: usize, cols: usize) -> NeighborCounts {
        NeighborCounts {
            cols,
            counts: vec![0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.counts.len() / self.cols
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.counts[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.cols;
        &self.counts[start..start + self.cols]
    }

    fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let start = row * self.cols;
        &mut self.counts[start..start + self.cols]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.counts
    }

    /// Adds a border row received from a neighbor into `row`.
    pub fn add_border(&mut self, row: usize, border: &[u8]) {
        add_into(self.row_mut(row), border);
    }
}

fn add_into(out: &mut [u8], border: &[u8]) {
    for (count, extra) in out.iter_mut().zip(border) {
        *count += *extra;
    }
}

fn add_sideways(row: &[u8], out: &mut [u8]) {
    let cols = row.len();
    for col in 0..cols {
        out[col] += alive(row[left_of(col, cols)]) + alive(row[right_of(col, cols)]);
    }
}

/// Counts for everything the band can see on its own.
///
/// Interior rows come out complete. The first row is missing the row above the
/// band and the last row is missing the row below it; a one-row band is
/// missing both.
pub fn count_band_partial(band: &Band) -> NeighborCounts {
    let rows = band.rows();
    let cols = band.cols();
    let borders: Vec<Vec<u8>> = (0..rows).map(|row| border_row(band.row(row))).collect();

    let mut counts = NeighborCounts::zeroed(rows, cols);
    for row in 0..rows {
        let out = counts.row_mut(row);
        add_sideways(band.row(row), out);
        if row > 0 {
            add_into(out, &borders[row - 1]);
        }
        if row + 1 < rows {
            add_into(out, &borders[row + 1]);
        }
    }
    counts
}

/// Full counts for a band given the border rows of the row above it
/// (`from_upper`) and the row below it (`from_lower`).
pub fn count_band(band: &Band, from_upper: &[u8], from_lower: &[u8]) -> NeighborCounts {
    let mut counts = count_band_partial(band);
    let last = band.rows() - 1;
    counts.add_border(0, from_upper);
    counts.add_border(last, from_lower);
    counts
}

/// Counts on the torus, computed directly from the whole grid.
pub fn count_neighbors_toroidal(grid: &Grid) -> NeighborCounts {
    let rows = grid.rows();
    let cols = grid.cols();
    let borders: Vec<Vec<u8>> = (0..rows).map(|row| border_row(grid.row(row))).collect();

    let mut counts = NeighborCounts::zeroed(rows, cols);
    for row in 0..rows {
        let above = (row + rows - 1) % rows;
        let below = (row + 1) % rows;
        let out = counts.row_mut(row);
        add_sideways(grid.row(row), out);
        add_into(out, &borders[above]);
        add_into(out, &borders[below]);
    }
    counts
}

/// Counts on a bounded board: everything past an edge is dead.
pub fn count_neighbors_flat(grid: &Grid) -> NeighborCounts {
    let rows = grid.rows();
    let cols = grid.cols();
    let mut counts = NeighborCounts::zeroed(rows, cols);

    for row in 0..rows {
        let first_row = row.saturating_sub(1);
        let last_row = (row + 1).min(rows - 1);
        for col in 0..cols {
            let first_col = col.saturating_sub(1);
            let last_col = (col + 1).min(cols - 1);
            let mut neighbors = 0;
            for r in first_row..=last_row {
                for c in first_col..=last_col {
                    if (r, c) != (row, col) {
                        neighbors += alive(grid.row(r)[c]);
                    }
                }
            }
            counts.counts[row * cols + col] = neighbors;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(rows: usize, cols: usize, live: &[(usize, usize)]) -> Grid {
        let mut cells = vec![0; rows * cols];
        for &(row, col) in live {
            cells[row * cols + col] = 1;
        }
        Grid::from_cells(rows, cols, cells).unwrap()
    }

    #[test]
    fn border_row_wraps_columns() {
        assert_eq!(border_row(&[1, 0, 0, 0, 0]), vec![1, 1, 0, 0, 1]);
        assert_eq!(border_row(&[1, 1, 0, 1]), vec![3, 2, 2, 2]);
    }

    #[test]
    fn corner_cell_reaches_all_eight_wrapped_neighbors() {
        let (rows, cols) = (5, 6);
        let counts = count_neighbors_toroidal(&grid_with(rows, cols, &[(0, 0)]));
        let expected = [
            (0, 1),
            (0, cols - 1),
            (1, 0),
            (1, 1),
            (1, cols - 1),
            (rows - 1, 0),
            (rows - 1, 1),
            (rows - 1, cols - 1),
        ];
        for row in 0..rows {
            for col in 0..cols {
                let want = if expected.contains(&(row, col)) { 1 } else { 0 };
                assert_eq!(counts.get(row, col), want, "cell ({}, {})", row, col);
            }
        }
    }

    #[test]
    fn index_one_is_not_treated_as_an_edge() {
        // A live cell at (1, 1) must only touch the 3x3 block around it.
        let counts = count_neighbors_toroidal(&grid_with(5, 5, &[(1, 1)]));
        assert_eq!(counts.get(0, 0), 1);
        assert_eq!(counts.get(2, 2), 1);
        assert_eq!(counts.get(4, 4), 0);
        assert_eq!(counts.get(1, 4), 0);
        assert_eq!(counts.get(1, 1), 0);
    }

    #[test]
    fn band_with_outer_borders_matches_whole_grid() {
        let grid = grid_with(6, 5, &[(0, 0), (1, 2), (2, 2), (3, 4), (5, 1), (5, 4)]);
        let whole = count_neighbors_toroidal(&grid);

        // Rows 2..5 as a band, with the border rows of grid rows 1 and 5.
        let band = Band::new(5, grid.cells()[2 * 5..5 * 5].to_vec());
        let counts = count_band(&band, &border_row(grid.row(1)), &border_row(grid.row(5)));
        for row in 0..3 {
            assert_eq!(counts.row(row), whole.row(row + 2));
        }
    }

    #[test]
    fn single_row_band_takes_both_borders() {
        let grid = grid_with(3, 4, &[(0, 1), (1, 1), (2, 1)]);
        let whole = count_neighbors_toroidal(&grid);
        let band = Band::new(4, grid.row(1).to_vec());

        let partial = count_band_partial(&band);
        assert_eq!(partial.row(0), &[1, 0, 1, 0]);

        let counts = count_band(&band, &border_row(grid.row(0)), &border_row(grid.row(2)));
        assert_eq!(counts.row(0), whole.row(1));
    }

    #[test]
    fn flat_world_has_no_wrap() {
        let counts = count_neighbors_flat(&grid_with(4, 4, &[(0, 0)]));
        assert_eq!(counts.get(0, 1), 1);
        assert_eq!(counts.get(1, 1), 1);
        assert_eq!(counts.get(3, 3), 0);
        assert_eq!(counts.get(0, 3), 0);
    }
}
