//! The authoritative cell matrix held by the coordinator, and the row bands handed to workers.

use crate::error::{ConfigError, EditError};

pub const DEAD: u8 = 0;
pub const ALIVE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cell {
    Dead = DEAD,
    Alive = ALIVE,
}

impl Cell {
    /// Any non-zero byte counts as alive.
    pub fn from_byte(byte: u8) -> Cell {
        if byte == DEAD {
            Cell::Dead
        } else {
            Cell::Alive
        }
    }

    pub fn is_alive(self) -> bool {
        self == Cell::Alive
    }

    pub fn flipped(self) -> Cell {
        match self {
            Cell::Alive => Cell::Dead,
            Cell::Dead => Cell::Alive,
        }
    }
}

/// Whether the grid accepts single-cell edits. Stepping ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Running,
    Paused,
}

/// A `rows x cols` toroidal board, one byte per cell, flattened row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
    mode: Mode,
}

impl Grid {
    /// An all-dead grid in the running mode.
    pub fn new(rows: usize, cols: usize) -> Result<Grid, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        Ok(Grid {
            rows,
            cols,
            cells: vec![DEAD; rows * cols],
            mode: Mode::Running,
        })
    }

    /// Wraps an existing row-major buffer. Non-zero bytes are stored as `ALIVE`.
    pub fn from_cells(rows: usize, cols: usize, mut cells: Vec<u8>) -> Result<Grid, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        if cells.len() != rows * cols {
            return Err(ConfigError::ShapeMismatch {
                rows,
                cols,
                len: cells.len(),
            });
        }
        for cell in cells.iter_mut() {
            *cell = Cell::from_byte(*cell) as u8;
        }
        Ok(Grid {
            rows,
            cols,
            cells,
            mode: Mode::Running,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(Cell::from_byte(self.cells[row * self.cols + col]))
    }

    /// Direct write used by loaders and initializers. Ignores the mode.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), EditError> {
        if row >= self.rows || col >= self.cols {
            return Err(EditError::OutOfBounds { row, col });
        }
        self.cells[row * self.cols + col] = cell as u8;
        Ok(())
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == ALIVE).count()
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = DEAD);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn pause(&mut self) {
        self.mode = Mode::Paused;
    }

    pub fn resume(&mut self) {
        self.mode = Mode::Running;
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::Running => Mode::Paused,
            Mode::Paused => Mode::Running,
        };
        self.mode
    }

    /// Flips one cell, but only while paused. Returns the new state of the cell.
    pub fn toggle_cell(&mut self, row: usize, col: usize) -> Result<Cell, EditError> {
        let current = self.get(row, col).ok_or(EditError::OutOfBounds { row, col })?;
        if self.mode == Mode::Running {
            log::warn!("game is running, pause it to edit cell ({}, {})", row, col);
            return Err(EditError::Running);
        }
        let next = current.flipped();
        self.cells[row * self.cols + col] = next as u8;
        log::info!("cell ({}, {}) set to {:?}", row, col, next);
        Ok(next)
    }
}

/// One worker's private copy of a contiguous run of grid rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    cols: usize,
    cells: Vec<u8>,
}

impl Band {
    /// `cells.len()` must be a non-zero multiple of `cols`.
    pub fn new(cols: usize, cells: Vec<u8>) -> Band {
        debug_assert!(cols > 0 && !cells.is_empty() && cells.len() % cols == 0);
        Band { cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.cells.len() / self.cols
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_shapes() {
        assert_eq!(Grid::new(0, 4), Err(ConfigError::EmptyGrid { rows: 0, cols: 4 }));
        assert!(Grid::from_cells(2, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn from_cells_normalizes_bytes() {
        let grid = Grid::from_cells(1, 3, vec![0, 7, 1]).unwrap();
        assert_eq!(grid.cells(), &[DEAD, ALIVE, ALIVE]);
        assert_eq!(grid.population(), 2);
    }

    #[test]
    fn toggle_only_while_paused() {
        let mut grid = Grid::new(3, 3).unwrap();
        assert_eq!(grid.toggle_cell(1, 1), Err(EditError::Running));
        assert_eq!(grid.get(1, 1), Some(Cell::Dead));

        grid.pause();
        assert_eq!(grid.toggle_cell(1, 1), Ok(Cell::Alive));
        assert_eq!(grid.toggle_cell(1, 1), Ok(Cell::Dead));
        assert_eq!(grid.toggle_cell(3, 0), Err(EditError::OutOfBounds { row: 3, col: 0 }));

        assert_eq!(grid.toggle_mode(), Mode::Running);
    }

    #[test]
    fn set_checks_bounds() {
        let mut grid = Grid::new(2, 3).unwrap();
        assert_eq!(grid.set(1, 2, Cell::Alive), Ok(()));
        assert_eq!(grid.get(1, 2), Some(Cell::Alive));
        assert_eq!(grid.set(2, 0, Cell::Alive), Err(EditError::OutOfBounds { row: 2, col: 0 }));
        assert_eq!(grid.set(0, 3, Cell::Alive), Err(EditError::OutOfBounds { row: 0, col: 3 }));
        assert_eq!(grid.population(), 1);
    }

    #[test]
    fn clear_kills_everything() {
        let mut grid = Grid::from_cells(2, 2, vec![1, 1, 0, 1]).unwrap();
        grid.clear();
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn band_rows() {
        let band = Band::new(3, vec![0, 1, 0, 1, 1, 1]);
        assert_eq!(band.rows(), 2);
        assert_eq!(band.row(1), &[1, 1, 1]);
    }
}
