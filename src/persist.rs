//! Plain text grid files: one line per row, cells as whitespace-separated `0`/`1`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::GridFileError;
use crate::grid::Grid;

pub fn write_grid<W: Write>(grid: &Grid, writer: &mut W) -> std::io::Result<()> {
    let mut line = String::with_capacity(grid.cols() * 2);
    for row in 0..grid.rows() {
        line.clear();
        for (col, cell) in grid.row(row).iter().enumerate() {
            if col > 0 {
                line.push(' ');
            }
            line.push(if *cell == 0 { '0' } else { '1' });
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }
    writer.flush()
}

pub fn save(path: &Path, grid: &Grid) -> Result<(), GridFileError> {
    let io_error = |source| GridFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    write_grid(grid, &mut writer).map_err(io_error)
}

/// Reads `rows * cols` cells in row-major order. Line breaks are not
/// significant, only the number of values is.
pub fn read_grid<R: Read>(reader: R, rows: usize, cols: usize) -> Result<Grid, GridFileError> {
    let expected = rows * cols;
    let mut cells = Vec::with_capacity(expected);

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|source| GridFileError::Io {
            path: Default::default(),
            source,
        })?;
        for token in line.split_whitespace() {
            cells.push(parse_cell(index + 1, token)?);
        }
        if cells.len() > expected {
            break;
        }
    }

    if cells.len() != expected {
        return Err(GridFileError::CellCount {
            expected,
            found: cells.len(),
        });
    }
    Grid::from_cells(rows, cols, cells).map_err(|_| GridFileError::Empty)
}

/// Reads a grid whose shape comes from the file itself: every non-blank line is
/// a row and all rows must be the same length.
pub fn read_grid_inferred<R: Read>(reader: R) -> Result<Grid, GridFileError> {
    let mut cells = Vec::new();
    let mut rows = 0;
    let mut cols = 0;

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|source| GridFileError::Io {
            path: Default::default(),
            source,
        })?;
        let before = cells.len();
        for token in line.split_whitespace() {
            cells.push(parse_cell(index + 1, token)?);
        }
        let width = cells.len() - before;
        if width == 0 {
            continue;
        }
        if rows == 0 {
            cols = width;
        } else if width != cols {
            return Err(GridFileError::RaggedRow {
                line: index + 1,
                expected: cols,
                found: width,
            });
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(GridFileError::Empty);
    }
    Grid::from_cells(rows, cols, cells).map_err(|_| GridFileError::Empty)
}

pub fn load(path: &Path, rows: usize, cols: usize) -> Result<Grid, GridFileError> {
    let file = File::open(path).map_err(|source| GridFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_grid(file, rows, cols).map_err(|error| with_path(error, path))
}

pub fn load_inferred(path: &Path) -> Result<Grid, GridFileError> {
    let file = File::open(path).map_err(|source| GridFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_grid_inferred(file).map_err(|error| with_path(error, path))
}

fn with_path(error: GridFileError, path: &Path) -> GridFileError {
    match error {
        GridFileError::Io { source, .. } => GridFileError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

fn parse_cell(line: usize, token: &str) -> Result<u8, GridFileError> {
    match token {
        "0" => Ok(0),
        "1" => Ok(1),
        _ => Err(GridFileError::BadToken {
            line,
            token: token.to_string(),
        }),
    }
}
