use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A bad combination of rows, columns and workers, caught before any generation runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("the grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("{len} cells do not make a {rows}x{cols} grid")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },

    #[error("at least one worker is required")]
    NoWorkers,

    #[error("{workers} workers cannot share {rows} rows: every worker needs at least one row")]
    TooManyWorkers { workers: usize, rows: usize },

    #[error("the partition plan was made for {planned} workers but {actual} are running")]
    WorkerCountMismatch { planned: usize, actual: usize },

    #[error("the probability {0} is outside [0, 1]")]
    Probability(f64),

    #[error("the random seed must not be 0")]
    ZeroSeed,

    #[error("the flat world is only supported with a single worker (got {0})")]
    FlatWorldDistributed(usize),

    #[error("the flat world is only supported with the threads backend")]
    FlatWorldOverMpi,

    #[error("the grid shape can only be read from the input file with the threads backend")]
    InferredShapeOverMpi,

    #[error("--infer-shape needs an input file")]
    InferredShapeWithoutInput,

    #[error("the {0} backend is not compiled in, rebuild with --features={0}")]
    BackendUnavailable(&'static str),
}

/// Failures of the scatter, gather and border exchange steps. All of them are fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("rank {peer} went away")]
    Disconnected { peer: usize },

    #[error("rank {rank} moved {actual} bytes, the plan says {expected}")]
    SizeMismatch {
        rank: usize,
        expected: usize,
        actual: usize,
    },

    #[error("border row from rank {peer} has {actual} columns, expected {expected}")]
    BorderLength {
        peer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("the partition plan covers {planned} workers but {actual} are connected")]
    PlanMismatch { planned: usize, actual: usize },

    #[error("the coordinator has no grid to scatter into or gather from")]
    MissingGrid,

    #[error("{0} bytes do not fit in a message count")]
    CountOverflow(usize),
}

#[derive(Debug, Error)]
pub enum GridFileError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: `{token}` is not a cell value (expected 0 or 1)")]
    BadToken { line: usize, token: String },

    #[error("expected {expected} cells but the file holds {found}")]
    CellCount { expected: usize, found: usize },

    #[error("line {line} has {found} cells, the first row has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("the file holds no cells")]
    Empty,
}

/// Why a single-cell edit was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    #[error("the game is running, pause it to edit")]
    Running,

    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfBounds { row: usize, col: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    GridFile(#[from] GridFileError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
