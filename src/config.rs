use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{ConfigError, Error};
use crate::grid::Grid;
use crate::partition::PartitionPlan;
use crate::{persist, random};

/// Where the workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// One thread per worker in this process.
    #[default]
    Threads,
    /// One MPI rank per worker.
    Mpi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    #[default]
    Toroidal,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomInit {
    pub probability: f64,
    pub seed: i32,
}

impl Default for RandomInit {
    fn default() -> Self {
        RandomInit {
            probability: 0.20,
            seed: 123_456_789,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitialGrid {
    Random(RandomInit),
    /// Load from a file, falling back to random cells if `fallback` is set and
    /// the file cannot be read. With `infer_shape` the file decides the rows and
    /// columns instead of the configuration.
    File {
        path: PathBuf,
        fallback: Option<RandomInit>,
        infer_shape: bool,
    },
}

/// A checked run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rows: usize,
    pub cols: usize,
    pub workers: usize,
    pub generations: Option<u64>,
    pub boundary: Boundary,
    pub backend: Backend,
    pub initial: InitialGrid,
    pub output: Option<PathBuf>,
    pub timing: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rows: 4000,
            cols: 4000,
            workers: 1,
            generations: None,
            boundary: Boundary::Toroidal,
            backend: Backend::Threads,
            initial: InitialGrid::Random(RandomInit::default()),
            output: None,
            timing: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan()?;
        if self.boundary == Boundary::Flat {
            if self.workers > 1 {
                return Err(ConfigError::FlatWorldDistributed(self.workers));
            }
            // The ranks only know how to count on the torus.
            if self.backend == Backend::Mpi {
                return Err(ConfigError::FlatWorldOverMpi);
            }
        }
        let random = match &self.initial {
            InitialGrid::Random(random) => Some(random),
            InitialGrid::File {
                fallback, infer_shape, ..
            } => {
                if *infer_shape && self.backend == Backend::Mpi {
                    return Err(ConfigError::InferredShapeOverMpi);
                }
                fallback.as_ref()
            }
        };
        if let Some(random) = random {
            if !(0.0..=1.0).contains(&random.probability) {
                return Err(ConfigError::Probability(random.probability));
            }
            if random.seed == 0 {
                return Err(ConfigError::ZeroSeed);
            }
        }
        Ok(())
    }

    pub fn plan(&self) -> Result<PartitionPlan, ConfigError> {
        PartitionPlan::new(self.rows, self.cols, self.workers)
    }

    /// Builds the starting grid: from the input file, or from the seeded
    /// generator, or from the generator after the file failed to load when a
    /// fallback is configured.
    pub fn initial_grid(&self) -> Result<Grid, Error> {
        match &self.initial {
            InitialGrid::Random(init) => self.random_grid(*init),
            InitialGrid::File {
                path,
                fallback,
                infer_shape,
            } => match self.load(path, *infer_shape) {
                Ok(grid) => {
                    log::info!("loaded {}x{} grid from {}", grid.rows(), grid.cols(), path.display());
                    Ok(grid)
                }
                Err(error) => match fallback {
                    Some(init) => {
                        log::warn!("{}; starting from a random grid instead", error);
                        self.random_grid(*init)
                    }
                    None => Err(error.into()),
                },
            },
        }
    }

    fn load(&self, path: &std::path::Path, infer_shape: bool) -> Result<Grid, crate::error::GridFileError> {
        if infer_shape {
            persist::load_inferred(path)
        } else {
            persist::load(path, self.rows, self.cols)
        }
    }

    fn random_grid(&self, init: RandomInit) -> Result<Grid, Error> {
        let mut grid = Grid::new(self.rows, self.cols)?;
        let mut seed = init.seed;
        random::populate(&mut grid, init.probability, &mut seed);
        log::info!(
            "seeded {}x{} grid with p = {} ({} alive)",
            self.rows,
            self.cols,
            init.probability,
            grid.population()
        );
        Ok(grid)
    }

    /// The same configuration sized for `workers` workers, used when the
    /// communicator decides how many there are.
    pub fn with_workers(&self, workers: usize) -> Config {
        Config {
            workers,
            ..self.clone()
        }
    }

    /// The same configuration resized to a grid that was read with an
    /// inferred shape. Checked again, since the worker count may no longer fit.
    pub fn with_shape(&self, rows: usize, cols: usize) -> Result<Config, ConfigError> {
        let config = Config {
            rows,
            cols,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Evolves a toroidal Game of Life grid across cooperating workers, each one
/// owning a band of rows.
#[derive(Debug, Parser)]
#[command(name = "game_of_life_rows", version)]
pub struct CliArgs {
    /// Number of grid rows
    #[arg(short = 'r', long, env = "LIFE_ROWS", default_value_t = 4000)]
    pub rows: usize,

    /// Number of grid columns
    #[arg(short = 'w', long, env = "LIFE_COLS", default_value_t = 4000)]
    pub cols: usize,

    /// Number of workers (threads backend; MPI uses the communicator size)
    #[arg(short = 'n', long, env = "LIFE_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Stop after this many generations (runs forever when absent)
    #[arg(short = 'e', long)]
    pub generations: Option<u64>,

    /// Read the initial grid from this file
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Write the final grid to this file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Probability of a cell starting alive when no input file is given
    #[arg(long, default_value_t = 0.20)]
    pub probability: f64,

    /// Seed for the random initial grid
    #[arg(long, default_value_t = 123_456_789)]
    pub seed: i32,

    /// Use a random grid if the input file cannot be loaded
    #[arg(long)]
    pub fallback_random: bool,

    /// Take the rows and columns from the input file
    #[arg(long)]
    pub infer_shape: bool,

    /// Cells past the edges are dead instead of wrapping around (single worker only)
    #[arg(long)]
    pub flat: bool,

    #[arg(long, value_enum, default_value_t = Backend::Threads)]
    pub backend: Backend,

    /// Append the elapsed seconds of the run to this file
    #[arg(long)]
    pub timing: Option<PathBuf>,
}

impl CliArgs {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        if self.infer_shape && self.input.is_none() {
            return Err(ConfigError::InferredShapeWithoutInput);
        }
        let random = RandomInit {
            probability: self.probability,
            seed: self.seed,
        };
        let initial = match self.input {
            Some(path) => InitialGrid::File {
                path,
                fallback: self.fallback_random.then_some(random),
                infer_shape: self.infer_shape,
            },
            None => InitialGrid::Random(random),
        };
        let config = Config {
            rows: self.rows,
            cols: self.cols,
            workers: self.workers,
            generations: self.generations,
            boundary: if self.flat { Boundary::Flat } else { Boundary::Toroidal },
            backend: self.backend,
            initial,
            output: self.output,
            timing: self.timing,
        };
        config.validate()?;
        Ok(config)
    }
}
