//! Conway's Game of Life on a torus, split into row bands across cooperating
//! workers that swap border rows around a ring.

pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod neighbors;
pub mod partition;
pub mod persist;
pub mod random;
pub mod ring;
pub mod rules;
pub mod transport;

pub use config::{Backend, Boundary, Config};
pub use engine::{run_threads, Flow, LocalEngine, RunSummary, Worker};
pub use error::{Error, Result};
pub use grid::{Band, Cell, Grid, Mode};
pub use partition::{PartitionPlan, Span};
pub use ring::Ring;
