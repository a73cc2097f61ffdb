//! The generation loop: scatter, exchange and count, apply the rule, gather,
//! barrier, repeat.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::Boundary;
use crate::error::{ConfigError, Error, TransportError};
use crate::exchange;
use crate::grid::{Band, Grid};
use crate::neighbors::{count_neighbors_flat, count_neighbors_toroidal};
use crate::partition::PartitionPlan;
use crate::ring::Ring;
use crate::rules;
use crate::transport::channel::{mesh, ChannelTransport};
use crate::transport::Transport;

pub use crate::transport::Flow;

/// What a finished run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub generations: u64,
    pub elapsed: Duration,
    /// Live cells at the end, known only on the coordinator.
    pub population: Option<usize>,
}

/// One rank's view of the run: its transport, the shared partition plan and its
/// place in the ring.
pub struct Worker<T: Transport> {
    transport: T,
    plan: PartitionPlan,
    ring: Ring,
}

impl<T: Transport> Worker<T> {
    pub fn new(transport: T, plan: PartitionPlan) -> Result<Worker<T>, ConfigError> {
        if plan.workers() != transport.size() {
            return Err(ConfigError::WorkerCountMismatch {
                planned: plan.workers(),
                actual: transport.size(),
            });
        }
        let ring = Ring::new(plan.workers())?;
        Ok(Worker {
            transport,
            plan,
            ring,
        })
    }

    pub fn rank(&self) -> usize {
        self.transport.rank()
    }

    pub fn plan(&self) -> &PartitionPlan {
        &self.plan
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One generation. The coordinator passes the grid, everyone else `None`.
    pub fn step(&self, grid: Option<&mut Grid>) -> Result<(), TransportError> {
        let mut grid = grid;
        if self.transport.is_coordinator() && grid.is_none() {
            return Err(TransportError::MissingGrid);
        }

        let cells = self.transport.scatter(&self.plan, grid.as_deref().map(Grid::cells))?;
        let mut band = Band::new(self.plan.cols(), cells);

        let counts = exchange::count_neighbors(&self.transport, self.ring, &band)?;
        rules::evolve(band.cells_mut(), counts.as_slice());

        self.transport
            .gather(&self.plan, band.cells(), grid.as_deref_mut().map(Grid::cells_mut))?;
        self.transport.barrier()
    }

    /// Steps until the budget runs out or `hook` says stop.
    ///
    /// `hook` runs on the coordinator before every generation with the grid as
    /// it stands and the number of generations done so far; this is where a
    /// front end can show the grid, edit it while paused or ask to quit. Its
    /// answer reaches every rank so they all leave in the same generation.
    pub fn run<H>(&self, grid: Option<&mut Grid>, budget: Option<u64>, mut hook: H) -> Result<RunSummary, Error>
    where
        H: FnMut(&mut Grid, u64) -> Flow,
    {
        let mut grid = grid;
        let start = Instant::now();
        let mut generation = 0;

        loop {
            let decision = match grid.as_deref_mut() {
                Some(grid) if self.transport.is_coordinator() => {
                    if budget.map_or(false, |budget| generation >= budget) {
                        Some(Flow::Stop)
                    } else {
                        Some(hook(grid, generation))
                    }
                }
                _ => None,
            };
            if self.transport.broadcast_flow(decision)? == Flow::Stop {
                break;
            }

            self.step(grid.as_deref_mut())?;
            generation += 1;
            log::debug!("[{}] generation {} done", self.rank(), generation);
        }

        let summary = RunSummary {
            generations: generation,
            elapsed: start.elapsed(),
            population: grid.as_deref().map(Grid::population),
        };
        if self.transport.is_coordinator() {
            log::info!(
                "finished {} generations in {:.3}s",
                summary.generations,
                summary.elapsed.as_secs_f64()
            );
        }
        Ok(summary)
    }
}

/// Runs `plan.workers()` workers as threads of this process and evolves `grid`
/// in place. The first error any worker hits ends the whole run.
pub fn run_threads<H>(grid: &mut Grid, plan: &PartitionPlan, budget: Option<u64>, hook: H) -> Result<RunSummary, Error>
where
    H: FnMut(&mut Grid, u64) -> Flow,
{
    if plan.rows() != grid.rows() || plan.cols() != grid.cols() {
        return Err(ConfigError::ShapeMismatch {
            rows: plan.rows(),
            cols: plan.cols(),
            len: grid.cells().len(),
        }
        .into());
    }

    let mut endpoints = mesh(plan.workers()).into_iter();
    let coordinator = endpoints.next().ok_or(ConfigError::NoWorkers)?;
    let workers: Vec<Worker<ChannelTransport>> = endpoints
        .map(|endpoint| Worker::new(endpoint, plan.clone()))
        .collect::<Result<_, _>>()?;
    let coordinator = Worker::new(coordinator, plan.clone())?;

    thread::scope(|scope| {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| {
                thread::Builder::new()
                    .name(format!("worker-{}", worker.rank()))
                    .spawn_scoped(scope, move || worker.run(None, budget, |_, _| Flow::Continue))
            })
            .collect();

        // The coordinator works on the calling thread. When it fails its
        // endpoint is dropped, and every peer waiting on it sees a disconnect.
        let outcome = coordinator.run(Some(grid), budget, hook);
        drop(coordinator);

        let mut errors = Vec::new();
        for handle in handles {
            match handle {
                Ok(handle) => match handle.join() {
                    Ok(Ok(_)) => {}
                    Ok(Err(error)) => errors.push(error),
                    Err(_) => log::error!("a worker thread panicked"),
                },
                Err(error) => log::error!("could not start a worker thread: {}", error),
            }
        }

        match outcome {
            Ok(summary) => match root_cause(errors) {
                Some(error) => Err(error),
                None => Ok(summary),
            },
            // A disconnect seen by the coordinator is usually the echo of a
            // worker's own failure, so the worker's error is reported instead.
            Err(error) => {
                errors.insert(0, error);
                Err(root_cause(errors).unwrap_or(Error::Transport(TransportError::Disconnected { peer: 0 })))
            }
        }
    })
}

/// Prefers an error that is not just a peer disappearing.
fn root_cause(mut errors: Vec<Error>) -> Option<Error> {
    let position = errors
        .iter()
        .position(|error| !matches!(error, Error::Transport(TransportError::Disconnected { .. })));
    match position {
        Some(position) => Some(errors.swap_remove(position)),
        None => errors.into_iter().next(),
    }
}

/// Evolves a grid without any workers or messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalEngine {
    pub boundary: Boundary,
}

impl LocalEngine {
    pub fn new(boundary: Boundary) -> LocalEngine {
        LocalEngine { boundary }
    }

    pub fn step(&self, grid: &mut Grid) {
        let counts = match self.boundary {
            Boundary::Toroidal => count_neighbors_toroidal(grid),
            Boundary::Flat => count_neighbors_flat(grid),
        };
        rules::evolve(grid.cells_mut(), counts.as_slice());
    }

    pub fn run<H>(&self, grid: &mut Grid, budget: Option<u64>, mut hook: H) -> RunSummary
    where
        H: FnMut(&mut Grid, u64) -> Flow,
    {
        let start = Instant::now();
        let mut generation = 0;
        while budget.map_or(true, |budget| generation < budget) {
            if hook(grid, generation) == Flow::Stop {
                break;
            }
            self.step(grid);
            generation += 1;
            log::debug!("generation {} done", generation);
        }
        RunSummary {
            generations: generation,
            elapsed: start.elapsed(),
            population: Some(grid.population()),
        }
    }
}
