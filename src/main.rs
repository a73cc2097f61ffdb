use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::Level;

use game_of_life_rows::config::{Backend, Boundary, CliArgs, Config};
use game_of_life_rows::engine::{run_threads, Flow, LocalEngine};
use game_of_life_rows::grid::Grid;
use game_of_life_rows::persist;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = CliArgs::parse().into_config()?;
    match config.backend {
        Backend::Threads => run_in_process(&config),
        Backend::Mpi => run_mpi(&config),
    }
}

/// Logs the population before each generation when debug output is on.
fn progress(grid: &mut Grid, generation: u64) -> Flow {
    if log::log_enabled!(Level::Debug) {
        log::debug!("[{:05}] population {}", generation, grid.population());
    }
    Flow::Continue
}

fn run_in_process(config: &Config) -> anyhow::Result<()> {
    let mut grid = config.initial_grid()?;
    let config = config.with_shape(grid.rows(), grid.cols())?;
    log::info!(
        "evolving {}x{} grid with {} worker(s), {}",
        config.rows,
        config.cols,
        config.workers,
        match config.generations {
            Some(generations) => format!("{} generations", generations),
            None => "no generation limit".to_string(),
        }
    );

    let summary = if config.boundary == Boundary::Flat {
        LocalEngine::new(Boundary::Flat).run(&mut grid, config.generations, progress)
    } else {
        let plan = config.plan()?;
        run_threads(&mut grid, &plan, config.generations, progress)?
    };
    log::info!(
        "{} generations, {} cells alive, {:.3}s",
        summary.generations,
        grid.population(),
        summary.elapsed.as_secs_f64()
    );

    finish(&config, &grid, summary.elapsed)
}

/// Saves the final grid and records the run time. Coordinator only.
fn finish(config: &Config, grid: &Grid, elapsed: Duration) -> anyhow::Result<()> {
    if let Some(output) = &config.output {
        log::info!("writing grid to {}", output.display());
        persist::save(output, grid)?;
    }
    if let Some(timing) = &config.timing {
        append_timing(timing, elapsed)
            .with_context(|| format!("could not record timing in {}", timing.display()))?;
    }
    Ok(())
}

fn append_timing(path: &Path, elapsed: Duration) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", elapsed.as_secs_f64())?;
    file.flush()
}

#[cfg(feature = "mpi")]
fn run_mpi(config: &Config) -> anyhow::Result<()> {
    use game_of_life_rows::engine::Worker;
    use game_of_life_rows::transport::mpi::MpiTransport;
    use game_of_life_rows::transport::Transport;

    let universe = mpi::initialize().context("MPI was already initialized")?;
    let transport = MpiTransport::new(universe.world());
    let rank = transport.rank();

    // Every rank checks the same configuration, so a bad one stops them all
    // before the first collective.
    let config = config.with_workers(transport.size());
    if let Err(error) = config.validate() {
        if rank == 0 {
            log::error!("{}", error);
        }
        transport.abort(1);
    }
    let plan = match config.plan() {
        Ok(plan) => plan,
        Err(error) => {
            log::error!("{}", error);
            transport.abort(1);
        }
    };

    let mut grid = if transport.is_coordinator() {
        match config.initial_grid() {
            Ok(grid) => Some(grid),
            Err(error) => {
                log::error!("{}", error);
                transport.abort(1);
            }
        }
    } else {
        None
    };

    let worker = Worker::new(transport, plan)?;
    let summary = match worker.run(grid.as_mut(), config.generations, progress) {
        Ok(summary) => summary,
        Err(error) => {
            log::error!("[{}] {}", rank, error);
            worker.transport().abort(1);
        }
    };

    let slowest = worker.transport().slowest(summary.elapsed);
    if let (Some(grid), Some(elapsed)) = (&grid, slowest) {
        log::info!(
            "{} generations on {} ranks, {} cells alive, {:.3}s",
            summary.generations,
            config.workers,
            grid.population(),
            elapsed.as_secs_f64()
        );
        finish(&config, grid, elapsed)?;
    }
    Ok(())
}

#[cfg(not(feature = "mpi"))]
fn run_mpi(_config: &Config) -> anyhow::Result<()> {
    Err(game_of_life_rows::error::ConfigError::BackendUnavailable("mpi").into())
}
