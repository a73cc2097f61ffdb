//! MPI transport: one rank per process, launched with `mpirun -n <workers>`.
//!
//! Scatter and gather are the varcount collectives, driven by the byte counts
//! and displacements of the partition plan. The border exchange posts both
//! receives and both sends as immediate requests inside a request scope, runs
//! the interior computation, then waits on all four.

use std::time::Duration;

use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::{Rank, SystemCommunicator};
use mpi::traits::*;

use super::{check_border, check_len, check_plan, Flow, Inbound, Outbound, Tag, Transport, COORDINATOR};
use crate::error::TransportError;
use crate::partition::PartitionPlan;

pub struct MpiTransport {
    world: SystemCommunicator,
    rank: usize,
    size: usize,
}

impl MpiTransport {
    pub fn new(world: SystemCommunicator) -> MpiTransport {
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        MpiTransport { world, rank, size }
    }

    /// The run time of the slowest rank, known on the coordinator only.
    pub fn slowest(&self, elapsed: Duration) -> Option<Duration> {
        let root = self.world.process_at_rank(COORDINATOR as Rank);
        let local = elapsed.as_secs_f64();
        if self.rank == COORDINATOR {
            let mut slowest = 0.0f64;
            root.reduce_into_root(&local, &mut slowest, SystemOperation::max());
            Some(Duration::from_secs_f64(slowest))
        } else {
            root.reduce_into(&local, SystemOperation::max());
            None
        }
    }

    /// Takes the whole run down, every rank included.
    pub fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn scatter(&self, plan: &PartitionPlan, grid: Option<&[u8]>) -> Result<Vec<u8>, TransportError> {
        check_plan(plan, self.size)?;
        let root = self.world.process_at_rank(COORDINATOR as Rank);
        let mut band = vec![0u8; plan.byte_len(self.rank)];

        if self.rank == COORDINATOR {
            let grid = grid.ok_or(TransportError::MissingGrid)?;
            check_len(COORDINATOR, plan.total_bytes(), grid.len())?;
            let counts = plan.send_counts()?;
            let displacements = plan.displacements()?;
            let partition = Partition::new(grid, &counts[..], &displacements[..]);
            root.scatter_varcount_into_root(&partition, &mut band[..]);
        } else {
            root.scatter_varcount_into(&mut band[..]);
        }

        log::trace!("[{}] scattered {} bytes", self.rank, band.len());
        Ok(band)
    }

    fn gather(
        &self,
        plan: &PartitionPlan,
        band: &[u8],
        grid: Option<&mut [u8]>,
    ) -> Result<(), TransportError> {
        check_plan(plan, self.size)?;
        // A wrong-sized contribution would truncate inside the collective, so
        // it is caught here before anything moves.
        check_len(self.rank, plan.byte_len(self.rank), band.len())?;
        let root = self.world.process_at_rank(COORDINATOR as Rank);

        if self.rank == COORDINATOR {
            let grid = grid.ok_or(TransportError::MissingGrid)?;
            check_len(COORDINATOR, plan.total_bytes(), grid.len())?;
            let counts = plan.send_counts()?;
            let displacements = plan.displacements()?;
            let mut partition = PartitionMut::new(grid, &counts[..], &displacements[..]);
            root.gather_varcount_into_root(band, &mut partition);
        } else {
            root.gather_varcount_into(band);
        }
        Ok(())
    }

    fn exchange<R, F>(&self, outbound: Outbound<'_>, overlap: F) -> Result<(Inbound, R), TransportError>
    where
        F: FnOnce() -> R,
    {
        let cols = outbound.first_row.len();
        let mut from_upper = vec![0u8; cols];
        let mut from_lower = vec![0u8; cols];

        let upper = self.world.process_at_rank(outbound.upper as Rank);
        let lower = self.world.process_at_rank(outbound.lower as Rank);

        let (result, upper_count, lower_count) = mpi::request::scope(|scope| {
            let receive_upper =
                upper.immediate_receive_into_with_tag(scope, &mut from_upper[..], Tag::LastRow as i32);
            let receive_lower =
                lower.immediate_receive_into_with_tag(scope, &mut from_lower[..], Tag::FirstRow as i32);
            let send_upper = upper.immediate_send_with_tag(scope, outbound.first_row, Tag::FirstRow as i32);
            let send_lower = lower.immediate_send_with_tag(scope, outbound.last_row, Tag::LastRow as i32);

            // Interior rows are computed while the border rows are on the wire.
            let result = overlap();

            send_upper.wait_without_status();
            send_lower.wait_without_status();
            let upper_status = receive_upper.wait();
            let lower_status = receive_lower.wait();
            (
                result,
                upper_status.count(u8::equivalent_datatype()),
                lower_status.count(u8::equivalent_datatype()),
            )
        });

        check_border(outbound.upper, cols, upper_count as usize)?;
        check_border(outbound.lower, cols, lower_count as usize)?;
        log::trace!(
            "[{}] border rows in from {} and {}",
            self.rank,
            outbound.upper,
            outbound.lower
        );

        Ok((
            Inbound {
                from_upper,
                from_lower,
            },
            result,
        ))
    }

    fn broadcast_flow(&self, flow: Option<Flow>) -> Result<Flow, TransportError> {
        let root = self.world.process_at_rank(COORDINATOR as Rank);
        let mut byte = flow.unwrap_or(Flow::Stop).to_byte();
        root.broadcast_into(&mut byte);
        Ok(Flow::from_byte(byte))
    }

    fn barrier(&self) -> Result<(), TransportError> {
        self.world.barrier();
        Ok(())
    }
}
