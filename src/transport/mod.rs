//! Message passing between workers.
//!
//! The generation loop and the border exchange only talk to a [`Transport`];
//! whether the peers are threads behind channels or MPI ranks is decided when
//! the transport is built.

use crate::error::TransportError;
use crate::partition::PartitionPlan;

pub mod channel;
#[cfg(feature = "mpi")]
pub mod mpi;

/// The rank that owns the grid and drives scatter, gather and the barrier.
pub const COORDINATOR: usize = 0;

/// Message tags, so a receiver can tell what a message is for even when two
/// kinds arrive from the same peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Tag {
    Scatter = 1,
    Gather = 2,
    /// The border row of a band's first row, sent to the upper neighbor.
    FirstRow = 10,
    /// The border row of a band's last row, sent to the lower neighbor.
    LastRow = 11,
    Control = 20,
    Barrier = 30,
    Release = 31,
}

/// What the coordinator decides before each generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn to_byte(self) -> u8 {
        match self {
            Flow::Continue => 1,
            Flow::Stop => 0,
        }
    }

    pub fn from_byte(byte: u8) -> Flow {
        if byte == 0 {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// The two border rows a worker sends out each generation.
#[derive(Debug, Clone, Copy)]
pub struct Outbound<'a> {
    pub upper: usize,
    pub lower: usize,
    /// Goes to `upper`, tagged [`Tag::FirstRow`].
    pub first_row: &'a [u8],
    /// Goes to `lower`, tagged [`Tag::LastRow`].
    pub last_row: &'a [u8],
}

/// The two border rows a worker gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// The upper neighbor's last row, for this band's first row.
    pub from_upper: Vec<u8>,
    /// The lower neighbor's first row, for this band's last row.
    pub from_lower: Vec<u8>,
}

pub trait Transport {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Hands every rank a copy of its band. Only the coordinator passes a grid.
    fn scatter(&self, plan: &PartitionPlan, grid: Option<&[u8]>) -> Result<Vec<u8>, TransportError>;

    /// Puts every rank's band back into the coordinator's grid. Nothing is
    /// written unless every band arrived with the planned size.
    fn gather(
        &self,
        plan: &PartitionPlan,
        band: &[u8],
        grid: Option<&mut [u8]>,
    ) -> Result<(), TransportError>;

    /// Starts both border sends and both receives, runs `overlap` while they
    /// are in flight, then waits for everything to finish.
    fn exchange<R, F>(&self, outbound: Outbound<'_>, overlap: F) -> Result<(Inbound, R), TransportError>
    where
        F: FnOnce() -> R;

    /// The coordinator's `flow` reaches every rank. Other ranks pass `None`.
    fn broadcast_flow(&self, flow: Option<Flow>) -> Result<Flow, TransportError>;

    fn barrier(&self) -> Result<(), TransportError>;
}

/// A plan drawn up for a different number of workers than the transport
/// connects cannot be scattered or gathered.
pub(crate) fn check_plan(plan: &PartitionPlan, size: usize) -> Result<(), TransportError> {
    if plan.workers() == size {
        Ok(())
    } else {
        Err(TransportError::PlanMismatch {
            planned: plan.workers(),
            actual: size,
        })
    }
}

pub(crate) fn check_len(rank: usize, expected: usize, actual: usize) -> Result<(), TransportError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransportError::SizeMismatch {
            rank,
            expected,
            actual,
        })
    }
}

pub(crate) fn check_border(peer: usize, expected: usize, actual: usize) -> Result<(), TransportError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransportError::BorderLength {
            peer,
            expected,
            actual,
        })
    }
}
