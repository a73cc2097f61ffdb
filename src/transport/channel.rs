//! In-process transport: every worker is a thread and every ordered pair of
//! workers gets its own unbounded channel.
//!
//! Sends never block, so they behave like immediate sends. Receives match on
//! `(source, tag)` the way MPI does; anything that arrives from the right peer
//! with the wrong tag is parked until someone asks for it.

use std::cell::RefCell;
use std::collections::VecDeque;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{check_border, check_len, check_plan, Flow, Inbound, Outbound, Tag, Transport, COORDINATOR};
use crate::error::TransportError;
use crate::partition::PartitionPlan;

#[derive(Debug)]
struct Envelope {
    tag: Tag,
    payload: Vec<u8>,
}

/// One worker's end of the mesh.
#[derive(Debug)]
pub struct ChannelTransport {
    rank: usize,
    // Indexed by destination rank.
    outboxes: Vec<Sender<Envelope>>,
    // Indexed by source rank.
    inboxes: Vec<Receiver<Envelope>>,
    parked: RefCell<Vec<VecDeque<Envelope>>>,
}

/// Builds a fully connected set of `size` endpoints, one per rank.
pub fn mesh(size: usize) -> Vec<ChannelTransport> {
    let mut outboxes: Vec<Vec<Sender<Envelope>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut inboxes: Vec<Vec<Receiver<Envelope>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();

    for source in 0..size {
        for destination in 0..size {
            let (sender, receiver) = unbounded();
            outboxes[source].push(sender);
            inboxes[destination].push(receiver);
        }
    }

    outboxes
        .into_iter()
        .zip(inboxes)
        .enumerate()
        .map(|(rank, (outboxes, inboxes))| ChannelTransport {
            rank,
            outboxes,
            inboxes,
            parked: RefCell::new((0..size).map(|_| VecDeque::new()).collect()),
        })
        .collect()
}

impl ChannelTransport {
    fn send(&self, destination: usize, tag: Tag, payload: Vec<u8>) -> Result<(), TransportError> {
        log::trace!("[{}] send {:?} ({} bytes) to {}", self.rank, tag, payload.len(), destination);
        self.outboxes[destination]
            .send(Envelope { tag, payload })
            .map_err(|_| TransportError::Disconnected { peer: destination })
    }

    fn receive(&self, source: usize, tag: Tag) -> Result<Vec<u8>, TransportError> {
        {
            let mut parked = self.parked.borrow_mut();
            let queue = &mut parked[source];
            if let Some(position) = queue.iter().position(|envelope| envelope.tag == tag) {
                if let Some(envelope) = queue.remove(position) {
                    return Ok(envelope.payload);
                }
            }
        }

        loop {
            let envelope = self.inboxes[source]
                .recv()
                .map_err(|_| TransportError::Disconnected { peer: source })?;
            if envelope.tag == tag {
                log::trace!(
                    "[{}] received {:?} ({} bytes) from {}",
                    self.rank,
                    tag,
                    envelope.payload.len(),
                    source
                );
                return Ok(envelope.payload);
            }
            self.parked.borrow_mut()[source].push_back(envelope);
        }
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn scatter(&self, plan: &PartitionPlan, grid: Option<&[u8]>) -> Result<Vec<u8>, TransportError> {
        check_plan(plan, self.size())?;
        let expected = plan.byte_len(self.rank);

        if self.rank != COORDINATOR {
            let band = self.receive(COORDINATOR, Tag::Scatter)?;
            check_len(self.rank, expected, band.len())?;
            return Ok(band);
        }

        let grid = grid.ok_or(TransportError::MissingGrid)?;
        check_len(COORDINATOR, plan.total_bytes(), grid.len())?;
        for rank in 1..plan.workers() {
            self.send(rank, Tag::Scatter, grid[plan.byte_range(rank)].to_vec())?;
        }
        // The coordinator's own band is a plain copy.
        Ok(grid[plan.byte_range(COORDINATOR)].to_vec())
    }

    fn gather(
        &self,
        plan: &PartitionPlan,
        band: &[u8],
        grid: Option<&mut [u8]>,
    ) -> Result<(), TransportError> {
        check_plan(plan, self.size())?;
        if self.rank != COORDINATOR {
            return self.send(COORDINATOR, Tag::Gather, band.to_vec());
        }

        let grid = grid.ok_or(TransportError::MissingGrid)?;
        check_len(COORDINATOR, plan.total_bytes(), grid.len())?;
        check_len(COORDINATOR, plan.byte_len(COORDINATOR), band.len())?;

        let mut returned = Vec::with_capacity(plan.workers().saturating_sub(1));
        for rank in 1..plan.workers() {
            let other = self.receive(rank, Tag::Gather)?;
            check_len(rank, plan.byte_len(rank), other.len())?;
            returned.push(other);
        }

        grid[plan.byte_range(COORDINATOR)].copy_from_slice(band);
        for (rank, other) in (1..plan.workers()).zip(returned) {
            grid[plan.byte_range(rank)].copy_from_slice(&other);
        }
        Ok(())
    }

    fn exchange<R, F>(&self, outbound: Outbound<'_>, overlap: F) -> Result<(Inbound, R), TransportError>
    where
        F: FnOnce() -> R,
    {
        let cols = outbound.first_row.len();
        self.send(outbound.upper, Tag::FirstRow, outbound.first_row.to_vec())?;
        self.send(outbound.lower, Tag::LastRow, outbound.last_row.to_vec())?;

        let result = overlap();

        let from_upper = self.receive(outbound.upper, Tag::LastRow)?;
        check_border(outbound.upper, cols, from_upper.len())?;
        let from_lower = self.receive(outbound.lower, Tag::FirstRow)?;
        check_border(outbound.lower, cols, from_lower.len())?;

        Ok((
            Inbound {
                from_upper,
                from_lower,
            },
            result,
        ))
    }

    fn broadcast_flow(&self, flow: Option<Flow>) -> Result<Flow, TransportError> {
        if self.rank != COORDINATOR {
            let message = self.receive(COORDINATOR, Tag::Control)?;
            check_len(COORDINATOR, 1, message.len())?;
            return Ok(Flow::from_byte(message[0]));
        }

        let flow = flow.unwrap_or(Flow::Stop);
        for rank in 1..self.size() {
            self.send(rank, Tag::Control, vec![flow.to_byte()])?;
        }
        Ok(flow)
    }

    fn barrier(&self) -> Result<(), TransportError> {
        if self.rank != COORDINATOR {
            self.send(COORDINATOR, Tag::Barrier, Vec::new())?;
            self.receive(COORDINATOR, Tag::Release)?;
            return Ok(());
        }

        for rank in 1..self.size() {
            self.receive(rank, Tag::Barrier)?;
        }
        for rank in 1..self.size() {
            self.send(rank, Tag::Release, Vec::new())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn tags_are_matched_out_of_order() {
        let mut endpoints = mesh(2);
        let second = endpoints.pop().unwrap();
        let first = endpoints.pop().unwrap();

        second.send(0, Tag::LastRow, vec![2]).unwrap();
        second.send(0, Tag::FirstRow, vec![1]).unwrap();

        assert_eq!(first.receive(1, Tag::FirstRow).unwrap(), vec![1]);
        assert_eq!(first.receive(1, Tag::LastRow).unwrap(), vec![2]);
    }

    #[test]
    fn a_dropped_peer_is_reported() {
        let mut endpoints = mesh(2);
        let second = endpoints.pop().unwrap();
        let first = endpoints.pop().unwrap();
        drop(second);

        assert_eq!(
            first.receive(1, Tag::Gather),
            Err(TransportError::Disconnected { peer: 1 })
        );
    }

    #[test]
    fn scatter_then_gather_restores_the_grid() {
        let plan = PartitionPlan::new(5, 2, 3).unwrap();
        let grid: Vec<u8> = (0..10).collect();

        let bands: Vec<Vec<u8>> = thread::scope(|scope| {
            let handles: Vec<_> = mesh(3)
                .into_iter()
                .map(|endpoint| {
                    let plan = &plan;
                    let grid = &grid;
                    scope.spawn(move || {
                        let source = endpoint.is_coordinator().then_some(&grid[..]);
                        let band = endpoint.scatter(plan, source).unwrap();

                        let mut target = vec![0; 10];
                        let sink = endpoint.is_coordinator().then_some(&mut target[..]);
                        endpoint.gather(plan, &band, sink).unwrap();
                        endpoint.barrier().unwrap();
                        if endpoint.is_coordinator() {
                            assert_eq!(target, *grid);
                        }
                        band
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(bands, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }

    #[test]
    fn plan_for_another_worker_count_is_rejected() {
        let grid = vec![0u8; 12];

        let endpoints = mesh(2);
        let larger = PartitionPlan::new(6, 2, 3).unwrap();
        assert_eq!(
            endpoints[0].scatter(&larger, Some(&grid[..])),
            Err(TransportError::PlanMismatch { planned: 3, actual: 2 })
        );

        let smaller = PartitionPlan::new(6, 2, 1).unwrap();
        let mut target = vec![0u8; 12];
        assert_eq!(
            endpoints[0].gather(&smaller, &grid, Some(&mut target[..])),
            Err(TransportError::PlanMismatch { planned: 1, actual: 2 })
        );
        assert_eq!(
            endpoints[1].gather(&smaller, &grid, None),
            Err(TransportError::PlanMismatch { planned: 1, actual: 2 })
        );
    }

    #[test]
    fn empty_control_message_is_an_error() {
        let mut endpoints = mesh(2);
        let second = endpoints.pop().unwrap();
        let first = endpoints.pop().unwrap();

        first.send(1, Tag::Control, Vec::new()).unwrap();
        assert_eq!(
            second.broadcast_flow(None),
            Err(TransportError::SizeMismatch {
                rank: COORDINATOR,
                expected: 1,
                actual: 0
            })
        );

        first.broadcast_flow(Some(Flow::Stop)).unwrap();
        assert_eq!(second.broadcast_flow(None), Ok(Flow::Stop));
    }

    #[test]
    fn short_band_is_rejected_without_touching_the_grid() {
        let plan = PartitionPlan::new(4, 2, 2).unwrap();
        let mut endpoints = mesh(2);
        let second = endpoints.pop().unwrap();
        let first = endpoints.pop().unwrap();

        second.gather(&plan, &[9], None).unwrap();

        let mut grid = vec![0; 8];
        let result = first.gather(&plan, &[1, 1, 1, 1], Some(&mut grid[..]));
        assert_eq!(
            result,
            Err(TransportError::SizeMismatch {
                rank: 1,
                expected: 4,
                actual: 1
            })
        );
        assert_eq!(grid, vec![0; 8]);
    }
}
