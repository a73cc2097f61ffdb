//! Halo exchange around the worker ring.
//!
//! Each generation a worker sends the border row of its first row to its upper
//! neighbor and the border row of its last row to its lower neighbor, and gets
//! the matching rows back from both. A one-row band sends the same row both
//! ways, so every worker always does exactly two sends and two receives and the
//! pairing with its neighbors cannot deadlock.

use crate::error::TransportError;
use crate::grid::Band;
use crate::neighbors::{border_row, count_band_partial, NeighborCounts};
use crate::ring::Ring;
use crate::transport::{Outbound, Transport};

/// Neighbor counts for `band`, with the missing edge contributions supplied by
/// the ring neighbors. The interior is counted while the border rows travel.
pub fn count_neighbors<T: Transport>(
    transport: &T,
    ring: Ring,
    band: &Band,
) -> Result<NeighborCounts, TransportError> {
    let rank = transport.rank();
    let (upper, lower) = ring.neighbors(rank);
    let last = band.rows() - 1;

    let first_row = border_row(band.row(0));
    let last_row = if last == 0 {
        None
    } else {
        Some(border_row(band.row(last)))
    };

    let outbound = Outbound {
        upper,
        lower,
        first_row: &first_row,
        last_row: last_row.as_deref().unwrap_or(&first_row[..]),
    };
    log::trace!("[{}] borders out to {} and {}", rank, upper, lower);

    let (inbound, mut counts) = transport.exchange(outbound, || count_band_partial(band))?;

    // The band's first row is still missing the row above it and its last row
    // the row below it. In a one-row band both land on row 0.
    counts.add_border(0, &inbound.from_upper);
    counts.add_border(last, &inbound.from_lower);
    Ok(counts)
}
