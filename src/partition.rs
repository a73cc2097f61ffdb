//! Row-band domain decomposition.
//!
//! The first `rows % workers` ranks take one extra row each, so every band holds
//! either `rows / workers` or `rows / workers + 1` rows and the bands tile the
//! grid in rank order.

use crate::error::{ConfigError, TransportError};

/// The rows one worker owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub row_count: usize,
    pub row_offset: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.row_offset + self.row_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    rows: usize,
    cols: usize,
    spans: Vec<Span>,
}

impl PartitionPlan {
    pub fn new(rows: usize, cols: usize, workers: usize) -> Result<PartitionPlan, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        // A worker without rows would have nothing to send in the border exchange.
        if workers > rows {
            return Err(ConfigError::TooManyWorkers { workers, rows });
        }

        let rows_per_worker = rows / workers;
        let remaining_rows = rows % workers;

        let mut spans = Vec::with_capacity(workers);
        let mut row_offset = 0;
        for rank in 0..workers {
            let row_count = if rank < remaining_rows {
                rows_per_worker + 1
            } else {
                rows_per_worker
            };
            spans.push(Span {
                row_count,
                row_offset,
            });
            row_offset += row_count;
        }

        Ok(PartitionPlan { rows, cols, spans })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn workers(&self) -> usize {
        self.spans.len()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn span(&self, rank: usize) -> Span {
        self.spans[rank]
    }

    /// Number of bytes in `rank`'s band.
    pub fn byte_len(&self, rank: usize) -> usize {
        self.spans[rank].row_count * self.cols
    }

    /// Where `rank`'s band starts in the flattened grid.
    pub fn byte_offset(&self, rank: usize) -> usize {
        self.spans[rank].row_offset * self.cols
    }

    pub fn byte_range(&self, rank: usize) -> std::ops::Range<usize> {
        let start = self.byte_offset(rank);
        start..start + self.byte_len(rank)
    }

    pub fn total_bytes(&self) -> usize {
        self.rows * self.cols
    }

    /// Per-rank byte counts in the `i32` form that varcount collectives take.
    pub fn send_counts(&self) -> Result<Vec<i32>, TransportError> {
        (0..self.workers()).map(|rank| to_count(self.byte_len(rank))).collect()
    }

    /// Per-rank byte displacements in the `i32` form that varcount collectives take.
    pub fn displacements(&self) -> Result<Vec<i32>, TransportError> {
        (0..self.workers()).map(|rank| to_count(self.byte_offset(rank))).collect()
    }
}

fn to_count(bytes: usize) -> Result<i32, TransportError> {
    i32::try_from(bytes).map_err(|_| TransportError::CountOverflow(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn remainder_goes_to_the_first_ranks() {
        let plan = PartitionPlan::new(10, 4, 3).unwrap();
        let counts: Vec<usize> = plan.spans().iter().map(|span| span.row_count).collect();
        let offsets: Vec<usize> = plan.spans().iter().map(|span| span.row_offset).collect();
        assert_eq!(counts, vec![4, 3, 3]);
        assert_eq!(offsets, vec![0, 4, 7]);
        assert_eq!(plan.send_counts().unwrap(), vec![16, 12, 12]);
        assert_eq!(plan.displacements().unwrap(), vec![0, 16, 28]);
        assert_eq!(plan.byte_range(2), 28..40);
    }

    #[test]
    fn one_row_per_worker() {
        let plan = PartitionPlan::new(4, 7, 4).unwrap();
        assert!(plan.spans().iter().all(|span| span.row_count == 1));
    }

    #[test]
    fn rejects_idle_workers() {
        assert_eq!(
            PartitionPlan::new(3, 3, 4),
            Err(ConfigError::TooManyWorkers { workers: 4, rows: 3 })
        );
        assert_eq!(PartitionPlan::new(3, 3, 0), Err(ConfigError::NoWorkers));
        assert_eq!(
            PartitionPlan::new(0, 3, 1),
            Err(ConfigError::EmptyGrid { rows: 0, cols: 3 })
        );
    }

    proptest! {
        #[test]
        fn spans_tile_the_grid(rows in 1usize..500, cols in 1usize..8, workers in 1usize..64) {
            prop_assume!(workers <= rows);
            let plan = PartitionPlan::new(rows, cols, workers).unwrap();

            let total: usize = plan.spans().iter().map(|span| span.row_count).sum();
            prop_assert_eq!(total, rows);

            let floor = rows / workers;
            let extra = rows % workers;
            let mut next_row = 0;
            for (rank, span) in plan.spans().iter().enumerate() {
                prop_assert_eq!(span.row_offset, next_row);
                let expected = if rank < extra { floor + 1 } else { floor };
                prop_assert_eq!(span.row_count, expected);
                next_row = span.end();
            }
            prop_assert_eq!(next_row, rows);
        }
    }
}
