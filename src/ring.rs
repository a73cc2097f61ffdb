use crate::error::ConfigError;

/// Workers arranged in a circle by rank. Rank 0's upper neighbor is the last
/// rank and the last rank's lower neighbor is rank 0, which is how the grid
/// wraps vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    size: usize,
}

impl Ring {
    pub fn new(size: usize) -> Result<Ring, ConfigError> {
        if size == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(Ring { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The rank holding the rows just above `rank`'s band.
    pub fn upper(&self, rank: usize) -> usize {
        (rank + self.size - 1) % self.size
    }

    /// The rank holding the rows just below `rank`'s band.
    pub fn lower(&self, rank: usize) -> usize {
        (rank + 1) % self.size
    }

    /// `(upper, lower)` for `rank`.
    pub fn neighbors(&self, rank: usize) -> (usize, usize) {
        (self.upper(rank), self.lower(rank))
    }
}

#[cfg(test)]
mod tests {
    use super::Ring;
    use crate::error::ConfigError;

    #[test]
    fn wraps_at_both_ends() {
        let ring = Ring::new(4).unwrap();
        assert_eq!(ring.neighbors(0), (3, 1));
        assert_eq!(ring.neighbors(2), (1, 3));
        assert_eq!(ring.neighbors(3), (2, 0));
    }

    #[test]
    fn small_rings_point_back_at_themselves() {
        assert_eq!(Ring::new(1).unwrap().neighbors(0), (0, 0));
        assert_eq!(Ring::new(2).unwrap().neighbors(0), (1, 1));
        assert_eq!(Ring::new(2).unwrap().neighbors(1), (0, 0));
    }

    #[test]
    fn empty_ring_is_rejected() {
        assert_eq!(Ring::new(0), Err(ConfigError::NoWorkers));
    }
}
