use crate::grid::{ALIVE, DEAD};

/// Applies B3/S23 in place.
///
/// Fewer than two neighbors dies of isolation, exactly three comes alive, more
/// than three dies of overcrowding. Exactly two leaves the cell as it was.
pub fn evolve(cells: &mut [u8], neighbors: &[u8]) {
    debug_assert_eq!(cells.len(), neighbors.len());
    for (cell, &count) in cells.iter_mut().zip(neighbors) {
        match count {
            0 | 1 => *cell = DEAD,
            2 => {}
            3 => *cell = ALIVE,
            _ => *cell = DEAD,
        }
    }
}

/// The state a single cell ends up in.
pub fn next_state(cell: u8, neighbors: u8) -> u8 {
    let mut next = [cell];
    evolve(&mut next, &[neighbors]);
    next[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation() {
        for count in [0, 1] {
            assert_eq!(next_state(ALIVE, count), DEAD);
            assert_eq!(next_state(DEAD, count), DEAD);
        }
    }

    #[test]
    fn two_neighbors_keep_the_old_state() {
        assert_eq!(next_state(ALIVE, 2), ALIVE);
        assert_eq!(next_state(DEAD, 2), DEAD);
    }

    #[test]
    fn three_neighbors_birth_or_survive() {
        assert_eq!(next_state(ALIVE, 3), ALIVE);
        assert_eq!(next_state(DEAD, 3), ALIVE);
    }

    #[test]
    fn overcrowding() {
        for count in 4..=8 {
            assert_eq!(next_state(ALIVE, count), DEAD);
            assert_eq!(next_state(DEAD, count), DEAD);
        }
    }

    #[test]
    fn whole_buffer() {
        let mut cells = [1, 0, 1, 0, 1, 0, 1];
        evolve(&mut cells, &[0, 1, 2, 2, 3, 3, 4]);
        assert_eq!(cells, [0, 0, 1, 0, 1, 1, 0]);
    }
}
