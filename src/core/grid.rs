//! Board Geometry
//!
//! Cells on the 10×10 board and the Chebyshev neighbourhood used for
//! adjacency checks and kill-zone buffers.

use serde::{Deserialize, Serialize};

/// Board edge length.
pub const BOARD_SIZE: i32 = 10;

/// Number of cells on the board.
pub const BOARD_CELLS: usize = (BOARD_SIZE * BOARD_SIZE) as usize;

/// A board coordinate. `x` is the column, `y` the row.
///
/// Coordinates are signed so that off-board input can be represented
/// and rejected rather than wrapped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Cell {
    /// Create a cell.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether the cell lies on the board.
    #[inline]
    pub fn in_bounds(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }

    /// Chebyshev (king-move) distance.
    #[inline]
    pub fn chebyshev(&self, other: &Cell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// The up-to-eight on-board cells at Chebyshev distance 1.
    pub fn neighbours(self) -> impl Iterator<Item = Cell> {
        (-1..=1)
            .flat_map(move |dy| (-1..=1).map(move |dx| Cell::new(self.x + dx, self.y + dy)))
            .filter(move |c| *c != self && c.in_bounds())
    }
}

/// Every board cell, row-major.
pub fn all_cells() -> impl Iterator<Item = Cell> {
    (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Cell::new(x, y)))
}

/// On-board cells within Chebyshev distance 1 of any cell in `cells`,
/// excluding `cells` themselves. Sorted and deduplicated.
pub fn buffer_zone(cells: &[Cell]) -> Vec<Cell> {
    let mut zone: Vec<Cell> = cells
        .iter()
        .flat_map(|c| c.neighbours())
        .filter(|c| !cells.contains(c))
        .collect();
    zone.sort();
    zone.dedup();
    zone
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(Cell::new(0, 0).in_bounds());
        assert!(Cell::new(9, 9).in_bounds());
        assert!(!Cell::new(10, 0).in_bounds());
        assert!(!Cell::new(0, -1).in_bounds());
    }

    #[test]
    fn test_corner_has_three_neighbours() {
        assert_eq!(Cell::new(0, 0).neighbours().count(), 3);
        assert_eq!(Cell::new(5, 5).neighbours().count(), 8);
        assert_eq!(Cell::new(9, 4).neighbours().count(), 5);
    }

    #[test]
    fn test_all_cells() {
        let cells: Vec<Cell> = all_cells().collect();
        assert_eq!(cells.len(), BOARD_CELLS);
        assert_eq!(cells[0], Cell::new(0, 0));
        assert_eq!(cells[11], Cell::new(1, 1));
    }

    #[test]
    fn test_buffer_zone_of_corner_ship() {
        let ship = [Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)];
        let zone = buffer_zone(&ship);
        // Sorted by column, then row.
        assert_eq!(
            zone,
            vec![
                Cell::new(0, 1),
                Cell::new(1, 1),
                Cell::new(2, 1),
                Cell::new(3, 1),
                Cell::new(4, 0),
                Cell::new(4, 1),
            ]
        );
        assert!(zone.iter().all(|c| ship.iter().any(|s| s.chebyshev(c) == 1)));
    }
}
