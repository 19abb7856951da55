//! Fleet Validation
//!
//! Static legality check of a submitted fleet. Checks run in a fixed order
//! and the first failure rejects the whole fleet:
//!
//! 1. exactly ten ships
//! 2. per-class counts and per-ship length/class agreement
//! 3. every cell on the board
//! 4. no shared cells
//! 5. no ship inside another ship's one-cell buffer (diagonals included)

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::grid::{buffer_zone, Cell};
use crate::game::ship::{Ship, ShipClass};

/// Ships per fleet.
pub const FLEET_SIZE: usize = 10;

/// Why a fleet was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    /// Wrong number of ships.
    #[error("expected 10 ships, got {0}")]
    WrongShipCount(usize),

    /// Wrong number of ships of one class.
    #[error("expected {expected} {class:?} ships, got {actual}")]
    WrongClassCount {
        /// Class.
        class: ShipClass,
        /// Required count.
        expected: usize,
        /// Submitted count.
        actual: usize,
    },

    /// Declared length disagrees with class.
    #[error("ship {index} declares length {length} for class {class:?}")]
    LengthMismatch {
        /// Position in the submitted list.
        index: usize,
        /// Declared length.
        length: u8,
        /// Declared class.
        class: ShipClass,
    },

    /// Ship leaves the board.
    #[error("ship {index} leaves the board")]
    OutOfBounds {
        /// Position in the submitted list.
        index: usize,
    },

    /// Two ships share a cell.
    #[error("ships overlap at ({}, {})", .0.x, .0.y)]
    Overlap(Cell),

    /// Two ships touch.
    #[error("ship {index} touches another ship")]
    Adjacent {
        /// Position in the submitted list.
        index: usize,
    },
}

/// An accepted fleet. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fleet {
    ships: Vec<Ship>,
    cells: BTreeSet<Cell>,
}

impl Fleet {
    /// Validate and wrap a list of ships.
    pub fn new(ships: Vec<Ship>) -> Result<Self, FleetError> {
        check(&ships)?;
        let cells = ships.iter().flat_map(Ship::cells).collect();
        Ok(Self { ships, cells })
    }

    /// Ships in submission order.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Every occupied cell.
    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    /// The ship covering `cell`, if any.
    pub fn ship_at(&self, cell: &Cell) -> Option<&Ship> {
        self.ships.iter().find(|s| s.occupies(cell))
    }
}

/// Whether `ships` form a legal fleet.
pub fn validate(ships: &[Ship]) -> bool {
    check(ships).is_ok()
}

/// Validate `ships`, reporting the first rule broken.
pub fn check(ships: &[Ship]) -> Result<(), FleetError> {
    if ships.len() != FLEET_SIZE {
        return Err(FleetError::WrongShipCount(ships.len()));
    }

    for class in ShipClass::ALL {
        let actual = ships.iter().filter(|s| s.class == class).count();
        if actual != class.required_count() {
            return Err(FleetError::WrongClassCount {
                class,
                expected: class.required_count(),
                actual,
            });
        }
    }
    for (index, ship) in ships.iter().enumerate() {
        if ship.length != ship.class.length() {
            return Err(FleetError::LengthMismatch {
                index,
                length: ship.length,
                class: ship.class,
            });
        }
    }

    // Hulls are only built from on-board origins.
    for (index, ship) in ships.iter().enumerate() {
        if !ship.origin.in_bounds() {
            return Err(FleetError::OutOfBounds { index });
        }
    }

    let hulls: Vec<Vec<Cell>> = ships.iter().map(Ship::cells).collect();

    for (index, cells) in hulls.iter().enumerate() {
        if !cells.iter().all(Cell::in_bounds) {
            return Err(FleetError::OutOfBounds { index });
        }
    }

    let mut occupied = BTreeSet::new();
    for cell in hulls.iter().flatten() {
        if !occupied.insert(*cell) {
            return Err(FleetError::Overlap(*cell));
        }
    }

    for (index, cells) in hulls.iter().enumerate() {
        if buffer_zone(cells).iter().any(|c| occupied.contains(c)) {
            return Err(FleetError::Adjacent { index });
        }
    }

    Ok(())
}
