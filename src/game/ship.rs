//! Ships
//!
//! A ship is a straight run of cells starting at `origin` and extending
//! along its orientation.

use serde::{Deserialize, Serialize};

use crate::core::grid::Cell;

/// Ship class. The discriminant is the hull length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ShipClass {
    /// One cell.
    Small = 1,
    /// Two cells.
    Medium = 2,
    /// Three cells.
    Large = 3,
    /// Four cells.
    Huge = 4,
}

impl ShipClass {
    /// All classes, smallest first.
    pub const ALL: [ShipClass; 4] = [
        ShipClass::Small,
        ShipClass::Medium,
        ShipClass::Large,
        ShipClass::Huge,
    ];

    /// Hull length in cells.
    #[inline]
    pub fn length(self) -> u8 {
        self as u8
    }

    /// How many ships of this class a fleet must contain.
    pub fn required_count(self) -> usize {
        match self {
            ShipClass::Small => 4,
            ShipClass::Medium => 3,
            ShipClass::Large => 2,
            ShipClass::Huge => 1,
        }
    }
}

/// Direction a ship extends from its origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Cells advance along x.
    Horizontal,
    /// Cells advance along y.
    Vertical,
}

/// A ship as submitted by a player.
///
/// `length` is carried separately from `class` because clients send both;
/// the fleet validator rejects ships where they disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    /// First cell.
    pub origin: Cell,
    /// Direction of extension.
    pub orientation: Orientation,
    /// Declared length.
    pub length: u8,
    /// Declared class.
    pub class: ShipClass,
}

impl Ship {
    /// Create a ship whose length matches its class.
    pub fn new(class: ShipClass, origin: Cell, orientation: Orientation) -> Self {
        Self {
            origin,
            orientation,
            length: class.length(),
            class,
        }
    }

    /// Occupied cells, origin first.
    pub fn cells(&self) -> Vec<Cell> {
        (0..self.length as i32)
            .map(|i| match self.orientation {
                Orientation::Horizontal => Cell::new(self.origin.x.saturating_add(i), self.origin.y),
                Orientation::Vertical => Cell::new(self.origin.x, self.origin.y.saturating_add(i)),
            })
            .collect()
    }

    /// Whether the ship covers `cell`.
    pub fn occupies(&self, cell: &Cell) -> bool {
        let i = match self.orientation {
            Orientation::Horizontal if cell.y == self.origin.y => cell.x.checked_sub(self.origin.x),
            Orientation::Vertical if cell.x == self.origin.x => cell.y.checked_sub(self.origin.y),
            _ => return false,
        };
        i.is_some_and(|i| (0..self.length as i32).contains(&i))
    }
}
