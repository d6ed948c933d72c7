//! Ship placements as proposed by players and ships as committed to a board.

use serde::{Deserialize, Serialize};

use crate::core::common::{Coord, ShipId};

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// `y` fixed, `x` increasing.
    Horizontal,
    /// `x` fixed, `y` increasing.
    Vertical,
}

/// A ship as proposed in a `PlaceFleet` command. Nothing about it is
/// trusted until the placement validator has checked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub length: u8,
    pub coords: Vec<Coord>,
    pub orientation: Orientation,
}

impl ShipPlacement {
    /// Lay out a ship of `length` cells starting at `origin`.
    ///
    /// Coordinates that would run past `u8::MAX` saturate; the validator
    /// rejects them as out of bounds.
    pub fn new(length: u8, origin: Coord, orientation: Orientation) -> Self {
        let coords = (0..length)
            .map(|i| match orientation {
                Orientation::Horizontal => Coord::new(origin.x.saturating_add(i), origin.y),
                Orientation::Vertical => Coord::new(origin.x, origin.y.saturating_add(i)),
            })
            .collect();
        Self {
            length,
            coords,
            orientation,
        }
    }
}

/// A ship committed to a board, with hits tracked per coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedShip {
    id: ShipId,
    coords: Vec<Coord>,
    hit: Vec<bool>,
}

impl PlacedShip {
    pub(crate) fn new(id: ShipId, coords: Vec<Coord>) -> Self {
        let hit = vec![false; coords.len()];
        Self { id, coords, hit }
    }

    pub fn id(&self) -> ShipId {
        self.id
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Number of coordinates hit so far.
    pub fn hits(&self) -> usize {
        self.hit.iter().filter(|h| **h).count()
    }

    /// Register a hit at `coord`. Returns `false` if the ship does not
    /// occupy `coord`.
    pub(crate) fn register_hit(&mut self, coord: Coord) -> bool {
        match self.coords.iter().position(|c| *c == coord) {
            Some(i) => {
                self.hit[i] = true;
                true
            }
            None => false,
        }
    }

    /// A ship is sunk once every coordinate has been hit.
    pub fn is_sunk(&self) -> bool {
        self.hit.iter().all(|h| *h)
    }
}
