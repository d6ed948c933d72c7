//! Game board: cell grid, placed ships and attack resolution.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::core::common::{Cell, Coord, GameError, ShipId, ShotOutcome};
use crate::core::config::BOARD_SIZE;
use crate::core::placement::ValidatedFleet;
use crate::core::ship::PlacedShip;

const CELLS: usize = BOARD_SIZE as usize * BOARD_SIZE as usize;

/// One player's board: ship occupancy plus the outcome of every attack.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Cell>,
    /// Index into `ships` for every cell a ship occupies.
    owner: Vec<Option<usize>>,
    ships: Vec<PlacedShip>,
    remaining: usize,
}

impl Board {
    /// Create an empty board (no ships placed).
    pub fn new() -> Self {
        Board {
            cells: vec![Cell::Empty; CELLS],
            owner: vec![None; CELLS],
            ships: Vec::new(),
            remaining: 0,
        }
    }

    /// Build a board from a validated fleet, placing ships in ruleset order.
    pub fn from_fleet(fleet: &ValidatedFleet) -> Result<Self, GameError> {
        let mut board = Board::new();
        for (id, coords) in fleet.ships().iter().enumerate() {
            board.place_ship(coords, id)?;
        }
        Ok(board)
    }

    /// Place a ship occupying `coords`.
    ///
    /// Either every cell is marked or, on error, the board is left untouched.
    pub fn place_ship(&mut self, coords: &[Coord], ship_id: ShipId) -> Result<(), GameError> {
        if coords.is_empty() {
            return Err(GameError::NonContiguous { ship: ship_id });
        }
        if self.ships.iter().any(|s| s.id() == ship_id) {
            return Err(GameError::AlreadyPlaced);
        }
        if let Some(coord) = coords.iter().find(|c| !c.in_bounds()) {
            return Err(GameError::OutOfBounds(*coord));
        }
        for (i, coord) in coords.iter().enumerate() {
            if self.cells[coord.index()] != Cell::Empty || coords[..i].contains(coord) {
                return Err(GameError::Overlap(*coord));
            }
        }

        let slot = self.ships.len();
        for coord in coords {
            self.cells[coord.index()] = Cell::Ship;
            self.owner[coord.index()] = Some(slot);
        }
        self.ships.push(PlacedShip::new(ship_id, coords.to_vec()));
        self.remaining += coords.len();
        Ok(())
    }

    /// Resolve an attack at `coord`.
    pub fn attack(&mut self, coord: Coord) -> Result<ShotOutcome, GameError> {
        if !coord.in_bounds() {
            return Err(GameError::OutOfBounds(coord));
        }
        let idx = coord.index();
        match self.cells[idx] {
            Cell::Miss | Cell::Hit => Err(GameError::AlreadyAttacked(coord)),
            Cell::Empty => {
                self.cells[idx] = Cell::Miss;
                Ok(ShotOutcome::Miss)
            }
            Cell::Ship => {
                let slot = self.owner[idx].ok_or_else(|| {
                    GameError::Inconsistent(format!("ship cell {coord} has no owning ship"))
                })?;
                let ship = &mut self.ships[slot];
                if !ship.register_hit(coord) {
                    return Err(GameError::Inconsistent(format!(
                        "ship {} does not occupy {coord}",
                        ship.id()
                    )));
                }
                self.cells[idx] = Cell::Hit;
                self.remaining -= 1;
                let sunk = ship.is_sunk().then(|| ship.id());
                Ok(ShotOutcome::Hit { sunk })
            }
        }
    }

    /// `true` once every placed ship cell has been hit.
    pub fn is_defeated(&self) -> bool {
        self.remaining == 0 && !self.ships.is_empty()
    }

    /// Cell state at `coord`, or `None` when out of bounds.
    pub fn cell(&self, coord: Coord) -> Option<Cell> {
        coord.in_bounds().then(|| self.cells[coord.index()])
    }

    /// Full grid in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Grid as the opponent may see it: unhit ship cells read as empty.
    pub fn masked_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .map(|c| match c {
                Cell::Ship => Cell::Empty,
                other => *other,
            })
            .collect()
    }

    pub fn ships(&self) -> &[PlacedShip] {
        &self.ships
    }

    /// Ship cells not yet hit.
    pub fn remaining_cells(&self) -> usize {
        self.remaining
    }

    /// Number of ships not yet sunk.
    pub fn ships_afloat(&self) -> usize {
        self.ships.iter().filter(|s| !s.is_sunk()).count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{ remaining: {}, ships: {} }}", self.remaining, self.ships.len())?;
        for row in self.cells.chunks(BOARD_SIZE as usize) {
            let line: String = row
                .iter()
                .map(|c| match c {
                    Cell::Empty => '.',
                    Cell::Ship => 'S',
                    Cell::Miss => 'o',
                    Cell::Hit => 'X',
                })
                .collect();
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}
