//! Common types for the coordinator: coordinates, cells, shot outcomes and
//! the domain error taxonomy.

use serde::{Deserialize, Serialize};

use crate::core::config::BOARD_SIZE;

/// Server-assigned identifier of a connected session.
pub type SessionId = u64;
/// Identifier of a game room.
pub type RoomId = u64;
/// Index of a ship in the ruleset.
pub type ShipId = usize;

/// A board coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Whether the coordinate lies inside the `BOARD_SIZE`×`BOARD_SIZE` grid.
    pub fn in_bounds(&self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    /// Row-major index into a board grid. Only meaningful when in bounds.
    pub(crate) fn index(&self) -> usize {
        self.y as usize * BOARD_SIZE as usize + self.x as usize
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// State of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Ship,
    Miss,
    Hit,
}

impl Cell {
    /// Whether the cell has already received an attack.
    pub fn is_attacked(&self) -> bool {
        matches!(self, Cell::Miss | Cell::Hit)
    }
}

/// Result of a resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotOutcome {
    /// Shot landed in open water.
    Miss,
    /// Shot hit a ship; `sunk` carries the ship id when this hit sank it.
    Hit { sunk: Option<ShipId> },
}

impl ShotOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, ShotOutcome::Hit { .. })
    }

    pub fn sunk(&self) -> Option<ShipId> {
        match self {
            ShotOutcome::Hit { sunk } => *sunk,
            ShotOutcome::Miss => None,
        }
    }
}

/// Errors returned by core operations. All of them are recoverable and are
/// reported back to the session that issued the command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coord),
    #[error("coordinate {0} is already occupied by a ship")]
    Overlap(Coord),
    #[error("ship {ship} is not a straight contiguous run of its length")]
    NonContiguous { ship: usize },
    #[error("fleet does not match the ruleset (expected lengths {expected:?}, got {actual:?})")]
    FleetSizeMismatch { expected: Vec<u8>, actual: Vec<u8> },
    #[error("coordinate {0} was already attacked")]
    AlreadyAttacked(Coord),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("command not allowed in the current game phase")]
    WrongPhase,
    #[error("session is not in a game room")]
    NoActiveRoom,
    #[error("fleet already placed")]
    AlreadyPlaced,
    #[error("session is already seated in an unfinished game")]
    AlreadyInRoom,
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error("a session cannot challenge itself")]
    SelfChallenge,
    #[error("no pending challenge from that session")]
    NoSuchChallenge,
    #[error("the other player is already in a game")]
    OpponentBusy,
    #[error("message longer than {max} characters")]
    MessageTooLong { max: usize },
    #[error("internal inconsistency: {0}")]
    Inconsistent(String),
}
