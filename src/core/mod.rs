//! Core battleship game logic: boards, fleet validation and the room state
//! machine.
//!
//! Everything here is synchronous and in-memory. Networking, session
//! bookkeeping and locking live in the registry and gateway above it.

pub mod board;
pub mod common;
pub mod config;
pub mod event;
pub mod placement;
pub mod room;
pub mod ship;

pub use board::Board;
pub use common::{Cell, Coord, GameError, RoomId, SessionId, ShipId, ShotOutcome};
pub use config::{ConfigError, FirstTurn, GameRules, Ruleset, ShipDef, BOARD_SIZE};
pub use event::{GameEvent, GameSummary, Notice, PlayerInfo, PlayerStatus, RoomView};
pub use placement::{random_fleet, validate_fleet, ValidatedFleet};
pub use room::{AttackReport, FinishReason, GameRoom, MoveRecord, Phase, Slot, MAX_CHAT_LEN};
pub use ship::{Orientation, PlacedShip, ShipPlacement};
