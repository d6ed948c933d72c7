//! Events the core emits for delivery to individual sessions.
//!
//! The core never formats wire messages; the gateway wraps each event in a
//! protocol message and sends it to the addressed session.

use serde::{Deserialize, Serialize};

use crate::core::common::{Cell, Coord, RoomId, SessionId, ShotOutcome};
use crate::core::room::{FinishReason, Phase, Slot};

/// A notification addressed to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub to: SessionId,
    pub event: GameEvent,
}

impl Notice {
    pub fn new(to: SessionId, event: GameEvent) -> Self {
        Self { to, event }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Joined the queue; the room waits for a second player.
    Waiting { room: RoomId },
    /// Paired with an opponent.
    Matched {
        room: RoomId,
        slot: Slot,
        opponent: String,
    },
    /// Own fleet accepted and committed.
    FleetAccepted,
    /// The opponent committed their fleet.
    OpponentReady,
    /// Both fleets are placed and shooting starts.
    GameStarted { your_turn: bool },
    /// Result of the recipient's own shot.
    ShotResolved {
        coord: Coord,
        outcome: ShotOutcome,
        your_turn: bool,
    },
    /// The opponent fired at the recipient's board.
    ShotReceived {
        coord: Coord,
        outcome: ShotOutcome,
        your_turn: bool,
    },
    /// In-room chat line.
    Chat { from: Slot, text: String },
    /// The room reached its terminal phase.
    GameOver { you_won: bool, summary: GameSummary },
    /// Own challenge was delivered to `to`.
    ChallengeSent { to: SessionId },
    /// Another session wants a direct game with the recipient.
    ChallengeReceived { from: SessionId, name: String },
    /// `by` turned down the recipient's challenge.
    ChallengeDeclined { by: SessionId },
}

/// Lobby status of a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Not seated, or seated in a finished room.
    Idle,
    /// Hosting a room nobody has joined yet.
    Waiting,
    /// Placing ships or shooting.
    Playing,
}

/// One entry of the online-player list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub session: SessionId,
    pub name: String,
    pub status: PlayerStatus,
}

/// Record of a finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub room: RoomId,
    pub winner: Option<Slot>,
    pub reason: FinishReason,
    pub moves: u32,
    pub duration_secs: u64,
}

/// One session's view of its room. The opponent's board is masked so
/// unhit ship cells never leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    pub room: RoomId,
    pub phase: Phase,
    pub slot: Slot,
    pub your_turn: bool,
    pub moves: u32,
    pub fleet_placed: bool,
    pub opponent_ready: bool,
    pub own_board: Vec<Cell>,
    pub target_board: Vec<Cell>,
    pub winner: Option<Slot>,
}
