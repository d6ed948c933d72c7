use serde::{Deserialize, Serialize};

use crate::core::{GameError, GameEvent, PlayerInfo, RoomView, Ruleset, SessionId, ShipPlacement};

/// Wire protocol version exchanged in the handshake.
pub const PROTOCOL_VERSION: u16 = 1;

/// Messages exchanged between the coordinator and its clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    // client -> server
    /// Opening handshake.
    Hello { version: u16 },
    /// Queue for a game under a display name.
    Join { name: String },
    /// Submit the whole fleet.
    PlaceFleet { ships: Vec<ShipPlacement> },
    /// Fire at the opponent's board.
    Attack { x: u8, y: u8 },
    /// Concede the current game.
    Surrender,
    /// Leave the current room without closing the connection.
    Leave,
    /// In-room chat line.
    Chat { text: String },
    /// Request the current room view.
    StateReq,
    /// Invite another session to a direct game, bypassing the queue.
    Challenge { target: SessionId },
    /// Accept or decline a challenge received from `from`.
    ChallengeResponse { from: SessionId, accepted: bool },
    /// Request the online-player list.
    ListPlayers,
    /// Liveness probe.
    Heartbeat,

    // server -> client
    /// Handshake accepted; carries the session id assigned to the connection
    /// and the fleet every player must place.
    Welcome {
        version: u16,
        session: SessionId,
        ruleset: Ruleset,
    },
    /// Handshake refused; the connection is closed afterwards.
    VersionMismatch { expected: u16, got: u16 },
    /// A game event addressed to this session.
    Event(GameEvent),
    /// The last command was refused.
    Rejected { error: GameError },
    /// Reply to `StateReq`.
    State(RoomView),
    /// Reply to `ListPlayers`, ordered by session id.
    Players { players: Vec<PlayerInfo> },
    /// Reply to `Heartbeat`, with the server's UNIX time in seconds.
    HeartbeatAck { timestamp: u64 },
    /// The message was not valid in this direction or state.
    Unexpected,
}
