//! Game room state machine.
//!
//! ```text
//! WaitingForOpponent --attach--> PlacingShips --both fleets--> InProgress --defeat--> Finished
//!          \______________________________\_________________________\____forfeit____/
//! ```
//!
//! A room only stores session ids, never connections. Every method expects
//! the caller to hold the room's lock for the whole call.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};

use crate::core::board::Board;
use crate::core::common::{Coord, GameError, RoomId, SessionId, ShotOutcome};
use crate::core::config::GameRules;
use crate::core::event::{GameEvent, GameSummary, Notice, RoomView};
use crate::core::placement::validate_fleet;
use crate::core::ship::ShipPlacement;

/// Longest chat line accepted, in characters.
pub const MAX_CHAT_LEN: usize = 256;

/// Player seat within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    WaitingForOpponent,
    PlacingShips,
    InProgress,
    Finished,
}

/// Why a room reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// The loser's whole fleet was sunk.
    FleetDestroyed,
    /// A player's connection went away.
    Disconnect,
    /// A player conceded.
    Surrender,
    /// A player left the room to queue again.
    Left,
    /// The room detected an internal inconsistency and was shut down.
    Fault,
}

/// One resolved attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub attacker: Slot,
    pub coord: Coord,
    pub outcome: ShotOutcome,
    pub at: SystemTime,
}

/// Result of a successful `submit_attack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    pub attacker: Slot,
    pub coord: Coord,
    pub outcome: ShotOutcome,
    pub phase: Phase,
    pub winner: Option<Slot>,
    /// `None` once the game is over.
    pub next_turn: Option<Slot>,
    pub notices: Vec<Notice>,
}

#[derive(Debug)]
struct Seat {
    session: SessionId,
    board: Board,
    ships_placed: bool,
}

impl Seat {
    fn new(session: SessionId) -> Self {
        Self {
            session,
            board: Board::new(),
            ships_placed: false,
        }
    }
}

#[derive(Debug)]
pub struct GameRoom {
    id: RoomId,
    rules: Arc<GameRules>,
    seats: [Option<Seat>; 2],
    phase: Phase,
    turn: Slot,
    first_mover: Slot,
    moves: u32,
    created_at: SystemTime,
    paired_at: Option<Instant>,
    finished_at: Option<Instant>,
    winner: Option<Slot>,
    finish_reason: Option<FinishReason>,
    history: Vec<MoveRecord>,
}

impl GameRoom {
    /// Open a room with `host` in slot one, waiting for an opponent.
    /// `first_mover` is fixed here so the start of the game is deterministic.
    pub fn new(id: RoomId, rules: Arc<GameRules>, first_mover: Slot, host: SessionId) -> Self {
        Self {
            id,
            rules,
            seats: [Some(Seat::new(host)), None],
            phase: Phase::WaitingForOpponent,
            turn: first_mover,
            first_mover,
            moves: 0,
            created_at: SystemTime::now(),
            paired_at: None,
            finished_at: None,
            winner: None,
            finish_reason: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Slot holding the turn, only while the game is in progress.
    pub fn turn(&self) -> Option<Slot> {
        (self.phase == Phase::InProgress).then_some(self.turn)
    }

    pub fn first_mover(&self) -> Slot {
        self.first_mover
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn winner(&self) -> Option<Slot> {
        self.winner
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn session_in(&self, slot: Slot) -> Option<SessionId> {
        self.seats[slot.index()].as_ref().map(|s| s.session)
    }

    pub fn slot_of(&self, session: SessionId) -> Option<Slot> {
        [Slot::One, Slot::Two]
            .into_iter()
            .find(|slot| self.session_in(*slot) == Some(session))
    }

    /// Sessions seated in the room, slot one first.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.seats.iter().flatten().map(|s| s.session).collect()
    }

    pub fn board(&self, slot: Slot) -> Option<&Board> {
        self.seats[slot.index()].as_ref().map(|s| &s.board)
    }

    fn seat_of(&self, session: SessionId) -> Result<Slot, GameError> {
        self.slot_of(session).ok_or(GameError::NoActiveRoom)
    }

    fn seat(&self, slot: Slot) -> Result<&Seat, GameError> {
        self.seats[slot.index()]
            .as_ref()
            .ok_or_else(|| GameError::Inconsistent(format!("room {} has no seat {slot:?}", self.id)))
    }

    fn seat_mut(&mut self, slot: Slot) -> Result<&mut Seat, GameError> {
        let id = self.id;
        self.seats[slot.index()]
            .as_mut()
            .ok_or_else(|| GameError::Inconsistent(format!("room {id} has no seat {slot:?}")))
    }

    /// Seat a second session. Moves the room to `PlacingShips`.
    pub fn attach(&mut self, session: SessionId) -> Result<Slot, GameError> {
        if self.phase != Phase::WaitingForOpponent || self.seats[1].is_some() {
            return Err(GameError::WrongPhase);
        }
        if self.slot_of(session).is_some() {
            return Err(GameError::AlreadyInRoom);
        }
        self.seats[1] = Some(Seat::new(session));
        self.phase = Phase::PlacingShips;
        self.paired_at = Some(Instant::now());
        log::debug!("room {}: session {} seated, placing ships", self.id, session);
        Ok(Slot::Two)
    }

    /// Validate and commit a fleet for `session`. Starts the game once both
    /// fleets are placed.
    pub fn commit_placement(
        &mut self,
        session: SessionId,
        fleet: &[ShipPlacement],
    ) -> Result<Vec<Notice>, GameError> {
        let slot = self.seat_of(session)?;
        let already = self.seat(slot)?.ships_placed;
        match self.phase {
            Phase::PlacingShips | Phase::InProgress if already => {
                return Err(GameError::AlreadyPlaced)
            }
            Phase::PlacingShips => {}
            _ => return Err(GameError::WrongPhase),
        }

        let validated = validate_fleet(&self.rules.ruleset, fleet)?;
        let board = Board::from_fleet(&validated)?;
        let seat = self.seat_mut(slot)?;
        seat.board = board;
        seat.ships_placed = true;

        let mut notices = vec![Notice::new(session, GameEvent::FleetAccepted)];
        let opponent = self.seat(slot.other())?;
        notices.push(Notice::new(opponent.session, GameEvent::OpponentReady));

        if opponent.ships_placed {
            self.phase = Phase::InProgress;
            self.turn = self.first_mover;
            log::info!(
                "room {}: both fleets placed, {:?} moves first",
                self.id,
                self.first_mover
            );
            for slot in [Slot::One, Slot::Two] {
                let to = self.seat(slot)?.session;
                notices.push(Notice::new(
                    to,
                    GameEvent::GameStarted {
                        your_turn: slot == self.turn,
                    },
                ));
            }
        }
        Ok(notices)
    }

    /// Fire at the opponent's board on behalf of `session`.
    pub fn submit_attack(
        &mut self,
        session: SessionId,
        coord: Coord,
    ) -> Result<AttackReport, GameError> {
        let attacker = self.seat_of(session)?;
        if self.phase != Phase::InProgress {
            return Err(GameError::WrongPhase);
        }
        if attacker != self.turn {
            return Err(GameError::NotYourTurn);
        }

        let defender = attacker.other();
        let resolved = self.seat_mut(defender)?.board.attack(coord);
        let outcome = match resolved {
            Ok(outcome) => outcome,
            Err(GameError::Inconsistent(detail)) => {
                self.fault(&detail);
                return Err(GameError::Inconsistent(detail));
            }
            Err(e) => return Err(e),
        };

        self.moves += 1;
        self.history.push(MoveRecord {
            attacker,
            coord,
            outcome,
            at: SystemTime::now(),
        });

        let defeated = self.seat(defender)?.board.is_defeated();
        if defeated {
            self.finish(Some(attacker), FinishReason::FleetDestroyed);
        } else if !(self.rules.hit_again && outcome.is_hit()) {
            self.turn = defender;
        }

        let next_turn = self.turn();
        let attacker_session = self.seat(attacker)?.session;
        let defender_session = self.seat(defender)?.session;
        let mut notices = vec![
            Notice::new(
                attacker_session,
                GameEvent::ShotResolved {
                    coord,
                    outcome,
                    your_turn: next_turn == Some(attacker),
                },
            ),
            Notice::new(
                defender_session,
                GameEvent::ShotReceived {
                    coord,
                    outcome,
                    your_turn: next_turn == Some(defender),
                },
            ),
        ];
        if defeated {
            notices.extend(self.game_over_notices());
        }

        Ok(AttackReport {
            attacker,
            coord,
            outcome,
            phase: self.phase,
            winner: self.winner,
            next_turn,
            notices,
        })
    }

    /// End the room because `session` gave up, left or vanished. The other
    /// seat, if any, wins. A finished room is left as it is.
    pub fn forfeit(&mut self, session: SessionId, reason: FinishReason) -> Vec<Notice> {
        if self.is_finished() {
            return Vec::new();
        }
        let Some(slot) = self.slot_of(session) else {
            return Vec::new();
        };
        let winner = match self.phase {
            Phase::WaitingForOpponent => None,
            _ => Some(slot.other()),
        };
        log::info!(
            "room {}: session {} forfeits ({:?}) in {:?}",
            self.id,
            session,
            reason,
            self.phase
        );
        self.finish(winner, reason);
        self.game_over_notices()
    }

    /// Force the room into `Finished` after an internal inconsistency.
    pub fn fault(&mut self, detail: &str) -> Vec<Notice> {
        if self.is_finished() {
            return Vec::new();
        }
        log::error!("room {}: internal fault, closing room: {}", self.id, detail);
        self.finish(None, FinishReason::Fault);
        self.game_over_notices()
    }

    /// Relay a chat line to every seated session.
    pub fn chat(&self, session: SessionId, text: &str) -> Result<Vec<Notice>, GameError> {
        let from = self.seat_of(session)?;
        if text.chars().count() > MAX_CHAT_LEN {
            return Err(GameError::MessageTooLong { max: MAX_CHAT_LEN });
        }
        Ok(self
            .sessions()
            .into_iter()
            .map(|to| {
                Notice::new(
                    to,
                    GameEvent::Chat {
                        from,
                        text: text.to_string(),
                    },
                )
            })
            .collect())
    }

    /// The room as `session` may see it.
    pub fn snapshot(&self, session: SessionId) -> Result<RoomView, GameError> {
        let slot = self.seat_of(session)?;
        let own = self.seat(slot)?;
        let opponent = self.seats[slot.other().index()].as_ref();
        Ok(RoomView {
            room: self.id,
            phase: self.phase,
            slot,
            your_turn: self.turn() == Some(slot),
            moves: self.moves,
            fleet_placed: own.ships_placed,
            opponent_ready: opponent.is_some_and(|s| s.ships_placed),
            own_board: own.board.cells().to_vec(),
            target_board: opponent
                .map(|s| s.board.masked_cells())
                .unwrap_or_else(|| Board::new().masked_cells()),
            winner: self.winner,
        })
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            room: self.id,
            winner: self.winner,
            reason: self.finish_reason.unwrap_or(FinishReason::Fault),
            moves: self.moves,
            duration_secs: self.play_time().as_secs(),
        }
    }

    /// Time from pairing until the game finished, or until now while it
    /// is still running.
    pub fn play_time(&self) -> Duration {
        match (self.paired_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }

    /// `GameOver` notices for every seated session. Empty unless finished.
    pub fn game_over_notices(&self) -> Vec<Notice> {
        if !self.is_finished() {
            return Vec::new();
        }
        let summary = self.summary();
        [Slot::One, Slot::Two]
            .into_iter()
            .filter_map(|slot| {
                self.session_in(slot).map(|to| {
                    Notice::new(
                        to,
                        GameEvent::GameOver {
                            you_won: self.winner == Some(slot),
                            summary: summary.clone(),
                        },
                    )
                })
            })
            .collect()
    }

    fn finish(&mut self, winner: Option<Slot>, reason: FinishReason) {
        self.phase = Phase::Finished;
        self.finished_at = Some(Instant::now());
        self.winner = winner;
        self.finish_reason = Some(reason);
        log::info!(
            "room {}: finished ({:?}) after {} moves, winner {:?}",
            self.id,
            reason,
            self.moves,
            winner
        );
    }
}
