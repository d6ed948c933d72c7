//! Session directory, matchmaking and command routing.
//!
//! The directory (sessions, room index, waiting slot) sits behind one mutex
//! and every room behind its own. Locks are always taken directory first,
//! then room; routed room commands release the directory before locking the
//! room, so games in different rooms never wait on each other. Pairing,
//! challenges and disconnects hold the directory for their whole update.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::core::{
    Coord, FinishReason, FirstTurn, GameError, GameEvent, GameRoom, GameRules, Notice, Phase,
    PlayerInfo, PlayerStatus, RoomId, RoomView, SessionId, ShipPlacement, Slot,
};

/// Longest display name accepted, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Commands a seated session can send to its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    PlaceFleet(Vec<ShipPlacement>),
    Attack(Coord),
    Surrender,
    Chat(String),
}

/// A connected participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    /// Room and slot once matched.
    pub seat: Option<(RoomId, Slot)>,
}

/// Point-in-time counters, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub sessions: usize,
    pub rooms: usize,
    pub waiting: Option<RoomId>,
}

#[derive(Default)]
struct Directory {
    sessions: HashMap<SessionId, Session>,
    rooms: HashMap<RoomId, Arc<Mutex<GameRoom>>>,
    waiting: Option<RoomId>,
    /// Pending challenges as (challenger, target).
    challenges: HashSet<(SessionId, SessionId)>,
}

pub struct Registry {
    rules: Arc<GameRules>,
    directory: Mutex<Directory>,
    rng: Mutex<SmallRng>,
    next_session: AtomicU64,
    next_room: AtomicU64,
}

/// Lock a mutex, recovering the data if another thread panicked while
/// holding it. Room methods never leave a room half-updated across a panic
/// point, so the state is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    pub fn new(rules: GameRules) -> Self {
        Self::with_seed(rules, None)
    }

    /// Fix the RNG seed used for coin-flip first turns.
    pub fn with_seed(rules: GameRules, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => {
                let mut seed_rng = rand::rng();
                SmallRng::from_rng(&mut seed_rng)
            }
        };
        Self {
            rules: Arc::new(rules),
            directory: Mutex::new(Directory::default()),
            rng: Mutex::new(rng),
            next_session: AtomicU64::new(1),
            next_room: AtomicU64::new(1),
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Register a freshly connected session.
    pub fn open_session(&self) -> SessionId {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let session = Session {
            id,
            name: format!("player-{id}"),
            seat: None,
        };
        lock(&self.directory).sessions.insert(id, session);
        log::info!("session {id} opened");
        id
    }

    pub fn session(&self, id: SessionId) -> Option<Session> {
        lock(&self.directory).sessions.get(&id).cloned()
    }

    pub fn room_of(&self, id: SessionId) -> Option<RoomId> {
        self.session(id).and_then(|s| s.seat).map(|(room, _)| room)
    }

    pub fn stats(&self) -> RegistryStats {
        let dir = lock(&self.directory);
        RegistryStats {
            sessions: dir.sessions.len(),
            rooms: dir.rooms.len(),
            waiting: dir.waiting,
        }
    }

    /// Set the display name of `session` and queue it for a game.
    pub fn join(&self, session: SessionId, name: &str) -> Result<Vec<Notice>, GameError> {
        let name = name.trim();
        if name.chars().count() > MAX_NAME_LEN {
            return Err(GameError::MessageTooLong { max: MAX_NAME_LEN });
        }
        {
            let mut dir = lock(&self.directory);
            let entry = dir
                .sessions
                .get_mut(&session)
                .ok_or(GameError::UnknownSession(session))?;
            if !name.is_empty() {
                entry.name = name.to_string();
            }
        }
        self.enqueue(session)
    }

    /// Pair `session` with the waiting room, or open a new room and wait.
    ///
    /// A session seated in a finished room leaves it first, so a new JOIN
    /// after game over starts a fresh game.
    pub fn enqueue(&self, session: SessionId) -> Result<Vec<Notice>, GameError> {
        let mut dir = lock(&self.directory);
        let seat = dir
            .sessions
            .get(&session)
            .ok_or(GameError::UnknownSession(session))?
            .seat;
        if let Some((room_id, _)) = seat {
            if let Some(room) = dir.rooms.get(&room_id) {
                if !lock(room).is_finished() {
                    return Err(GameError::AlreadyInRoom);
                }
            }
            Self::detach(&mut dir, session);
        }

        if let Some(room_id) = dir.waiting.take() {
            if let Some(room) = dir.rooms.get(&room_id).cloned() {
                let mut room = lock(&room);
                if room.phase() == Phase::WaitingForOpponent {
                    let host = room.session_in(Slot::One).ok_or_else(|| {
                        GameError::Inconsistent(format!("waiting room {room_id} has no host"))
                    })?;
                    let slot = room.attach(session)?;
                    drop(room);
                    return Ok(Self::seat_pair(&mut dir, room_id, host, session, slot));
                }
            }
            log::debug!("dropping stale waiting room {room_id}");
        }

        let room_id = self.open_room(&mut dir, session);
        dir.waiting = Some(room_id);
        log::info!("session {session} opened room {room_id}, waiting for an opponent");
        Ok(vec![Notice::new(session, GameEvent::Waiting { room: room_id })])
    }

    /// Create a room with `host` seated in slot one.
    fn open_room(&self, dir: &mut Directory, host: SessionId) -> RoomId {
        let room_id = self.next_room.fetch_add(1, Ordering::Relaxed);
        let first_mover = match self.rules.first_turn {
            FirstTurn::Slot1 => Slot::One,
            FirstTurn::CoinFlip => {
                if lock(&self.rng).random() {
                    Slot::One
                } else {
                    Slot::Two
                }
            }
        };
        let room = GameRoom::new(room_id, Arc::clone(&self.rules), first_mover, host);
        dir.rooms.insert(room_id, Arc::new(Mutex::new(room)));
        if let Some(entry) = dir.sessions.get_mut(&host) {
            entry.seat = Some((room_id, Slot::One));
        }
        room_id
    }

    /// Invite `target` to a direct game.
    pub fn challenge(&self, session: SessionId, target: SessionId) -> Result<Vec<Notice>, GameError> {
        if session == target {
            return Err(GameError::SelfChallenge);
        }
        let mut dir = lock(&self.directory);
        let name = dir
            .sessions
            .get(&session)
            .ok_or(GameError::UnknownSession(session))?
            .name
            .clone();
        if !dir.sessions.contains_key(&target) {
            return Err(GameError::UnknownSession(target));
        }
        if Self::status(&dir, session) == PlayerStatus::Playing {
            return Err(GameError::AlreadyInRoom);
        }
        if Self::status(&dir, target) == PlayerStatus::Playing {
            return Err(GameError::OpponentBusy);
        }
        dir.challenges.insert((session, target));
        log::info!("session {session} challenged session {target}");
        Ok(vec![
            Notice::new(session, GameEvent::ChallengeSent { to: target }),
            Notice::new(target, GameEvent::ChallengeReceived { from: session, name }),
        ])
    }

    /// Answer the pending challenge `from` sent to `session`.
    ///
    /// Accepting opens a room outside the queue with the challenger in slot
    /// one. A room either side was waiting in is abandoned.
    pub fn respond_challenge(
        &self,
        session: SessionId,
        from: SessionId,
        accepted: bool,
    ) -> Result<Vec<Notice>, GameError> {
        let mut dir = lock(&self.directory);
        if !dir.challenges.remove(&(from, session)) {
            return Err(GameError::NoSuchChallenge);
        }
        if !accepted {
            log::info!("session {session} declined the challenge from session {from}");
            return Ok(vec![Notice::new(from, GameEvent::ChallengeDeclined { by: session })]);
        }
        if Self::status(&dir, session) == PlayerStatus::Playing {
            return Err(GameError::AlreadyInRoom);
        }
        if Self::status(&dir, from) == PlayerStatus::Playing {
            return Err(GameError::OpponentBusy);
        }

        Self::detach(&mut dir, from);
        Self::detach(&mut dir, session);
        let room_id = self.open_room(&mut dir, from);
        let slot = dir
            .rooms
            .get(&room_id)
            .map(|room| lock(room).attach(session))
            .ok_or_else(|| GameError::Inconsistent(format!("room {room_id} vanished")))??;
        Ok(Self::seat_pair(&mut dir, room_id, from, session, slot))
    }

    /// Every connected session with its lobby status, by session id.
    pub fn players(&self) -> Vec<PlayerInfo> {
        let dir = lock(&self.directory);
        let mut players: Vec<PlayerInfo> = dir
            .sessions
            .values()
            .map(|s| PlayerInfo {
                session: s.id,
                name: s.name.clone(),
                status: Self::status(&dir, s.id),
            })
            .collect();
        players.sort_by_key(|p| p.session);
        players
    }

    fn status(dir: &Directory, session: SessionId) -> PlayerStatus {
        let phase = dir
            .sessions
            .get(&session)
            .and_then(|s| s.seat)
            .and_then(|(room_id, _)| dir.rooms.get(&room_id))
            .map(|room| lock(room).phase());
        match phase {
            Some(Phase::WaitingForOpponent) => PlayerStatus::Waiting,
            Some(Phase::PlacingShips | Phase::InProgress) => PlayerStatus::Playing,
            Some(Phase::Finished) | None => PlayerStatus::Idle,
        }
    }

    fn seat_pair(
        dir: &mut Directory,
        room_id: RoomId,
        host: SessionId,
        guest: SessionId,
        guest_slot: Slot,
    ) -> Vec<Notice> {
        if let Some(entry) = dir.sessions.get_mut(&guest) {
            entry.seat = Some((room_id, guest_slot));
        }
        let name_of = |dir: &Directory, id: SessionId| {
            dir.sessions
                .get(&id)
                .map(|s| s.name.clone())
                .unwrap_or_default()
        };
        let host_name = name_of(dir, host);
        let guest_name = name_of(dir, guest);
        log::info!("room {room_id}: {host_name} (session {host}) vs {guest_name} (session {guest})");
        vec![
            Notice::new(
                host,
                GameEvent::Matched {
                    room: room_id,
                    slot: guest_slot.other(),
                    opponent: guest_name,
                },
            ),
            Notice::new(
                guest,
                GameEvent::Matched {
                    room: room_id,
                    slot: guest_slot,
                    opponent: host_name,
                },
            ),
        ]
    }

    /// Clear the seat of `session` and reclaim its room once no session is
    /// seated in it any more.
    fn detach(dir: &mut Directory, session: SessionId) {
        let Some((room_id, _)) = dir.sessions.get_mut(&session).and_then(|s| s.seat.take()) else {
            return;
        };
        let occupants = dir
            .rooms
            .get(&room_id)
            .map(|room| lock(room).sessions())
            .unwrap_or_default();
        let still_seated = occupants.iter().any(|id| {
            dir.sessions
                .get(id)
                .is_some_and(|s| s.seat.map(|(r, _)| r) == Some(room_id))
        });
        if !still_seated {
            dir.rooms.remove(&room_id);
            if dir.waiting == Some(room_id) {
                dir.waiting = None;
            }
            log::debug!("room {room_id} reclaimed");
        }
    }

    fn room_handle(&self, session: SessionId) -> Result<Arc<Mutex<GameRoom>>, GameError> {
        let dir = lock(&self.directory);
        let entry = dir
            .sessions
            .get(&session)
            .ok_or(GameError::UnknownSession(session))?;
        let (room_id, _) = entry.seat.ok_or(GameError::NoActiveRoom)?;
        dir.rooms.get(&room_id).cloned().ok_or(GameError::NoActiveRoom)
    }

    /// Run `f` against the room of `session` while holding the room lock.
    pub fn with_room<T>(
        &self,
        session: SessionId,
        f: impl FnOnce(&mut GameRoom) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let room = self.room_handle(session)?;
        let mut room = lock(&room);
        f(&mut room)
    }

    /// Forward a room command from `session` to the room it is seated in.
    ///
    /// An internal inconsistency closes the room; both players then receive
    /// the game-over notices instead of an error.
    pub fn route(&self, session: SessionId, command: RoomCommand) -> Result<Vec<Notice>, GameError> {
        self.with_room(session, |room| {
            let result = match command {
                RoomCommand::PlaceFleet(fleet) => room.commit_placement(session, &fleet),
                RoomCommand::Attack(coord) => room.submit_attack(session, coord).map(|r| r.notices),
                RoomCommand::Surrender if room.is_finished() => Err(GameError::WrongPhase),
                RoomCommand::Surrender => Ok(room.forfeit(session, FinishReason::Surrender)),
                RoomCommand::Chat(text) => room.chat(session, &text),
            };
            match result {
                Err(GameError::Inconsistent(detail)) => {
                    room.fault(&detail);
                    Ok(room.game_over_notices())
                }
                other => other,
            }
        })
    }

    pub fn snapshot(&self, session: SessionId) -> Result<RoomView, GameError> {
        self.with_room(session, |room| room.snapshot(session))
    }

    /// Leave the current room, forfeiting an unfinished game.
    pub fn leave(&self, session: SessionId) -> Result<Vec<Notice>, GameError> {
        let notices = self.with_room(session, |room| Ok(room.forfeit(session, FinishReason::Left)))?;
        let mut dir = lock(&self.directory);
        Self::detach(&mut dir, session);
        log::info!("session {session} left its room");
        Ok(notices)
    }

    /// The connection of `session` is gone. Its opponent, if any, wins by
    /// forfeit; the session is forgotten. Notices for the departed session
    /// are dropped.
    pub fn on_disconnect(&self, session: SessionId) -> Vec<Notice> {
        let mut dir = lock(&self.directory);
        let Some(seat) = dir.sessions.get(&session).map(|s| s.seat) else {
            return Vec::new();
        };
        // Forfeit under the directory lock so no JOIN can pair with a
        // departing host in between.
        let notices = seat
            .and_then(|(room_id, _)| dir.rooms.get(&room_id))
            .map(|room| lock(room).forfeit(session, FinishReason::Disconnect))
            .unwrap_or_default();

        Self::detach(&mut dir, session);
        dir.sessions.remove(&session);
        dir.challenges
            .retain(|&(from, to)| from != session && to != session);
        log::info!("session {session} disconnected");
        notices.into_iter().filter(|n| n.to != session).collect()
    }
}
