use std::collections::VecDeque;

use crate::core::{Coord, GameEvent, PlayerInfo, RoomView, Ruleset, SessionId, ShipPlacement};
use crate::protocol::{Message, PROTOCOL_VERSION};
use crate::transport::Transport;

/// Client side of the coordinator protocol.
///
/// Game events that arrive while a request waits for its direct reply are
/// queued and handed out by later [`GameClient::next_event`] calls.
pub struct GameClient<T: Transport> {
    transport: T,
    session: SessionId,
    ruleset: Ruleset,
    pending: VecDeque<GameEvent>,
}

impl<T: Transport> GameClient<T> {
    /// Perform the `Hello`/`Welcome` handshake over `transport`.
    pub async fn handshake(mut transport: T) -> anyhow::Result<Self> {
        transport
            .send(Message::Hello {
                version: PROTOCOL_VERSION,
            })
            .await?;
        match transport.recv().await? {
            Message::Welcome {
                version,
                session,
                ruleset,
            } if version == PROTOCOL_VERSION => Ok(Self {
                transport,
                session,
                ruleset,
                pending: VecDeque::new(),
            }),
            Message::Welcome { version, .. } | Message::VersionMismatch { expected: version, .. } => {
                Err(anyhow::anyhow!(
                    "Protocol version mismatch: expected {}, got {}",
                    PROTOCOL_VERSION,
                    version
                ))
            }
            other => Err(anyhow::anyhow!("Expected Welcome, got {:?}", other)),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// The fleet the server expects from every player.
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        self.transport.send(msg).await
    }

    /// Next raw message from the server, queued events first.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        match self.pending.pop_front() {
            Some(event) => Ok(Message::Event(event)),
            None => self.transport.recv().await,
        }
    }

    pub async fn join(&mut self, name: &str) -> anyhow::Result<()> {
        self.send(Message::Join {
            name: name.to_string(),
        })
        .await
    }

    pub async fn place_fleet(&mut self, ships: Vec<ShipPlacement>) -> anyhow::Result<()> {
        self.send(Message::PlaceFleet { ships }).await
    }

    pub async fn attack(&mut self, coord: Coord) -> anyhow::Result<()> {
        self.send(Message::Attack {
            x: coord.x,
            y: coord.y,
        })
        .await
    }

    pub async fn surrender(&mut self) -> anyhow::Result<()> {
        self.send(Message::Surrender).await
    }

    pub async fn leave(&mut self) -> anyhow::Result<()> {
        self.send(Message::Leave).await
    }

    pub async fn chat(&mut self, text: &str) -> anyhow::Result<()> {
        self.send(Message::Chat {
            text: text.to_string(),
        })
        .await
    }

    pub async fn challenge(&mut self, target: SessionId) -> anyhow::Result<()> {
        self.send(Message::Challenge { target }).await
    }

    pub async fn respond(&mut self, from: SessionId, accepted: bool) -> anyhow::Result<()> {
        self.send(Message::ChallengeResponse { from, accepted }).await
    }

    /// Wait for the next game event.
    ///
    /// A `Rejected` reply surfaces as an error wrapping the [`GameError`],
    /// so callers can `downcast_ref` it.
    ///
    /// [`GameError`]: crate::core::GameError
    pub async fn next_event(&mut self) -> anyhow::Result<GameEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }
        loop {
            match self.transport.recv().await? {
                Message::Event(event) => return Ok(event),
                Message::Rejected { error } => return Err(error.into()),
                Message::HeartbeatAck { .. } => continue,
                other => return Err(anyhow::anyhow!("Expected an event, got {:?}", other)),
            }
        }
    }

    /// Request the current room view.
    pub async fn state(&mut self) -> anyhow::Result<RoomView> {
        self.send(Message::StateReq).await?;
        loop {
            match self.transport.recv().await? {
                Message::State(view) => return Ok(view),
                Message::Event(event) => self.pending.push_back(event),
                Message::Rejected { error } => return Err(error.into()),
                other => return Err(anyhow::anyhow!("Expected State, got {:?}", other)),
            }
        }
    }

    /// Fetch the online-player list.
    pub async fn players(&mut self) -> anyhow::Result<Vec<PlayerInfo>> {
        self.send(Message::ListPlayers).await?;
        loop {
            match self.transport.recv().await? {
                Message::Players { players } => return Ok(players),
                Message::Event(event) => self.pending.push_back(event),
                other => return Err(anyhow::anyhow!("Expected Players, got {:?}", other)),
            }
        }
    }

    /// Round-trip a heartbeat; returns the server's UNIX time.
    pub async fn heartbeat(&mut self) -> anyhow::Result<u64> {
        self.send(Message::Heartbeat).await?;
        loop {
            match self.transport.recv().await? {
                Message::HeartbeatAck { timestamp } => return Ok(timestamp),
                Message::Event(event) => self.pending.push_back(event),
                other => return Err(anyhow::anyhow!("Expected HeartbeatAck, got {:?}", other)),
            }
        }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
