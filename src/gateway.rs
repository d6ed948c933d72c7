//! Per-connection session handling.
//!
//! Each connection runs [`Gateway::serve`] in its own task: handshake, then
//! a loop that decodes client messages into registry calls and forwards
//! notices addressed to this session back out. Notices for other sessions
//! travel through their outbox channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep_until, Duration, Instant};

use crate::core::{Coord, GameError, Notice, SessionId};
use crate::protocol::{Message, PROTOCOL_VERSION};
use crate::registry::{Registry, RoomCommand};
use crate::transport::Transport;

type Outbox = UnboundedSender<Message>;

pub struct Gateway {
    registry: Arc<Registry>,
    outboxes: Mutex<HashMap<SessionId, Outbox>>,
    idle_timeout: Option<Duration>,
}

impl Gateway {
    pub fn new(registry: Arc<Registry>, idle_timeout: Option<Duration>) -> Self {
        Self {
            registry,
            outboxes: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Number of sessions with a live connection.
    pub fn connected(&self) -> usize {
        self.outboxes().len()
    }

    fn outboxes(&self) -> MutexGuard<'_, HashMap<SessionId, Outbox>> {
        self.outboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue each notice on its addressee's outbox. Notices for sessions
    /// that are no longer connected are dropped.
    pub fn deliver(&self, notices: Vec<Notice>) {
        let outboxes = self.outboxes();
        for notice in notices {
            match outboxes.get(&notice.to) {
                Some(tx) => {
                    if tx.send(Message::Event(notice.event)).is_err() {
                        log::debug!("session {}: outbox closed, notice dropped", notice.to);
                    }
                }
                None => log::debug!("session {}: not connected, notice dropped", notice.to),
            }
        }
    }

    /// Drive one connection until it closes. The session is always torn
    /// down through `Registry::on_disconnect`, whatever ended the loop.
    pub async fn serve<T: Transport>(self: Arc<Self>, mut transport: T) -> anyhow::Result<()> {
        let session = self.handshake(&mut transport).await?;
        let (tx, mut rx) = unbounded_channel();
        self.outboxes().insert(session, tx);

        let result = self.session_loop(session, &mut transport, &mut rx).await;
        if let Err(e) = &result {
            log::warn!("session {session}: connection error: {e}");
        }

        self.outboxes().remove(&session);
        let notices = self.registry.on_disconnect(session);
        self.deliver(notices);
        result
    }

    async fn handshake<T: Transport>(&self, transport: &mut T) -> anyhow::Result<SessionId> {
        match transport.recv().await? {
            Message::Hello { version } if version == PROTOCOL_VERSION => {
                let session = self.registry.open_session();
                let welcome = Message::Welcome {
                    version: PROTOCOL_VERSION,
                    session,
                    ruleset: self.registry.rules().ruleset.clone(),
                };
                if let Err(e) = transport.send(welcome).await {
                    // The peer never saw its session id; forget it again.
                    self.registry.on_disconnect(session);
                    return Err(e);
                }
                Ok(session)
            }
            Message::Hello { version } => {
                transport
                    .send(Message::VersionMismatch {
                        expected: PROTOCOL_VERSION,
                        got: version,
                    })
                    .await?;
                Err(anyhow::anyhow!(
                    "Protocol version mismatch in Hello: expected {}, got {}",
                    PROTOCOL_VERSION,
                    version
                ))
            }
            other => {
                let _ = transport.send(Message::Unexpected).await;
                Err(anyhow::anyhow!("Expected Hello, got {:?}", other))
            }
        }
    }

    async fn session_loop<T: Transport>(
        &self,
        session: SessionId,
        transport: &mut T,
        outbox: &mut UnboundedReceiver<Message>,
    ) -> anyhow::Result<()> {
        let mut last_seen = Instant::now();
        loop {
            let deadline = self.idle_timeout.map(|limit| last_seen + limit);
            let idle = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                inbound = transport.recv() => {
                    let msg = match inbound {
                        Ok(msg) => msg,
                        Err(e) => {
                            log::info!("session {session}: connection ended: {e}");
                            return Ok(());
                        }
                    };
                    last_seen = Instant::now();
                    if let Some(reply) = self.handle(session, msg) {
                        transport.send(reply).await?;
                    }
                }
                Some(outbound) = outbox.recv() => {
                    transport.send(outbound).await?;
                }
                _ = idle => {
                    log::info!("session {session}: idle timeout");
                    return Ok(());
                }
            }
        }
    }

    /// Apply one client message. Returns the direct reply, if any; game
    /// events reach this session through its outbox like everyone else's.
    fn handle(&self, session: SessionId, msg: Message) -> Option<Message> {
        let registry = &self.registry;
        match msg {
            Message::Join { name } => self.dispatch(session, registry.join(session, &name)),
            Message::PlaceFleet { ships } => {
                self.dispatch(session, registry.route(session, RoomCommand::PlaceFleet(ships)))
            }
            Message::Attack { x, y } => self.dispatch(
                session,
                registry.route(session, RoomCommand::Attack(Coord::new(x, y))),
            ),
            Message::Surrender => {
                self.dispatch(session, registry.route(session, RoomCommand::Surrender))
            }
            Message::Chat { text } => {
                self.dispatch(session, registry.route(session, RoomCommand::Chat(text)))
            }
            Message::Leave => self.dispatch(session, registry.leave(session)),
            Message::Challenge { target } => {
                self.dispatch(session, registry.challenge(session, target))
            }
            Message::ChallengeResponse { from, accepted } => {
                self.dispatch(session, registry.respond_challenge(session, from, accepted))
            }
            Message::ListPlayers => Some(Message::Players {
                players: registry.players(),
            }),
            Message::StateReq => Some(match registry.snapshot(session) {
                Ok(view) => Message::State(view),
                Err(error) => Message::Rejected { error },
            }),
            Message::Heartbeat => Some(Message::HeartbeatAck {
                timestamp: unix_now(),
            }),
            other => {
                log::debug!("session {session}: unexpected message {:?}", other);
                Some(Message::Unexpected)
            }
        }
    }

    fn dispatch(
        &self,
        session: SessionId,
        result: Result<Vec<Notice>, GameError>,
    ) -> Option<Message> {
        match result {
            Ok(notices) => {
                self.deliver(notices);
                None
            }
            Err(error) => {
                log::debug!("session {session}: rejected: {error}");
                Some(Message::Rejected { error })
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
