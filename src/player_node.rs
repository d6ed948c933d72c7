use std::sync::Arc;

use rand::rngs::SmallRng;

use crate::client::GameClient;
use crate::core::{GameEvent, GameSummary, SessionId};
use crate::player::Player;
use crate::transport::Transport;

/// How a game ended from one player's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub session: SessionId,
    pub you_won: bool,
    pub shots: usize,
    pub summary: GameSummary,
}

/// A [`Player`] connected to a coordinator through a [`GameClient`].
pub struct PlayerNode<T: Transport> {
    player: Box<dyn Player>,
    client: GameClient<T>,
    shots: usize,
}

impl<T: Transport> PlayerNode<T> {
    pub fn new(player: Box<dyn Player>, client: GameClient<T>) -> Self {
        Self {
            player,
            client,
            shots: 0,
        }
    }

    pub fn client(&mut self) -> &mut GameClient<T> {
        &mut self.client
    }

    async fn fire(&mut self, rng: &mut SmallRng) -> anyhow::Result<()> {
        let target = self
            .player
            .select_target(rng)
            .ok_or_else(|| anyhow::anyhow!("no untried cells left"))?;
        self.shots += 1;
        log::debug!("session {}: firing at {}", self.client.session(), target);
        self.client.attack(target).await
    }

    /// Join under `name` and play one game to the end.
    pub async fn run(&mut self, rng: &mut SmallRng, name: &str) -> anyhow::Result<GameOutcome> {
        self.client.join(name).await?;
        self.resume(rng).await
    }

    /// Play on from whatever the client has already done, typically after a
    /// manual `join`.
    pub async fn resume(&mut self, rng: &mut SmallRng) -> anyhow::Result<GameOutcome> {
        loop {
            match self.client.next_event().await? {
                GameEvent::Matched { opponent, .. } => {
                    log::debug!("session {}: matched against {}", self.client.session(), opponent);
                    let ruleset = self.client.ruleset().clone();
                    let fleet = self.player.place_fleet(rng, &ruleset)?;
                    self.client.place_fleet(fleet).await?;
                }
                GameEvent::GameStarted { your_turn } => {
                    if your_turn {
                        self.fire(rng).await?;
                    }
                }
                GameEvent::ShotResolved {
                    coord,
                    outcome,
                    your_turn,
                } => {
                    self.player.handle_shot_result(coord, outcome);
                    if your_turn {
                        self.fire(rng).await?;
                    }
                }
                GameEvent::ShotReceived {
                    coord,
                    outcome,
                    your_turn,
                } => {
                    self.player.handle_opponent_shot(coord, outcome);
                    if your_turn {
                        self.fire(rng).await?;
                    }
                }
                GameEvent::GameOver { you_won, summary } => {
                    return Ok(GameOutcome {
                        session: self.client.session(),
                        you_won,
                        shots: self.shots,
                        summary,
                    });
                }
                GameEvent::Waiting { .. }
                | GameEvent::FleetAccepted
                | GameEvent::OpponentReady
                | GameEvent::Chat { .. }
                | GameEvent::ChallengeSent { .. }
                | GameEvent::ChallengeReceived { .. }
                | GameEvent::ChallengeDeclined { .. } => {}
            }
        }
    }
}

/// Play two bots against each other through an in-process gateway.
///
/// The first player joins first and so holds slot one.
pub async fn local_match(
    gateway: Arc<crate::gateway::Gateway>,
    mut first: (Box<dyn Player>, SmallRng),
    mut second: (Box<dyn Player>, SmallRng),
) -> anyhow::Result<(GameOutcome, GameOutcome)> {
    use crate::transport::in_memory::InMemoryTransport;

    let (client_end, server_end) = InMemoryTransport::pair();
    let server1 = tokio::spawn(Arc::clone(&gateway).serve(server_end));
    let mut node1 = PlayerNode::new(first.0, GameClient::handshake(client_end).await?);
    // Queue the first player before the second connects so seating is stable.
    node1.client().join("player1").await?;
    let waiting = node1.client().next_event().await?;
    if !matches!(waiting, GameEvent::Waiting { .. }) {
        return Err(anyhow::anyhow!("Expected Waiting, got {:?}", waiting));
    }

    let (client_end, server_end) = InMemoryTransport::pair();
    let server2 = tokio::spawn(Arc::clone(&gateway).serve(server_end));
    let mut node2 = PlayerNode::new(second.0, GameClient::handshake(client_end).await?);

    let (outcome1, outcome2) = tokio::try_join!(
        node1.resume(&mut first.1),
        node2.run(&mut second.1, "player2"),
    )?;

    drop(node1);
    drop(node2);
    let _ = server1.await;
    let _ = server2.await;
    Ok((outcome1, outcome2))
}
