use battleship_coordinator::{
    AiPlayer, GameClient, GameEvent, GameRules, PlayerNode, Server, ServerConfig, TcpTransport,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde_json::json;

/// Run one AI vs AI game through a loopback coordinator and print the
/// result as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <seed1> <seed2>", args[0]);
        std::process::exit(1);
    }
    let seed1: u64 = args[1].parse()?;
    let seed2: u64 = args[2].parse()?;

    let mut config = ServerConfig::loopback(GameRules::default());
    config.seed = Some(seed1 ^ seed2);
    let (addr, server) = Server::bind(&config).await?.spawn()?;

    let mut rng1 = SmallRng::seed_from_u64(seed1);
    let mut rng2 = SmallRng::seed_from_u64(seed2);

    let client1 = GameClient::handshake(TcpTransport::connect(addr).await?).await?;
    let mut node1 = PlayerNode::new(Box::new(AiPlayer::new()), client1);
    node1.client().join("player1").await?;
    match node1.client().next_event().await? {
        GameEvent::Waiting { .. } => {}
        other => return Err(anyhow::anyhow!("Expected Waiting, got {:?}", other)),
    }

    let client2 = GameClient::handshake(TcpTransport::connect(addr).await?).await?;
    let mut node2 = PlayerNode::new(Box::new(AiPlayer::new()), client2);

    let (res1, res2) = tokio::try_join!(
        node1.resume(&mut rng1),
        node2.run(&mut rng2, "player2"),
    )?;
    server.abort();

    let winner = match (res1.you_won, res2.you_won) {
        (true, false) => Some("player1"),
        (false, true) => Some("player2"),
        _ => None,
    };

    let result = json!({
        "player1": {"won": res1.you_won, "shots": res1.shots},
        "player2": {"won": res2.you_won, "shots": res2.shots},
        "winner": winner,
        "moves": res1.summary.moves,
        "reason": format!("{:?}", res1.summary.reason),
    });

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
