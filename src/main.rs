use std::sync::Arc;

use battleship_coordinator::{
    init_logging, local_match, AiPlayer, FirstTurn, GameOutcome, GameRules, Gateway, Player,
    Registry, Ruleset, Server, ServerConfig,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FirstTurnArg {
    /// The player who joined first opens fire.
    Slot1,
    /// A seeded coin flip decides per room.
    CoinFlip,
}

impl From<FirstTurnArg> for FirstTurn {
    fn from(arg: FirstTurnArg) -> Self {
        match arg {
            FirstTurnArg::Slot1 => FirstTurn::Slot1,
            FirstTurnArg::CoinFlip => FirstTurn::CoinFlip,
        }
    }
}

#[derive(Args, Clone, Debug)]
struct RulesArgs {
    #[arg(long, default_value = "5,4,3,3,2", help = "Ship lengths of the fleet, comma separated")]
    ruleset: Ruleset,
    #[arg(long, value_enum, default_value_t = FirstTurnArg::Slot1)]
    first_turn: FirstTurnArg,
    #[arg(long, help = "A hit grants the shooter another turn")]
    hit_again: bool,
}

impl From<RulesArgs> for GameRules {
    fn from(args: RulesArgs) -> Self {
        GameRules {
            ruleset: args.ruleset,
            first_turn: args.first_turn.into(),
            hit_again: args.hit_again,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator and accept players over TCP.
    Serve {
        #[arg(long, default_value = battleship_coordinator::config::DEFAULT_BIND)]
        bind: String,
        #[command(flatten)]
        rules: RulesArgs,
        #[arg(long, default_value_t = 120, help = "Drop silent connections after this many seconds (0 disables)")]
        idle_timeout_secs: u64,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Play two AI players against each other in-process.
    Local {
        #[command(flatten)]
        rules: RulesArgs,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

fn rng_from(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

fn describe(name: &str, outcome: &GameOutcome) -> String {
    format!(
        "{name}: {} after {} shots",
        if outcome.you_won { "won" } else { "lost" },
        outcome.shots
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            rules,
            idle_timeout_secs,
            seed,
        } => {
            let config = ServerConfig {
                bind,
                idle_timeout: (idle_timeout_secs > 0).then(|| Duration::from_secs(idle_timeout_secs)),
                rules: rules.into(),
                seed,
                ..ServerConfig::default()
            };
            if let Some(s) = seed {
                log::info!("using fixed seed {s}");
            }
            let server = Server::bind(&config).await?;
            server
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("could not listen for ctrl-c: {e}");
                    }
                })
                .await?;
        }
        Commands::Local { rules, seed } => {
            println!("Starting local AI vs AI game...");
            if let Some(s) = seed {
                println!("Using fixed seed: {} (game will be reproducible)", s);
            }
            let registry = Arc::new(Registry::with_seed(rules.into(), seed));
            let gateway = Arc::new(Gateway::new(registry, None));
            let first: (Box<dyn Player>, _) = (Box::new(AiPlayer::new()), rng_from(seed));
            let second: (Box<dyn Player>, _) = (
                Box::new(AiPlayer::new()),
                rng_from(seed.map(|s| s.wrapping_add(1))),
            );
            let (one, two) = local_match(gateway, first, second).await?;
            println!("{}", describe("player1", &one));
            println!("{}", describe("player2", &two));
            println!(
                "Game over in room {} after {} moves ({:?})",
                one.summary.room, one.summary.moves, one.summary.reason
            );
        }
    }
    Ok(())
}
