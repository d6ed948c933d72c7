//! Multiplayer battleship coordinator: pairs connected players into rooms,
//! validates fleets and shots, and relays the results over a framed TCP
//! protocol.

pub mod client;
pub mod config;
pub mod core;
pub mod gateway;
mod logging;
pub mod player;
pub mod player_node;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use client::GameClient;
pub use config::ServerConfig;
pub use crate::core::*;
pub use gateway::Gateway;
pub use logging::{init_logging, parse_level, LOG_ENV};
pub use player::{AiPlayer, Player};
pub use player_node::{local_match, GameOutcome, PlayerNode};
pub use protocol::{Message, PROTOCOL_VERSION};
pub use registry::{Registry, RegistryStats, RoomCommand, Session, MAX_NAME_LEN};
pub use server::Server;
pub use transport::in_memory::InMemoryTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;
