use tokio::time::Duration;

use crate::core::GameRules;
use crate::transport::tcp::MAX_MESSAGE_SIZE;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8888";

/// Connections silent for this long are treated as disconnected.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything needed to run a coordinator instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// `None` disables the idle timeout.
    pub idle_timeout: Option<Duration>,
    pub max_message_size: u32,
    pub rules: GameRules,
    /// Fixes the registry RNG (coin-flip first turns) for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_message_size: MAX_MESSAGE_SIZE,
            rules: GameRules::default(),
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Loopback config on an OS-assigned port, handy for tests and local games.
    pub fn loopback(rules: GameRules) -> Self {
        Self {
            bind: "127.0.0.1:0".to_string(),
            rules,
            ..Self::default()
        }
    }
}
