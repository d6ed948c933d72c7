use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::gateway::Gateway;
use crate::registry::Registry;
use crate::transport::tcp::{TcpTransport, DEFAULT_SEND_TIMEOUT};

/// TCP front end: accepts connections and hands each one to the gateway in
/// its own task.
pub struct Server {
    listener: TcpListener,
    gateway: Arc<Gateway>,
    max_message_size: u32,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        let registry = Arc::new(Registry::with_seed(config.rules.clone(), config.seed));
        let gateway = Arc::new(Gateway::new(registry, config.idle_timeout));
        log::info!(
            "listening on {} (fleet {:?})",
            listener.local_addr()?,
            config.rules.ruleset.lengths()
        );
        Ok(Self {
            listener,
            gateway,
            max_message_size: config.max_message_size,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.gateway)
    }

    /// Accept connections forever. Failed accepts are logged and skipped.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    continue;
                }
            };
            log::info!("connection from {addr}");
            let transport =
                TcpTransport::with_config(stream, DEFAULT_SEND_TIMEOUT, self.max_message_size);
            let gateway = Arc::clone(&self.gateway);
            tokio::spawn(async move {
                if let Err(e) = gateway.serve(transport).await {
                    log::debug!("connection from {addr} closed: {e}");
                }
            });
        }
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F: Future<Output = ()>>(self, shutdown: F) -> anyhow::Result<()> {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                log::info!("shutting down");
                Ok(())
            }
        }
    }

    /// Run the accept loop in the background. Returns the bound address.
    pub fn spawn(self) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
        let addr = self.local_addr()?;
        Ok((addr, tokio::spawn(self.run())))
    }
}
