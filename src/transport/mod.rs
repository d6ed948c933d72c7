use crate::protocol::Message;

/// A bidirectional, message-oriented connection.
///
/// `recv` must be cancellation safe: the gateway races it against outbound
/// notices in `tokio::select!`, and a dropped `recv` future must not lose a
/// partially read message.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Message>;
}

pub mod in_memory;
pub mod tcp;
