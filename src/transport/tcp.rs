use std::io::ErrorKind;
use std::net::SocketAddr;

use bincode::Options;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::protocol::Message;
use crate::transport::Transport;

/// Default timeout for writing one message (30 seconds).
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum frame body size (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1 << 20;

/// Length of the big-endian frame length prefix.
const HEADER_LEN: usize = 4;

fn codec(limit: u32) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(u64::from(limit))
}

/// Encode `msg` as a length-prefixed bincode frame.
pub fn encode_frame(msg: &Message, max_message_size: u32) -> anyhow::Result<Vec<u8>> {
    let body = codec(max_message_size)
        .serialize(msg)
        .map_err(|e| anyhow::anyhow!("Serialization error: {}", e))?;
    if body.len() > max_message_size as usize {
        return Err(anyhow::anyhow!(
            "Message too large: {} bytes (max: {})",
            body.len(),
            max_message_size
        ));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

fn io_error(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe => {
            anyhow::anyhow!("Connection closed by peer")
        }
        ErrorKind::ConnectionReset => anyhow::anyhow!("Connection reset by peer"),
        _ => anyhow::anyhow!("I/O error: {}", e),
    }
}

/// Length-prefixed bincode framing over a TCP stream.
///
/// Incoming bytes are accumulated in an internal buffer, so dropping a
/// pending `recv` never loses data.
pub struct TcpTransport {
    stream: TcpStream,
    send_timeout: Duration,
    max_message_size: u32,
    buffer: Vec<u8>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_config(stream, DEFAULT_SEND_TIMEOUT, MAX_MESSAGE_SIZE)
    }

    pub fn with_config(stream: TcpStream, send_timeout: Duration, max_message_size: u32) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("could not set TCP_NODELAY: {}", e);
        }
        Self {
            stream,
            send_timeout,
            max_message_size,
            buffer: Vec::with_capacity(1024),
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Pop one complete frame off the read buffer, if there is one.
    fn parse_frame(&mut self) -> anyhow::Result<Option<Message>> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.buffer[..HEADER_LEN]);
        let len = u32::from_be_bytes(header);
        if len == 0 {
            return Err(anyhow::anyhow!("Invalid message length: 0"));
        }
        if len > self.max_message_size {
            return Err(anyhow::anyhow!(
                "Message too large: {} bytes (max: {})",
                len,
                self.max_message_size
            ));
        }
        let end = HEADER_LEN + len as usize;
        if self.buffer.len() < end {
            return Ok(None);
        }
        let msg = codec(self.max_message_size)
            .deserialize(&self.buffer[HEADER_LEN..end])
            .map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))?;
        self.buffer.drain(..end);
        Ok(Some(msg))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        let frame = encode_frame(&msg, self.max_message_size)?;
        let send_timeout = self.send_timeout;
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(&frame).await.map_err(io_error)?;
            stream.flush().await.map_err(io_error)
        };
        timeout(send_timeout, write)
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", send_timeout))?
    }

    async fn recv(&mut self) -> anyhow::Result<Message> {
        loop {
            if let Some(msg) = self.parse_frame()? {
                return Ok(msg);
            }
            let n = self
                .stream
                .read_buf(&mut self.buffer)
                .await
                .map_err(io_error)?;
            if n == 0 {
                return Err(if self.buffer.is_empty() {
                    anyhow::anyhow!("Connection closed by peer")
                } else {
                    anyhow::anyhow!("Connection closed mid-frame")
                });
            }
        }
    }
}
