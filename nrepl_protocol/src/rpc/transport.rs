use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace};

use super::{NreplCodec, NreplError};
use crate::message::Message;

/// A bidirectional message channel to an nREPL server.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Write one frame.
    async fn send(&mut self, message: Message) -> Result<(), NreplError>;

    /// Wait for the next complete frame.
    async fn recv(&mut self) -> Result<Message, NreplError>;

    /// Shut the channel down.
    async fn close(&mut self) -> Result<(), NreplError>;
}

/// Opens transports. Lets the client be pointed at something other than a
/// real socket.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, port: u16) -> Result<Self::Transport, NreplError>;
}

/// Transport over a TCP socket using bencode framing.
pub struct TcpTransport {
    framed: Framed<TcpStream, NreplCodec>,
    addr: String,
}

impl TcpTransport {
    pub async fn connect(host: &str, port: u16) -> Result<Self, NreplError> {
        let addr = format!("{}:{}", host, port);
        debug!("Connecting to nREPL server at {}", addr);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| NreplError::Connection {
                addr: addr.clone(),
                source,
            })?;
        info!("Connected to nREPL server at {}", addr);
        Ok(Self {
            framed: Framed::new(stream, NreplCodec::new()),
            addr,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, message: Message) -> Result<(), NreplError> {
        trace!("-> {}: {:?}", self.addr, message);
        self.framed.send(message).await
    }

    async fn recv(&mut self) -> Result<Message, NreplError> {
        match self.framed.next().await {
            Some(Ok(message)) => {
                trace!("<- {}: {:?}", self.addr, message);
                Ok(message)
            }
            Some(Err(e)) => Err(e),
            None => Err(NreplError::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<(), NreplError> {
        debug!("Closing connection to {}", self.addr);
        SinkExt::close(&mut self.framed).await
    }
}

/// Connects to `host:<port>` over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new("localhost")
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self, port: u16) -> Result<TcpTransport, NreplError> {
        TcpTransport::connect(&self.host, port).await
    }
}
