//! Producer side of the broker protocol.

use crate::config::ClientConfig;
use crate::error::ClientError;
use bytes::Bytes;
use futures::SinkExt;
use relaymq::protocol::FrameCodec;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info};

/// A producer connection: after the `PRODUCER` handshake, every [`send`]
/// ships one payload to the broker as a length-prefixed frame. The broker
/// never responds on this connection; delivery is fire-and-forget.
///
/// [`send`]: ProducerClient::send
pub struct ProducerClient {
    framed: Framed<TcpStream, FrameCodec>,
    broker: String,
}

impl ProducerClient {
    /// Connects to the broker and performs the producer role handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let mut stream = timeout(config.connect_timeout, TcpStream::connect(&config.broker))
            .await
            .map_err(|_| ClientError::timeout(config.connect_timeout.as_millis() as u64))?
            .map_err(|e| {
                ClientError::connection(format!("failed to connect to {}: {}", config.broker, e))
            })?;

        stream.write_all(b"PRODUCER\n").await?;
        info!(broker = %config.broker, "producer connected");

        Ok(Self {
            framed: Framed::new(stream, FrameCodec),
            broker: config.broker,
        })
    }

    /// Sends one payload. Payloads above the broker's 1 MiB frame limit are
    /// rejected locally without touching the connection.
    pub async fn send(&mut self, payload: impl Into<Bytes>) -> Result<(), ClientError> {
        let payload = payload.into();
        debug!(broker = %self.broker, bytes = payload.len(), "sending frame");
        self.framed.send(payload).await?;
        Ok(())
    }

    /// Flushes and closes the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.framed.close().await?;
        Ok(())
    }
}
