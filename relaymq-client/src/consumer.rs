//! Consumer side of the broker protocol.

use crate::config::ClientConfig;
use crate::error::ClientError;
use bytes::Bytes;
use futures::StreamExt;
use relaymq::protocol::FrameCodec;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::info;

/// A consumer connection: after the `CONSUMER` handshake the broker pushes
/// frames whenever its delivery mode hands this connection a message;
/// [`next`] yields them in arrival order.
///
/// [`next`]: ConsumerClient::next
pub struct ConsumerClient {
    framed: Framed<TcpStream, FrameCodec>,
}

impl ConsumerClient {
    /// Connects to the broker and performs the consumer role handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let mut stream = timeout(config.connect_timeout, TcpStream::connect(&config.broker))
            .await
            .map_err(|_| ClientError::timeout(config.connect_timeout.as_millis() as u64))?
            .map_err(|e| {
                ClientError::connection(format!("failed to connect to {}: {}", config.broker, e))
            })?;

        stream.write_all(b"CONSUMER\n").await?;
        info!(broker = %config.broker, "consumer connected");

        Ok(Self {
            framed: Framed::new(stream, FrameCodec),
        })
    }

    /// Receives the next payload. Returns `Ok(None)` once the broker closes
    /// the connection (e.g. at shutdown).
    pub async fn next(&mut self) -> Result<Option<Bytes>, ClientError> {
        match self.framed.next().await {
            Some(Ok(payload)) => Ok(Some(payload)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}
