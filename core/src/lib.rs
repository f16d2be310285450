//! # RelayMQ Core Library
//!
//! RelayMQ is a lightweight TCP message broker written in Rust. Producers and
//! consumers connect over plain TCP, declare their role with a single
//! handshake line, and then exchange opaque binary payloads as
//! length-prefixed frames.
//!
//! ## Delivery Modes
//!
//! A broker instance runs in exactly one of two delivery modes, fixed for its
//! lifetime:
//!
//! - **Broadcast**: every registered consumer receives a copy of every
//!   message (fan-out). Slow consumers are skipped, never waited on.
//! - **Queue**: each message is delivered to exactly one consumer in FIFO
//!   order (competing consumers).
//!
//! ## Architecture Overview
//!
//! - [`broker`] - TCP server, connection handling, the in-memory queue and
//!   the broadcast consumer registry
//! - [`protocol`] - wire framing (4-byte big-endian length prefix + payload)
//! - [`config`] - broker configuration from CLI flags or environment
//! - [`metrics`] - lock-free broker counters
//! - [`http_server`] - health/readiness/metrics HTTP sidecar
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relaymq::{BrokerConfig, BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig {
//!         port: 9080,
//!         delivery_mode: "queue".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let server = BrokerServer::new(config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Protocol
//!
//! 1. Client sends one line: `PRODUCER\n` or `CONSUMER\n` (case-sensitive,
//!    `\r\n` accepted).
//! 2. Every message thereafter is one frame: a 4-byte big-endian unsigned
//!    length followed by exactly that many payload bytes. Payloads are
//!    limited to 1 MiB; a larger declared length terminates the connection.
//! 3. Payload content is opaque to the broker.

pub mod broker;
pub mod config;
pub mod http_server;
pub mod metrics;
pub mod protocol;

pub use broker::{
    BrokerServer, ConsumerRegistry, DeliveryMode, MemoryQueue, MessageRouter, QueueError, Role,
};
pub use config::BrokerConfig;
pub use http_server::HttpSidecar;
pub use metrics::{BrokerMetrics, MetricsSnapshot};
pub use protocol::{FrameError, MAX_FRAME_SIZE};

use thiserror::Error;

/// RelayMQ error types
///
/// # Error Categories
///
/// - **I/O**: socket read/write failures; always terminate the affected
///   connection, never another one
/// - **Frame**: wire framing violations (oversize or truncated frames)
/// - **Configuration**: invalid configuration parameters
#[derive(Debug, Error)]
pub enum RelaymqError {
    /// Socket and listener errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire framing violations
    #[error("Frame error: {0}")]
    Frame(#[from] protocol::FrameError),

    /// Configuration validation and parsing errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for RelayMQ operations
pub type Result<T> = std::result::Result<T, RelaymqError>;
