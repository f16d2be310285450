//! # RelayMQ Client Library
//!
//! An async Rust client for the RelayMQ message broker.
//!
//! The broker protocol is deliberately small: a connection declares its role
//! with one line (`PRODUCER` or `CONSUMER`), then the producer side streams
//! length-prefixed frames to the broker and the consumer side receives them.
//! Payloads are opaque bytes.
//!
//! ## Producer Example
//!
//! ```rust,no_run
//! use relaymq_client::{ClientConfig, ProducerClient};
//!
//! #[tokio::main]
//! async fn main() -> relaymq_client::Result<()> {
//!     let mut producer = ProducerClient::connect(ClientConfig::new("localhost:9080")).await?;
//!     producer.send(&b"hello broker"[..]).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Consumer Example
//!
//! ```rust,no_run
//! use relaymq_client::{ClientConfig, ConsumerClient};
//!
//! #[tokio::main]
//! async fn main() -> relaymq_client::Result<()> {
//!     let mut consumer = ConsumerClient::connect(ClientConfig::new("localhost:9080")).await?;
//!     while let Some(payload) = consumer.next().await? {
//!         println!("received {} bytes", payload.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod producer;

pub use config::ClientConfig;
pub use consumer::ConsumerClient;
pub use error::ClientError;
pub use producer::ProducerClient;

/// Client library result type
pub type Result<T> = std::result::Result<T, ClientError>;
