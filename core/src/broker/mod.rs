//! # RelayMQ Broker Module
//!
//! Core message broker functionality: the TCP server, per-connection role
//! handling, and the two delivery backends.
//!
//! ## Architecture
//!
//! - [`server`] - TCP accept loop with graceful shutdown and the
//!   health/metrics HTTP sidecar
//! - [`handler`] - per-connection role handshake and the producer/consumer
//!   loops, plus the [`MessageRouter`] that routes published payloads to the
//!   configured delivery backend
//! - [`queue`] - bounded in-memory FIFO used in queue delivery mode
//! - [`registry`] - consumer mailbox registry used in broadcast delivery mode
//!
//! Each accepted connection runs on its own tokio task; no global lock
//! serializes connection handling. An error on one connection never affects
//! another connection or the accept loop.

pub mod handler;
pub mod queue;
pub mod registry;
pub mod server;

pub use handler::{DeliveryMode, MessageRouter, Role};
pub use queue::{MemoryQueue, QueueError};
pub use registry::ConsumerRegistry;
pub use server::BrokerServer;
