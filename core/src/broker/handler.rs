//! Per-connection role handshake and the producer/consumer loops.

use crate::broker::queue::{MemoryQueue, QueueError};
use crate::broker::registry::ConsumerRegistry;
use crate::metrics::BrokerMetrics;
use crate::protocol::{read_frame, write_frame, FrameError};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Mailbox capacity used when a non-positive capacity is configured.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Initial capacity of the per-producer frame scratch buffer.
const PRODUCER_SCRATCH_CAPACITY: usize = 64 * 1024;

/// How messages are distributed to multiple consumers. Fixed for the
/// lifetime of a broker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every consumer receives a copy of every message (fan-out).
    Broadcast,
    /// Each message is delivered to exactly one consumer, FIFO.
    Queue,
}

impl DeliveryMode {
    /// Returns `Queue` for `"queue"`, `Broadcast` for `"broadcast"` and for
    /// any unrecognized value (the documented default).
    pub fn parse(s: &str) -> Self {
        match s {
            "queue" => DeliveryMode::Queue,
            _ => DeliveryMode::Broadcast,
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::Broadcast => write!(f, "broadcast"),
            DeliveryMode::Queue => write!(f, "queue"),
        }
    }
}

/// The role a connection declares on its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    /// Exact, case-sensitive match; anything else is a protocol violation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRODUCER" => Some(Role::Producer),
            "CONSUMER" => Some(Role::Consumer),
            _ => None,
        }
    }
}

/// The delivery backend selected once at broker construction.
#[derive(Debug)]
enum Delivery {
    Broadcast(ConsumerRegistry),
    Queue(MemoryQueue),
}

/// Routes published payloads to the configured delivery backend and hands
/// consumer loops their delivery source.
#[derive(Debug)]
pub struct MessageRouter {
    delivery: Delivery,
    mailbox_capacity: usize,
    metrics: Arc<BrokerMetrics>,
}

impl MessageRouter {
    /// Builds the router for `mode`. `queue_capacity` only applies in queue
    /// mode and `mailbox_capacity` only in broadcast mode; non-positive
    /// values fall back to the defaults (10,000 and 64).
    pub fn new(
        mode: DeliveryMode,
        queue_capacity: i64,
        mailbox_capacity: i64,
        metrics: Arc<BrokerMetrics>,
    ) -> Self {
        let delivery = match mode {
            DeliveryMode::Broadcast => Delivery::Broadcast(ConsumerRegistry::new()),
            DeliveryMode::Queue => Delivery::Queue(MemoryQueue::new(queue_capacity)),
        };
        let mailbox_capacity = if mailbox_capacity <= 0 {
            DEFAULT_MAILBOX_CAPACITY
        } else {
            mailbox_capacity as usize
        };
        Self {
            delivery,
            mailbox_capacity,
            metrics,
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self.delivery {
            Delivery::Broadcast(_) => DeliveryMode::Broadcast,
            Delivery::Queue(_) => DeliveryMode::Queue,
        }
    }

    /// The broadcast registry, when running in broadcast mode.
    pub fn registry(&self) -> Option<&ConsumerRegistry> {
        match &self.delivery {
            Delivery::Broadcast(registry) => Some(registry),
            Delivery::Queue(_) => None,
        }
    }

    /// The shared queue, when running in queue mode.
    pub fn queue(&self) -> Option<&MemoryQueue> {
        match &self.delivery {
            Delivery::Queue(queue) => Some(queue),
            Delivery::Broadcast(_) => None,
        }
    }

    pub fn metrics(&self) -> &Arc<BrokerMetrics> {
        &self.metrics
    }

    /// Delivers one payload according to the broker's mode. A full queue or
    /// full mailbox drops the message (counted and logged) without failing
    /// the producer.
    pub fn publish(&self, payload: Bytes) {
        self.metrics.message_published();
        match &self.delivery {
            Delivery::Broadcast(registry) => {
                let (_, dropped) = registry.broadcast(&payload);
                self.metrics.messages_dropped(dropped as u64);
            }
            Delivery::Queue(queue) => match queue.enqueue(payload) {
                Ok(()) => {}
                Err(QueueError::Full) => {
                    self.metrics.messages_dropped(1);
                    warn!(queue_len = queue.len(), "queue full, dropping message");
                }
                Err(QueueError::Closed) => {
                    debug!("queue closed, dropping message");
                }
                Err(QueueError::Empty) => unreachable!("enqueue never reports empty"),
            },
        }
    }

    /// Closes the delivery backend; in-flight consumer loops observe the
    /// closed queue or mailboxes and terminate.
    pub fn close(&self) {
        match &self.delivery {
            Delivery::Broadcast(registry) => registry.close_all(),
            Delivery::Queue(queue) => queue.close(),
        }
    }
}

/// Strips trailing `\r` and `\n` characters from a role line.
fn trim_line(s: &str) -> &str {
    s.trim_end_matches(['\r', '\n'])
}

/// Drives one accepted connection from role handshake to close.
///
/// The first newline-terminated line selects the role; an I/O error, EOF
/// before the newline, or an unrecognized role closes the connection without
/// reading or writing any frame. The connection is dropped on every exit
/// path.
pub async fn handle_connection(stream: TcpStream, router: Arc<MessageRouter>) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(_) if line.ends_with('\n') => {}
        Ok(_) => {
            debug!("connection closed before completing role line");
            return;
        }
        Err(e) => {
            warn!("failed to read role line: {}", e);
            return;
        }
    }

    match Role::parse(trim_line(&line)) {
        Some(Role::Producer) => run_producer(reader, &router).await,
        Some(Role::Consumer) => run_consumer(write_half, &router).await,
        None => {
            router.metrics.protocol_violation();
            warn!(role = trim_line(&line), "unknown role, closing connection");
        }
    }
}

/// Reads frames until the producer disconnects, forwarding each payload to
/// the delivery backend.
async fn run_producer<R>(mut reader: R, router: &MessageRouter)
where
    R: AsyncRead + Unpin,
{
    let mut scratch = BytesMut::with_capacity(PRODUCER_SCRATCH_CAPACITY);
    loop {
        match read_frame(&mut reader, &mut scratch).await {
            Ok(body) => router.publish(body),
            Err(FrameError::Closed) => {
                debug!("producer disconnected");
                return;
            }
            Err(e @ (FrameError::TooLarge { .. } | FrameError::Truncated)) => {
                router.metrics.protocol_violation();
                warn!("producer read: {}", e);
                return;
            }
            Err(e) => {
                warn!("producer read: {}", e);
                return;
            }
        }
    }
}

async fn run_consumer<W>(writer: W, router: &MessageRouter)
where
    W: AsyncWrite + Unpin,
{
    match &router.delivery {
        Delivery::Broadcast(registry) => {
            run_consumer_broadcast(writer, registry, router).await;
        }
        Delivery::Queue(queue) => {
            run_consumer_queue(writer, queue, router).await;
        }
    }
}

/// Broadcast-mode consumer: register a bounded mailbox, then drain it to the
/// socket until the connection or the mailbox dies.
async fn run_consumer_broadcast<W>(mut writer: W, registry: &ConsumerRegistry, router: &MessageRouter)
where
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel(router.mailbox_capacity);
    let id = registry.register(tx);

    // `recv` yields None once the registry drops the sender (unregister or
    // broker shutdown), which ends the loop cleanly.
    while let Some(payload) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &payload).await {
            warn!(consumer_id = %id, "consumer write: {}", e);
            break;
        }
        router.metrics.message_delivered();
    }

    registry.unregister(&id);
    info!(consumer_id = %id, "broadcast consumer finished");
}

/// Queue-mode consumer: competing receive from the shared queue. The
/// condition-notified dequeue parks the task while the queue is empty.
async fn run_consumer_queue<W>(mut writer: W, queue: &MemoryQueue, router: &MessageRouter)
where
    W: AsyncWrite + Unpin,
{
    loop {
        match queue.dequeue().await {
            Ok(payload) => {
                if let Err(e) = write_frame(&mut writer, &payload).await {
                    warn!("consumer write: {}", e);
                    return;
                }
                router.metrics.message_delivered();
            }
            Err(_) => {
                debug!("queue closed, consumer loop ending");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_router(mode: DeliveryMode) -> MessageRouter {
        MessageRouter::new(mode, 10, 10, Arc::new(BrokerMetrics::new()))
    }

    #[test]
    fn delivery_mode_parse_and_display() {
        assert_eq!(DeliveryMode::parse("queue"), DeliveryMode::Queue);
        assert_eq!(DeliveryMode::parse("broadcast"), DeliveryMode::Broadcast);
        assert_eq!(DeliveryMode::parse("unknown"), DeliveryMode::Broadcast);
        assert_eq!(DeliveryMode::parse(""), DeliveryMode::Broadcast);

        assert_eq!(DeliveryMode::Broadcast.to_string(), "broadcast");
        assert_eq!(DeliveryMode::Queue.to_string(), "queue");
    }

    #[test]
    fn role_parse_is_exact_and_case_sensitive() {
        assert_eq!(Role::parse("PRODUCER"), Some(Role::Producer));
        assert_eq!(Role::parse("CONSUMER"), Some(Role::Consumer));
        assert_eq!(Role::parse("producer"), None);
        assert_eq!(Role::parse("PRODUCER "), None);
        assert_eq!(Role::parse("FOO"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn trim_line_strips_only_trailing_line_endings() {
        assert_eq!(trim_line("hello\n"), "hello");
        assert_eq!(trim_line("hello\r\n"), "hello");
        assert_eq!(trim_line("hello"), "hello");
        assert_eq!(trim_line("hello\r"), "hello");
        assert_eq!(trim_line("\n"), "");
        assert_eq!(trim_line("\r\n"), "");
        assert_eq!(trim_line("test\n\r"), "test");
    }

    #[test]
    fn router_publish_queue_mode_enqueues() {
        let router = test_router(DeliveryMode::Queue);
        router.publish(Bytes::from_static(b"hello-queue"));

        let queue = router.queue().unwrap();
        assert_eq!(queue.try_dequeue().unwrap(), Bytes::from_static(b"hello-queue"));
    }

    #[test]
    fn router_publish_queue_full_drops_without_error() {
        let router = MessageRouter::new(
            DeliveryMode::Queue,
            1,
            10,
            Arc::new(BrokerMetrics::new()),
        );
        router.publish(Bytes::from_static(b"kept"));
        router.publish(Bytes::from_static(b"dropped"));

        let snapshot = router.metrics().snapshot();
        assert_eq!(snapshot.messages_published, 2);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(router.queue().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn router_publish_broadcast_mode_reaches_mailbox() {
        let router = test_router(DeliveryMode::Broadcast);
        let registry = router.registry().unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        registry.register(tx);

        router.publish(Bytes::from_static(b"fan-out"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"fan-out"));
    }

    #[test]
    fn router_mode_matches_delivery_backend() {
        assert_eq!(test_router(DeliveryMode::Queue).mode(), DeliveryMode::Queue);
        assert_eq!(
            test_router(DeliveryMode::Broadcast).mode(),
            DeliveryMode::Broadcast
        );
        assert!(test_router(DeliveryMode::Queue).registry().is_none());
        assert!(test_router(DeliveryMode::Broadcast).queue().is_none());
    }
}
