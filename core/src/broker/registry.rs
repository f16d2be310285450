//! Consumer mailbox registry for broadcast delivery mode.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Registry of per-consumer delivery mailboxes.
///
/// Each broadcast-mode consumer registers the sending half of its bounded
/// mailbox and receives an opaque unique id. The registry map is the only
/// long-lived holder of a mailbox sender, so removing an entry drops the
/// sender and thereby closes the mailbox; unregistration and close are the
/// same operation.
///
/// Fan-out follows a snapshot-then-send discipline: `broadcast` clones the
/// senders under a read lock, releases the lock, and only then attempts the
/// non-blocking sends. A stalled consumer therefore never delays
/// registration, and a send racing an unregister lands on a closed channel,
/// which the broadcast path treats the same as a full mailbox.
#[derive(Debug, Default)]
pub struct ConsumerRegistry {
    consumers: RwLock<HashMap<String, mpsc::Sender<Bytes>>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the mailbox sender and returns the consumer's fresh unique id.
    pub fn register(&self, mailbox: mpsc::Sender<Bytes>) -> String {
        let id = next_consumer_id();
        let total = {
            let mut consumers = self.consumers.write();
            consumers.insert(id.clone(), mailbox);
            consumers.len()
        };
        info!(consumer_id = %id, total_consumers = total, "consumer registered");
        id
    }

    /// Removes the consumer, closing its mailbox. Unknown ids are a no-op,
    /// so a second unregister of the same id is safe.
    pub fn unregister(&self, id: &str) {
        let remaining = {
            let mut consumers = self.consumers.write();
            if consumers.remove(id).is_none() {
                return;
            }
            consumers.len()
        };
        info!(consumer_id = %id, remaining_consumers = remaining, "consumer unregistered");
    }

    /// Sends a copy of `payload` to every currently registered consumer.
    ///
    /// Best-effort, at-most-once per consumer: a mailbox without room is
    /// skipped for this message only, and one closed by a concurrent
    /// unregister is ignored. Returns `(delivered, dropped)` counts, where
    /// dropped counts full mailboxes.
    pub fn broadcast(&self, payload: &Bytes) -> (usize, usize) {
        let snapshot: Vec<(String, mpsc::Sender<Bytes>)> = {
            let consumers = self.consumers.read();
            consumers
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };

        let (mut delivered, mut dropped) = (0, 0);
        for (id, tx) in snapshot {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    dropped += 1;
                    warn!(consumer_id = %id, "consumer mailbox full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(consumer_id = %id, "consumer mailbox closed during broadcast");
                }
            }
        }
        (delivered, dropped)
    }

    /// Number of registered consumers.
    pub fn count(&self) -> usize {
        self.consumers.read().len()
    }

    /// Closes every mailbox and clears the registry; used at broker shutdown.
    pub fn close_all(&self) {
        let mut consumers = self.consumers.write();
        let total = consumers.len();
        consumers.clear();
        if total > 0 {
            info!(closed_consumers = total, "consumer registry closed");
        }
    }
}

/// Fresh consumer id: nanosecond timestamp plus a random 64-bit suffix.
/// A collision would need the same nanosecond and the same random value.
fn next_consumer_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let suffix: u64 = rand::random();
    format!("consumer-{}-{:016x}", timestamp, suffix)
}
