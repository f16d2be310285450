//! Broker metrics collection.
//!
//! Counters sit on the message hot path, so they are plain atomics updated
//! with relaxed ordering: no locks, no allocation. A [`MetricsSnapshot`]
//! materializes the current values for the HTTP sidecar and logs.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free broker counters.
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    messages_published: AtomicU64,
    messages_delivered: AtomicU64,
    messages_dropped: AtomicU64,
    protocol_violations: AtomicU64,
}

/// Point-in-time view of the broker counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub active_connections: u64,
    pub messages_published: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    pub protocol_violations: u64,
}

impl BrokerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// One payload accepted from a producer, before delivery fan-out.
    pub fn message_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    /// One frame written to a consumer connection.
    pub fn message_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Payloads discarded by the drop-on-full policy (queue or mailboxes).
    pub fn messages_dropped(&self, count: u64) {
        if count > 0 {
            self.messages_dropped.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Bad role line, oversize frame, or truncated frame.
    pub fn protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_opened: opened,
            connections_closed: closed,
            active_connections: opened.saturating_sub(closed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = BrokerMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.message_published();
        metrics.message_delivered();
        metrics.messages_dropped(3);
        metrics.messages_dropped(0);
        metrics.protocol_violation();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_opened, 2);
        assert_eq!(snapshot.connections_closed, 1);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.messages_published, 1);
        assert_eq!(snapshot.messages_delivered, 1);
        assert_eq!(snapshot.messages_dropped, 3);
        assert_eq!(snapshot.protocol_violations, 1);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let metrics = BrokerMetrics::new();
        metrics.message_published();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["messages_published"], 1);
        assert_eq!(json["active_connections"], 0);
    }
}
