pub mod settings;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Delivery mode selector: "broadcast" or "queue"; anything else falls
    /// back to broadcast.
    pub delivery_mode: String,
    /// Queue capacity for queue mode; non-positive values fall back to
    /// 10,000.
    pub queue_capacity: i64,
    /// Per-consumer mailbox capacity for broadcast mode; non-positive
    /// values fall back to 64.
    pub mailbox_capacity: i64,
    /// Port for the health/metrics HTTP sidecar; None disables it.
    pub http_port: Option<u16>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9080,
            delivery_mode: "broadcast".to_string(),
            queue_capacity: 10_000,
            mailbox_capacity: 64,
            http_port: Some(8080),
        }
    }
}

impl BrokerConfig {
    /// Switch to queue delivery mode.
    pub fn with_queue_mode(mut self) -> Self {
        self.delivery_mode = "queue".to_string();
        self
    }

    /// Disable the HTTP sidecar.
    pub fn without_http(mut self) -> Self {
        self.http_port = None;
        self
    }

    /// Validate configuration bounds. Non-positive capacities are accepted
    /// here because the broker normalizes them to the documented defaults.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        if let Some(http_port) = self.http_port {
            if http_port == self.port && self.port != 0 {
                return Err(format!(
                    "http_port {} collides with broker port",
                    http_port
                ));
            }
        }
        Ok(())
    }
}
