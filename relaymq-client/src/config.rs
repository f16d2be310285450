//! Client configuration

use std::time::Duration;

/// Configuration shared by producer and consumer clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker address, e.g. `localhost:9080`.
    pub broker: String,
    /// Timeout applied to the initial TCP connect and role handshake.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_and_overrides() {
        let config = ClientConfig::new("localhost:9080");
        assert_eq!(config.broker, "localhost:9080");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));

        let config = config.connect_timeout(Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
    }
}
