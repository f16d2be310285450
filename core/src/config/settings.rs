use super::BrokerConfig;
use crate::Result;
use config::{Config, Environment};

impl BrokerConfig {
    /// Loads configuration from `RELAYMQ_`-prefixed environment variables,
    /// e.g. `RELAYMQ_DELIVERY_MODE=queue` or `RELAYMQ_PORT=9090`. Unset
    /// fields keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .add_source(Config::try_from(&defaults).map_err(|e| {
                crate::RelaymqError::Config(e.to_string())
            })?)
            .add_source(Environment::with_prefix("RELAYMQ").try_parsing(true))
            .build()
            .map_err(|e| crate::RelaymqError::Config(e.to_string()))?;

        let config = settings
            .try_deserialize::<BrokerConfig>()
            .map_err(|e| crate::RelaymqError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state, so everything lives in one test.
    #[test]
    fn from_env_overrides_defaults() {
        std::env::set_var("RELAYMQ_DELIVERY_MODE", "queue");
        std::env::set_var("RELAYMQ_PORT", "9191");

        let config = BrokerConfig::from_env().unwrap();
        assert_eq!(config.delivery_mode, "queue");
        assert_eq!(config.port, 9191);
        // untouched fields keep their defaults
        assert_eq!(config.queue_capacity, 10_000);

        std::env::remove_var("RELAYMQ_DELIVERY_MODE");
        std::env::remove_var("RELAYMQ_PORT");
    }
}
