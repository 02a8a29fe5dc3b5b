//! Registry configuration

use std::time::Duration;

/// Configuration for the subscriber registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How often dead subscribers are removed
    pub reap_interval: Duration,

    /// Per-subscriber write timeout (zero = no deadline)
    pub write_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_secs(60),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Set the reap interval
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the per-subscriber write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.reap_interval, Duration::from_secs(60));
        assert_eq!(config.write_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .reap_interval(Duration::from_secs(10))
            .write_timeout(Duration::from_millis(250));

        assert_eq!(config.reap_interval, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_millis(250));
    }
}
