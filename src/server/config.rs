//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::constants::DEFAULT_READ_BUFFER_SIZE;
use crate::registry::RegistryConfig;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upstream source (`host:port`, resolved when connecting)
    pub upstream_addr: String,

    /// Address to accept subscribers on
    pub listen_addr: SocketAddr,

    /// Per-subscriber write timeout (zero = no deadline)
    pub write_timeout: Duration,

    /// How often dead subscribers are removed
    pub reap_interval: Duration,

    /// Bytes requested per upstream read
    pub read_buffer_size: usize,

    /// Enable TCP_NODELAY on subscriber sockets
    pub tcp_nodelay: bool,

    /// Maximum registered subscribers (0 = unlimited)
    pub max_subscribers: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_addr: String::from("192.168.59.22:8855"),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8855)),
            write_timeout: Duration::from_secs(5),
            reap_interval: Duration::from_secs(60),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tcp_nodelay: true, // Corrections are small and latency sensitive
            max_subscribers: 0, // Unlimited
        }
    }
}

impl RelayConfig {
    /// Create a config relaying from `upstream_addr`
    pub fn new(upstream_addr: impl Into<String>) -> Self {
        Self {
            upstream_addr: upstream_addr.into(),
            ..Default::default()
        }
    }

    /// Set the upstream address
    pub fn upstream(mut self, addr: impl Into<String>) -> Self {
        self.upstream_addr = addr.into();
        self
    }

    /// Set the listen address
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the per-subscriber write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the reap interval
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the upstream read size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set maximum subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Registry settings derived from this config
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .reap_interval(self.reap_interval)
            .write_timeout(self.write_timeout)
    }

    /// Check the configuration for values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.upstream_addr.is_empty() {
            return Err(Error::Config("upstream address is empty".into()));
        }
        if self.reap_interval.is_zero() {
            return Err(Error::Config("reap interval must be non-zero".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read buffer size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Parse a duration such as `500ms`, `30s`, `1m`, `2h` or bare seconds (`15`)
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration: {:?}", s))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(format!("unknown duration unit {:?} (use ms, s, m or h)", unit)),
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: {:?}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.listen_addr.port(), 8855);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.reap_interval, Duration::from_secs(60));
        assert_eq!(config.read_buffer_size, 81920);
        assert_eq!(config.max_subscribers, 0);
        assert!(config.tcp_nodelay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:2101".parse().unwrap();
        let config = RelayConfig::new("caster.example:2101")
            .listen(addr)
            .write_timeout(Duration::from_millis(500))
            .reap_interval(Duration::from_secs(15))
            .read_buffer_size(4096)
            .max_subscribers(8);

        assert_eq!(config.upstream_addr, "caster.example:2101");
        assert_eq!(config.listen_addr, addr);
        assert_eq!(config.write_timeout, Duration::from_millis(500));
        assert_eq!(config.reap_interval, Duration::from_secs(15));
        assert_eq!(config.read_buffer_size, 4096);
        assert_eq!(config.max_subscribers, 8);
    }

    #[test]
    fn test_registry_config_carries_timeout() {
        let config = RelayConfig::default()
            .write_timeout(Duration::from_secs(2))
            .reap_interval(Duration::from_secs(30));
        let registry = config.registry_config();

        assert_eq!(registry.write_timeout, Duration::from_secs(2));
        assert_eq!(registry.reap_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_zero_reap_interval() {
        let config = RelayConfig::default().reap_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_read_buffer() {
        let config = RelayConfig::default().read_buffer_size(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_upstream() {
        let config = RelayConfig::default().upstream("");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("15"), Ok(Duration::from_secs(15)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("18446744073709551615h").is_err());
    }

    #[test]
    fn test_zero_write_timeout_is_valid() {
        let config = RelayConfig::default().write_timeout(Duration::ZERO);
        assert!(config.validate().is_ok());
    }
}
