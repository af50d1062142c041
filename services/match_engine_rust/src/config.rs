use std::env;
use std::time::Duration;

/// Configuration for the match engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Scheduled match length in minutes, used as the fallback close
    /// minute when a full-time event arrives without one
    pub regulation_minutes: u8,
    /// Ceiling on one outbound notification publish
    pub dispatch_timeout: Duration,
    /// How often the engine announces itself and its open matches
    pub heartbeat_interval: Duration,
    /// Retention window for processed-event keys
    pub idempotency_ttl_hours: i64,
    /// How often the expired-key sweep runs
    pub cleanup_interval: Duration,
    /// Depth of each match's submission queue
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regulation_minutes: 90,
            dispatch_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(10),
            idempotency_ttl_hours: 24,
            cleanup_interval: Duration::from_secs(600),
            queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            regulation_minutes: parse_env("REGULATION_MINUTES", defaults.regulation_minutes),
            dispatch_timeout: Duration::from_secs(parse_env(
                "DISPATCH_TIMEOUT_SECS",
                defaults.dispatch_timeout.as_secs(),
            )),
            heartbeat_interval: Duration::from_secs(parse_env(
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval.as_secs(),
            )),
            idempotency_ttl_hours: parse_env(
                "IDEMPOTENCY_TTL_HOURS",
                defaults.idempotency_ttl_hours,
            ),
            cleanup_interval: Duration::from_secs(parse_env(
                "IDEMPOTENCY_CLEANUP_SECS",
                defaults.cleanup_interval.as_secs(),
            )),
            queue_capacity: parse_env("EVENT_QUEUE_CAPACITY", defaults.queue_capacity),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_reference_values() {
        let config = EngineConfig::default();
        assert_eq!(config.regulation_minutes, 90);
        assert_eq!(config.idempotency_ttl_hours, 24);
        assert_eq!(config.dispatch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_falls_back_on_missing_keys() {
        // none of the engine env vars are set under cargo test
        let config = EngineConfig::from_env();
        assert_eq!(config.regulation_minutes, EngineConfig::default().regulation_minutes);
        assert_eq!(config.queue_capacity, EngineConfig::default().queue_capacity);
    }
}
