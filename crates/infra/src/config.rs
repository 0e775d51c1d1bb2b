//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for the storage engine.
///
/// All operations run inside a transaction acquired from a bounded pool;
/// `acquire_timeout` bounds how long a caller blocks for a slot and
/// `lock_timeout` bounds how long a transaction waits for a contended row
/// lock before the conflict surfaces as `ConcurrentModification`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_connections: usize,
    pub acquire_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            acquire_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.max_connections > 0);
        assert!(config.acquire_timeout > Duration::ZERO);
        assert!(config.lock_timeout > Duration::ZERO);
    }

    #[test]
    fn partial_config_deserializes_over_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_connections": 2}"#).unwrap();
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.lock_timeout, EngineConfig::default().lock_timeout);
    }
}
