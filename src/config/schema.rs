//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the executor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for a command executor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Per-group concurrency limits.
    pub isolation: IsolationConfig,

    /// Execution budgets.
    pub timeouts: TimeoutConfig,

    /// Built-in circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Per-command overrides, keyed by command key.
    pub commands: HashMap<String, CommandConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ExecutorConfig {
    /// Execution budget for a command: its override, else the global one.
    pub fn execution_timeout(&self, command_key: &str) -> Option<Duration> {
        self.commands
            .get(command_key)
            .and_then(|c| c.execution_timeout_ms)
            .or(self.timeouts.execution_ms)
            .map(Duration::from_millis)
    }

    pub fn fallback_enabled(&self, command_key: &str) -> bool {
        self.commands
            .get(command_key)
            .map(|c| c.fallback_enabled)
            .unwrap_or(true)
    }
}

/// Isolation (bulkhead) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IsolationConfig {
    /// Concurrent primaries allowed per group.
    pub max_concurrent: usize,

    /// Group-specific limits.
    pub groups: HashMap<String, usize>,
}

impl IsolationConfig {
    pub fn limit_for(&self, group_key: &str) -> usize {
        self.groups
            .get(group_key)
            .copied()
            .unwrap_or(self.max_concurrent)
    }
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            groups: HashMap::new(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for a primary attempt in milliseconds. Unset means unbounded.
    pub execution_ms: Option<u64>,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Use the built-in breaker. When false, circuits never open.
    pub enabled: bool,

    /// Consecutive primary failures that open the circuit.
    pub failure_threshold: u32,

    /// Time an open circuit waits before admitting a probe, in milliseconds.
    pub sleep_window_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn sleep_window(&self) -> Duration {
        Duration::from_millis(self.sleep_window_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            sleep_window_ms: 5_000,
        }
    }
}

/// Overrides for a single command.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Budget for this command's primary, in milliseconds.
    pub execution_timeout_ms: Option<u64>,

    /// Whether a supplied fallback may run.
    pub fallback_enabled: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            execution_timeout_ms: None,
            fallback_enabled: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info" or "circuit_command=debug").
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.isolation.limit_for("any"), 10);
        assert_eq!(config.execution_timeout("any"), None);
        assert!(config.fallback_enabled("any"));
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.circuit_breaker.sleep_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ExecutorConfig = toml::from_str(
            r#"
            [timeouts]
            execution_ms = 250

            [isolation.groups]
            inventory = 2

            [commands.reserve]
            execution_timeout_ms = 50
            fallback_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.isolation.limit_for("inventory"), 2);
        assert_eq!(config.isolation.limit_for("billing"), 10);
        assert_eq!(config.execution_timeout("reserve"), Some(Duration::from_millis(50)));
        assert_eq!(config.execution_timeout("other"), Some(Duration::from_millis(250)));
        assert!(!config.fallback_enabled("reserve"));
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }
}
