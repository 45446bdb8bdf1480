//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, timeouts > 0, thresholds > 0)
//! - Check the log filter parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ExecutorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ExecutorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("isolation limit for {scope} must be greater than zero")]
    ZeroConcurrency { scope: String },

    #[error("execution timeout for {scope} must be greater than zero")]
    ZeroTimeout { scope: String },

    #[error("circuit breaker failure_threshold must be greater than zero")]
    ZeroFailureThreshold,

    #[error("circuit breaker sleep_window_ms must be greater than zero")]
    ZeroSleepWindow,

    #[error("invalid log filter {0:?}")]
    InvalidLogLevel(String),
}

/// Check every semantic rule, collecting all violations.
pub fn validate_config(config: &ExecutorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.isolation.max_concurrent == 0 {
        errors.push(ValidationError::ZeroConcurrency {
            scope: "all groups".to_string(),
        });
    }
    for (group, limit) in &config.isolation.groups {
        if *limit == 0 {
            errors.push(ValidationError::ZeroConcurrency {
                scope: format!("group {group}"),
            });
        }
    }

    if config.timeouts.execution_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            scope: "all commands".to_string(),
        });
    }
    for (command, overrides) in &config.commands {
        if overrides.execution_timeout_ms == Some(0) {
            errors.push(ValidationError::ZeroTimeout {
                scope: format!("command {command}"),
            });
        }
    }

    if config.circuit_breaker.enabled {
        if config.circuit_breaker.failure_threshold == 0 {
            errors.push(ValidationError::ZeroFailureThreshold);
        }
        if config.circuit_breaker.sleep_window_ms == 0 {
            errors.push(ValidationError::ZeroSleepWindow);
        }
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
