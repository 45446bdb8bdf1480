//! Failure taxonomy for command execution.
//!
//! Every failure raised inside a primary or fallback unit is captured and
//! turned into a [`CommandError`] value that travels through the
//! [`ResultHandle`](crate::command::ResultHandle). Only
//! [`CommandError::DescriptorInvalid`] is returned synchronously from
//! `execute`.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type produced by user-supplied units of work.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Shareable form of [`BoxError`], so terminal outcomes can be cloned to
/// every reader of a handle.
pub type SharedError = Arc<dyn Error + Send + Sync>;

/// Terminal failure of a command invocation.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The descriptor could not identify a command.
    #[error("invalid command descriptor: {0}")]
    DescriptorInvalid(String),

    /// The primary unit returned an error and no fallback handled it.
    #[error("command {command} failed: {source}")]
    Execution { command: String, source: SharedError },

    /// The primary unit panicked and no fallback handled it.
    #[error("command {command} panicked: {message}")]
    Panicked { command: String, message: String },

    /// The primary unit exceeded its execution budget.
    #[error("command {command} timed out after {after:?}")]
    ExecutionTimeout { command: String, after: Duration },

    /// The circuit for this command is open; the primary was not attempted.
    #[error("command {command} short-circuited: circuit is open")]
    ShortCircuited { command: String },

    /// The isolation group had no free capacity; the primary was not attempted.
    #[error("command {command} rejected: group {group} is saturated")]
    Rejected { command: String, group: String },

    /// The fallback itself failed. Its error supersedes the primary failure,
    /// which is kept in `primary` for diagnostics only.
    #[error("fallback for command {command} failed: {source}")]
    Fallback {
        command: String,
        source: SharedError,
        primary: Box<CommandError>,
    },

    /// The caller's wait budget elapsed before a terminal outcome was published.
    /// The worker may still be running.
    #[error("timed out after {waited:?} waiting for command {command}")]
    Timeout { command: String, waited: Duration },

    /// The worker went away without publishing an outcome.
    #[error("command {command} was abandoned before completing")]
    Abandoned { command: String },
}

impl CommandError {
    /// Stable, low-cardinality name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::DescriptorInvalid(_) => "descriptor_invalid",
            CommandError::Execution { .. } => "execution_failure",
            CommandError::Panicked { .. } => "panicked",
            CommandError::ExecutionTimeout { .. } => "execution_timeout",
            CommandError::ShortCircuited { .. } => "short_circuited",
            CommandError::Rejected { .. } => "rejected",
            CommandError::Fallback { .. } => "fallback_failure",
            CommandError::Timeout { .. } => "timeout",
            CommandError::Abandoned { .. } => "abandoned",
        }
    }

    /// The primary failure that led to a failed fallback, if any.
    pub fn primary_failure(&self) -> Option<&CommandError> {
        match self {
            CommandError::Fallback { primary, .. } => Some(primary),
            _ => None,
        }
    }

    /// True when the primary ran and failed, by error or by panic.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            CommandError::Execution { .. } | CommandError::Panicked { .. }
        )
    }

    /// True when only the caller's wait expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_failure_reports_fallback_error() {
        let primary = CommandError::Execution {
            command: "lookup".into(),
            source: Arc::from(BoxError::from("boom")),
        };
        let err = CommandError::Fallback {
            command: "lookup".into(),
            source: Arc::from(BoxError::from("also-boom")),
            primary: Box::new(primary),
        };

        assert_eq!(err.kind(), "fallback_failure");
        assert_eq!(err.to_string(), "fallback for command lookup failed: also-boom");
        assert_eq!(err.source().map(|s| s.to_string()), Some("also-boom".to_string()));
        assert_eq!(err.primary_failure().map(CommandError::kind), Some("execution_failure"));
    }

    #[test]
    fn test_panic_is_an_execution_failure() {
        let err = CommandError::Panicked {
            command: "lookup".into(),
            message: "kaput".into(),
        };
        assert_eq!(err.kind(), "panicked");
        assert!(err.is_execution_failure());
        assert!(!CommandError::ShortCircuited { command: "lookup".into() }.is_execution_failure());
    }

    #[test]
    fn test_timeout_kind() {
        let err = CommandError::Timeout {
            command: "slow".into(),
            waited: Duration::from_millis(100),
        };
        assert!(err.is_timeout());
        assert!(err.primary_failure().is_none());
    }
}
