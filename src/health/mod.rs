//! Command health subsystem.
//!
//! # Data Flow
//! ```text
//! Before a primary attempt:
//!     executor → HealthMonitor::is_open(descriptor)
//!     → open: primary skipped, fallback (if any) runs
//!
//! After a primary attempt:
//!     success → HealthMonitor::record_success(descriptor)
//!     failure → HealthMonitor::record_failure(descriptor)
//! ```
//!
//! # Design Decisions
//! - The executor only talks to the trait; circuit logic lives in implementations
//! - State is per descriptor and shared across concurrent executions
//! - Fallback outcomes never feed health state

pub mod state;

use crate::command::CommandDescriptor;

pub use state::CircuitState;

/// Circuit-breaker policy consulted around every primary attempt.
pub trait HealthMonitor: Send + Sync {
    /// True when the primary must not be attempted.
    fn is_open(&self, descriptor: &CommandDescriptor) -> bool;

    fn record_success(&self, descriptor: &CommandDescriptor);

    fn record_failure(&self, descriptor: &CommandDescriptor);
}

/// Monitor that never opens and records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHealthMonitor;

impl HealthMonitor for NoopHealthMonitor {
    fn is_open(&self, _descriptor: &CommandDescriptor) -> bool {
        false
    }

    fn record_success(&self, _descriptor: &CommandDescriptor) {}

    fn record_failure(&self, _descriptor: &CommandDescriptor) {}
}
