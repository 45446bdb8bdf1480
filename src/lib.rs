//! Command isolation and fallback dispatch.
//!
//! Wraps a unit of work as a *command*: the primary runs on its own task,
//! guarded by a circuit breaker, a per-group bulkhead and an optional
//! execution budget. Any failure is routed to a pre-registered fallback, and
//! exactly one terminal outcome is delivered through a [`ResultHandle`].

pub mod command;
pub mod config;
pub mod health;
pub mod observability;
pub mod resilience;

pub use command::{
    CallSite, CommandDescriptor, CommandError, CommandExecutor, ExecutionUnit, FallbackUnit,
    ResultHandle,
};
pub use config::ExecutorConfig;
pub use health::HealthMonitor;
