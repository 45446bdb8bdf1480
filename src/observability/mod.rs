//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! CommandExecutor produces:
//!     → logging.rs (structured log events inside a per-invocation span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout by default)
//!     → Whatever metrics recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Invocation ID flows through every event of an execution
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
