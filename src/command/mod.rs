//! Command isolation and fallback dispatch.
//!
//! # Data Flow
//! ```text
//! Caller:
//!     CommandDescriptor + ExecutionUnit (+ fallback)
//!     → executor.rs (validate, spawn worker, return handle)
//!
//! Worker:
//!     → resilience (circuit, bulkhead, budget)
//!     → primary unit
//!     → on failure: fallback unit
//!     → handle.rs (publish exactly one outcome)
//!
//! Caller:
//!     ResultHandle::wait / wait_blocking → Result<T, CommandError>
//! ```

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod handle;
pub mod unit;

pub use builder::CommandBuilder;
pub use descriptor::{CallSite, CommandDescriptor};
pub use error::{BoxError, CommandError, SharedError};
pub use executor::CommandExecutor;
pub use handle::{AlreadyCompleted, ResultHandle, ResultPublisher};
pub use unit::{ExecutionUnit, FallbackUnit, UnitPanic};
