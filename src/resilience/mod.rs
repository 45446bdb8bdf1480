//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Primary attempt:
//!     → circuit_breaker.rs (fail fast while the circuit is open)
//!     → bulkhead.rs (reserve a slot in the command's group)
//!     → timeouts.rs (enforce the execution budget)
//!     → outcome recorded back into circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Every guard failure is routed to the fallback like any other failure
//! - No automatic retries; retrying is the caller's decision
//! - Circuit breaker prevents cascading failures

pub mod bulkhead;
pub mod circuit_breaker;
pub mod timeouts;

pub use bulkhead::Bulkheads;
pub use circuit_breaker::CircuitBreakerMonitor;
