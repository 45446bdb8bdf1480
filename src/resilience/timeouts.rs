//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a primary attempt by its configured execution budget
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - An expired async unit is dropped; a blocking unit keeps its thread until
//!   it returns, since threads cannot be cancelled

use std::future::Future;
use std::time::Duration;

/// Budget exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Run `fut` to completion, or until `budget` elapses when one is set.
pub async fn with_budget<F>(budget: Option<Duration>, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match budget {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Elapsed(limit)),
        None => Ok(fut.await),
    }
}
