//! Deferred units of work.
//!
//! An [`ExecutionUnit`] wraps a zero-argument computation. It is consumed by
//! the executor exactly once and never retried. Arguments are captured by the
//! closure when the unit is built.
//!
//! Every unit runs on the blocking pool. Async bodies are driven there with
//! `Handle::block_on`, so a body that holds its thread cannot stall the
//! runtime the caller waits on.

use futures_util::future::{self, Either};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinError;

use crate::command::error::{BoxError, SharedError};

type UnitFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send>>;

enum Body<T> {
    Async(Box<dyn FnOnce() -> UnitFuture<T> + Send>),
    Blocking(Box<dyn FnOnce() -> Result<T, BoxError> + Send>),
}

/// A deferred computation producing `Result<T, BoxError>`.
pub struct ExecutionUnit<T> {
    body: Body<T>,
}

/// Fallbacks share the shape of primaries.
pub type FallbackUnit<T> = ExecutionUnit<T>;

/// Raised in place of a unit that panicked.
#[derive(Debug, Clone, Error)]
#[error("unit panicked: {0}")]
pub struct UnitPanic(pub String);

/// What came out of invoking a unit.
pub(crate) enum UnitOutcome<T> {
    Completed(T),
    Failed(SharedError),
    Panicked(String),
}

impl<T: Send + 'static> ExecutionUnit<T> {
    /// Unit backed by an async computation.
    pub fn new<F, Fut, E>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            body: Body::Async(Box::new(move || {
                Box::pin(async move { f().await.map_err(Into::into) })
            })),
        }
    }

    /// Unit backed by a thread-blocking computation. Runs on the blocking pool.
    pub fn blocking<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            body: Body::Blocking(Box::new(move || f().map_err(Into::into))),
        }
    }

    /// Unit that yields an already known result.
    pub fn ready<E>(result: Result<T, E>) -> Self
    where
        E: Into<BoxError> + Send + 'static,
    {
        Self::new(move || async move { result })
    }

    /// Unit that always succeeds with `value`.
    pub fn value(value: T) -> Self {
        Self::ready(Ok::<T, BoxError>(value))
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self.body, Body::Blocking(_))
    }

    /// Run the unit, turning errors and panics into data.
    ///
    /// Dropping the returned future drops an async body at its next yield
    /// point. A blocking body keeps its thread until it returns.
    pub(crate) async fn invoke(self) -> UnitOutcome<T> {
        match self.body {
            Body::Async(f) => {
                let runtime = Handle::current();
                let (_cancel, cancelled) = oneshot::channel::<()>();
                let joined = tokio::task::spawn_blocking(move || {
                    runtime.block_on(async move {
                        match future::select(f(), cancelled).await {
                            Either::Left((result, _)) => result,
                            Either::Right(_) => Err("unit cancelled".into()),
                        }
                    })
                })
                .await;
                settle(joined)
            }
            Body::Blocking(f) => settle(tokio::task::spawn_blocking(f).await),
        }
    }
}

fn settle<T>(joined: Result<Result<T, BoxError>, JoinError>) -> UnitOutcome<T> {
    match joined {
        Ok(Ok(value)) => UnitOutcome::Completed(value),
        Ok(Err(e)) => UnitOutcome::Failed(Arc::from(e)),
        Err(join) if join.is_panic() => {
            UnitOutcome::Panicked(panic_message(join.into_panic().as_ref()))
        }
        Err(join) => UnitOutcome::Failed(Arc::new(join)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<T> std::fmt::Debug for ExecutionUnit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.body {
            Body::Async(_) => "async",
            Body::Blocking(_) => "blocking",
        };
        f.debug_struct("ExecutionUnit").field("kind", &kind).finish()
    }
}
