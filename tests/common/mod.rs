//! Shared utilities for integration testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_command::command::{BoxError, ExecutionUnit};
use circuit_command::{CommandDescriptor, CommandExecutor, ExecutorConfig};

/// Generous bound for waits that are expected to resolve.
#[allow(dead_code)]
pub const SETTLE: Duration = Duration::from_secs(5);

#[allow(dead_code)]
pub fn descriptor(command: &str) -> CommandDescriptor {
    CommandDescriptor::new("integration", command)
}

/// Executor with the breaker disabled, so repeated failures never short-circuit.
#[allow(dead_code)]
pub fn executor_without_breaker() -> CommandExecutor {
    let mut config = ExecutorConfig::default();
    config.circuit_breaker.enabled = false;
    CommandExecutor::new(config)
}

/// Unit that fails with `message`.
#[allow(dead_code)]
pub fn failing<T: Send + 'static>(message: &'static str) -> ExecutionUnit<T> {
    ExecutionUnit::ready(Err::<T, BoxError>(message.into()))
}

/// Unit that never completes.
#[allow(dead_code)]
pub fn never<T: Send + 'static>() -> ExecutionUnit<T> {
    ExecutionUnit::new(|| std::future::pending::<Result<T, BoxError>>())
}

/// Unit that records its invocation and then returns `value`.
#[allow(dead_code)]
pub fn counted<T: Send + 'static>(calls: &Arc<AtomicU32>, value: T) -> ExecutionUnit<T> {
    let calls = calls.clone();
    ExecutionUnit::new(move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<T, BoxError>(value)
    })
}

/// Unit that records its invocation and then fails.
#[allow(dead_code)]
pub fn counted_failure<T: Send + 'static>(calls: &Arc<AtomicU32>, message: &'static str) -> ExecutionUnit<T> {
    let calls = calls.clone();
    ExecutionUnit::new(move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<T, BoxError>(message.into())
    })
}
