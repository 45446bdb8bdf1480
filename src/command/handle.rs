//! Single-assignment result handle.
//!
//! A [`ResultPublisher`] writes exactly one terminal outcome; any number of
//! [`ResultHandle`] clones read it, either by suspending a task
//! ([`ResultHandle::wait`]) or by blocking a thread
//! ([`ResultHandle::wait_blocking`]).
//!
//! # Design Decisions
//! - Write-once: a second write is rejected with [`AlreadyCompleted`]
//! - The terminal write happens-before every read that observes it
//! - A publisher dropped without writing resolves the handle as abandoned
//! - A wait timeout only bounds the caller; the worker keeps running

use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::command::descriptor::CommandDescriptor;
use crate::command::error::CommandError;

/// A terminal outcome was already published for this handle.
#[derive(Debug, Clone, Error)]
#[error("result for command {command} already completed")]
pub struct AlreadyCompleted {
    pub command: String,
}

struct Slot<T> {
    descriptor: CommandDescriptor,
    invocation_id: Uuid,
    outcome: OnceLock<Result<T, CommandError>>,
    notify: Notify,
    lock: Mutex<()>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn complete(&self, outcome: Result<T, CommandError>) -> Result<(), AlreadyCompleted> {
        self.outcome.set(outcome).map_err(|_| AlreadyCompleted {
            command: self.descriptor.command_key().to_string(),
        })?;

        self.notify.notify_waiters();
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.ready.notify_all();
        Ok(())
    }

    fn timeout(&self, waited: Duration) -> CommandError {
        CommandError::Timeout {
            command: self.descriptor.command_key().to_string(),
            waited,
        }
    }
}

/// Write side of a handle. Held by the worker.
pub struct ResultPublisher<T> {
    slot: Arc<Slot<T>>,
}

impl<T> ResultPublisher<T> {
    /// Publish the terminal outcome.
    pub fn complete(&self, outcome: Result<T, CommandError>) -> Result<(), AlreadyCompleted> {
        self.slot.complete(outcome)
    }
}

impl<T> Drop for ResultPublisher<T> {
    fn drop(&mut self) {
        if self.slot.outcome.get().is_none() {
            let abandoned = CommandError::Abandoned {
                command: self.slot.descriptor.command_key().to_string(),
            };
            // A concurrent completion may win; either way the handle is resolved.
            let _ = self.slot.complete(Err(abandoned));
        }
    }
}

/// Read side of a command invocation.
pub struct ResultHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> ResultHandle<T> {
    /// Create an unresolved handle and the publisher that resolves it.
    pub fn pending(descriptor: CommandDescriptor) -> (ResultPublisher<T>, ResultHandle<T>) {
        let slot = Arc::new(Slot {
            descriptor,
            invocation_id: Uuid::new_v4(),
            outcome: OnceLock::new(),
            notify: Notify::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
        });

        (
            ResultPublisher { slot: slot.clone() },
            ResultHandle { slot },
        )
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.slot.descriptor
    }

    /// Identifier shared by every log event of this invocation.
    pub fn invocation_id(&self) -> Uuid {
        self.slot.invocation_id
    }

    pub fn is_complete(&self) -> bool {
        self.slot.outcome.get().is_some()
    }
}

impl<T: Clone> ResultHandle<T> {
    /// Non-blocking peek at the terminal outcome.
    pub fn try_result(&self) -> Option<Result<T, CommandError>> {
        self.slot.outcome.get().cloned()
    }

    /// Suspend until the outcome is published or `timeout` elapses.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<T, CommandError> {
        match timeout {
            None => self.resolved().await,
            Some(limit) => match tokio::time::timeout(limit, self.resolved()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(self.slot.timeout(limit)),
            },
        }
    }

    async fn resolved(&self) -> Result<T, CommandError> {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.slot.outcome.get() {
                return outcome.clone();
            }
            notified.await;
        }
    }

    /// Block the current thread until the outcome is published or `timeout`
    /// elapses. Must not be called from inside an async task.
    pub fn wait_blocking(&self, timeout: Option<Duration>) -> Result<T, CommandError> {
        let deadline = timeout.map(|limit| Instant::now() + limit);
        let mut guard = self.slot.lock.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            if let Some(outcome) = self.slot.outcome.get() {
                return outcome.clone();
            }

            match deadline {
                None => {
                    guard = self
                        .slot
                        .ready
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(self.slot.timeout(timeout.unwrap_or_default()));
                    }
                    guard = self
                        .slot
                        .ready
                        .wait_timeout(guard, deadline - now)
                        .map(|(g, _)| g)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                }
            }
        }
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("descriptor", &self.slot.descriptor)
            .field("invocation_id", &self.slot.invocation_id)
            .field("complete", &self.is_complete())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> CommandDescriptor {
        CommandDescriptor::new("tests", "handle")
    }

    #[tokio::test]
    async fn test_second_write_is_rejected() {
        let (publisher, handle) = ResultHandle::<u32>::pending(descriptor());

        publisher.complete(Ok(1)).unwrap();
        let err = publisher.complete(Ok(2)).unwrap_err();
        assert_eq!(err.command, "handle");

        assert_eq!(handle.wait(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_every_reader_sees_the_same_outcome() {
        let (publisher, handle) = ResultHandle::<String>::pending(descriptor());
        let other = handle.clone();

        let reader = tokio::spawn(async move { other.wait(None).await });
        tokio::task::yield_now().await;
        publisher.complete(Ok("v".into())).unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), "v");
        assert_eq!(handle.wait(None).await.unwrap(), "v");
        assert_eq!(handle.wait(Some(Duration::ZERO)).await.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_wait_times_out_without_resolving() {
        let (publisher, handle) = ResultHandle::<u32>::pending(descriptor());

        let err = handle.wait(Some(Duration::from_millis(20))).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(!handle.is_complete());

        publisher.complete(Ok(9)).unwrap();
        assert_eq!(handle.try_result().unwrap().unwrap(), 9);
    }

    #[tokio::test]
    async fn test_dropped_publisher_abandons() {
        let (publisher, handle) = ResultHandle::<u32>::pending(descriptor());
        drop(publisher);

        let err = handle.wait(None).await.unwrap_err();
        assert_eq!(err.kind(), "abandoned");
    }

    #[test]
    fn test_wait_blocking_across_threads() {
        let (publisher, handle) = ResultHandle::<u32>::pending(descriptor());

        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            publisher.complete(Ok(42)).unwrap();
        });

        assert_eq!(handle.wait_blocking(Some(Duration::from_secs(5))).unwrap(), 42);
        writer.join().unwrap();
    }

    #[test]
    fn test_wait_blocking_times_out() {
        let (_publisher, handle) = ResultHandle::<u32>::pending(descriptor());

        let started = Instant::now();
        let err = handle.wait_blocking(Some(Duration::from_millis(30))).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
