//! Call-site composition of commands.
//!
//! ```ignore
//! let handle = executor
//!     .command(CommandDescriptor::new("inventory", "reserve"))
//!     .fallback_value(Reservation::deferred())
//!     .run(move || async move { client.reserve(sku).await })?;
//! ```

use std::future::Future;

use crate::command::descriptor::CommandDescriptor;
use crate::command::error::{BoxError, CommandError};
use crate::command::executor::CommandExecutor;
use crate::command::handle::ResultHandle;
use crate::command::unit::{ExecutionUnit, FallbackUnit};

/// Pending command submission; finished by one of the `run`/`submit` methods.
#[must_use = "a command does nothing until it is submitted"]
pub struct CommandBuilder<'a, T> {
    executor: &'a CommandExecutor,
    descriptor: CommandDescriptor,
    fallback: Option<FallbackUnit<T>>,
}

impl<'a, T> CommandBuilder<'a, T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(executor: &'a CommandExecutor, descriptor: CommandDescriptor) -> Self {
        Self {
            executor,
            descriptor,
            fallback: None,
        }
    }

    pub fn fallback(mut self, unit: FallbackUnit<T>) -> Self {
        self.fallback = Some(unit);
        self
    }

    /// Async fallback computation.
    pub fn fallback_with<F, Fut, E>(self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.fallback(ExecutionUnit::new(f))
    }

    /// Fixed fallback value.
    pub fn fallback_value(self, value: T) -> Self {
        self.fallback(ExecutionUnit::value(value))
    }

    pub fn submit(self, primary: ExecutionUnit<T>) -> Result<ResultHandle<T>, CommandError> {
        self.executor
            .execute(self.descriptor, primary, self.fallback)
    }

    /// Submit an async primary.
    pub fn run<F, Fut, E>(self, f: F) -> Result<ResultHandle<T>, CommandError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit(ExecutionUnit::new(f))
    }

    /// Submit a thread-blocking primary.
    pub fn run_blocking<F, E>(self, f: F) -> Result<ResultHandle<T>, CommandError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit(ExecutionUnit::blocking(f))
    }
}
