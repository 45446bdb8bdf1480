//! Command executor.
//!
//! # Responsibilities
//! - Validate the descriptor before anything is scheduled
//! - Run the primary on its own task, guarded by circuit, bulkhead and budget
//! - Route any primary failure to the fallback, if one is present and enabled
//! - Publish exactly one terminal outcome to the caller's handle
//!
//! # Design Decisions
//! - `execute` never blocks; the caller only waits on the handle
//! - Failures and panics become data, the worker task never dies abnormally
//! - A failed fallback reports its own error; the primary failure is kept as
//!   context on the error
//! - Health is fed by primary attempts only

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::Instrument;

use crate::command::builder::CommandBuilder;
use crate::command::descriptor::CommandDescriptor;
use crate::command::error::{CommandError, SharedError};
use crate::command::handle::ResultHandle;
use crate::command::unit::{ExecutionUnit, FallbackUnit, UnitOutcome, UnitPanic};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::ExecutorConfig;
use crate::health::{HealthMonitor, NoopHealthMonitor};
use crate::observability::metrics;
use crate::resilience::timeouts::{self, Elapsed};
use crate::resilience::{Bulkheads, CircuitBreakerMonitor};

struct Inner {
    runtime: Handle,
    monitor: Arc<dyn HealthMonitor>,
    bulkheads: Bulkheads,
    config: ArcSwap<ExecutorConfig>,
}

/// Runs commands under isolation with fallback dispatch.
///
/// Cheap to clone; clones share health state, bulkheads and configuration.
#[derive(Clone)]
pub struct CommandExecutor {
    inner: Arc<Inner>,
}

impl CommandExecutor {
    /// Executor on the current Tokio runtime, with the health monitor the
    /// config asks for.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: ExecutorConfig) -> Self {
        let monitor = default_monitor(&config);
        Self::with_runtime(config, monitor, Handle::current())
    }

    /// Executor on the current Tokio runtime with a caller-supplied monitor.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn with_health_monitor(config: ExecutorConfig, monitor: Arc<dyn HealthMonitor>) -> Self {
        Self::with_runtime(config, monitor, Handle::current())
    }

    /// Executor spawning its workers on `runtime`. Usable from threads that
    /// are not part of any runtime.
    pub fn with_runtime(
        config: ExecutorConfig,
        monitor: Arc<dyn HealthMonitor>,
        runtime: Handle,
    ) -> Self {
        tracing::debug!(
            max_concurrent = config.isolation.max_concurrent,
            circuit_breaker = config.circuit_breaker.enabled,
            "Command executor created"
        );

        Self {
            inner: Arc::new(Inner {
                runtime,
                monitor,
                bulkheads: Bulkheads::new(),
                config: ArcSwap::from_pointee(config),
            }),
        }
    }

    /// Submit a command. Returns immediately with a handle to its outcome.
    ///
    /// Fails synchronously only when the descriptor has no command key.
    pub fn execute<T>(
        &self,
        descriptor: CommandDescriptor,
        primary: ExecutionUnit<T>,
        fallback: Option<FallbackUnit<T>>,
    ) -> Result<ResultHandle<T>, CommandError>
    where
        T: Send + Sync + 'static,
    {
        if let Err(e) = descriptor.validate() {
            tracing::warn!(group = %descriptor.group_key(), error = %e, "Rejected command submission");
            return Err(e);
        }

        let submitted = Instant::now();
        let (publisher, handle) = ResultHandle::pending(descriptor.clone());
        let span = tracing::info_span!(
            "command",
            group = %descriptor.group_key(),
            command = %descriptor.command_key(),
            invocation_id = %handle.invocation_id()
        );

        let inner = self.inner.clone();
        self.inner.runtime.spawn(
            async move {
                let outcome = inner.run(&descriptor, primary, fallback, submitted).await;
                if let Err(e) = publisher.complete(outcome) {
                    tracing::error!(error = %e, "Outcome discarded");
                }
            }
            .instrument(span),
        );

        Ok(handle)
    }

    /// Start composing a command at the call site.
    pub fn command<T>(&self, descriptor: CommandDescriptor) -> CommandBuilder<'_, T>
    where
        T: Send + Sync + 'static,
    {
        CommandBuilder::new(self, descriptor)
    }

    /// Validate and swap in a new configuration. In-flight executions keep
    /// the configuration they started with.
    ///
    /// A changed isolation section replaces every group's bulkhead. Permits
    /// held by in-flight primaries belong to the old bulkhead and are not
    /// counted against the new limit, so a group can briefly run up to
    /// old in-flight plus new limit primaries until they drain.
    pub fn reload(&self, config: ExecutorConfig) -> Result<(), Vec<ValidationError>> {
        validate_config(&config)?;

        let isolation_changed = self.inner.config.load().isolation != config.isolation;
        self.inner.config.store(Arc::new(config));
        if isolation_changed {
            self.inner.bulkheads.reset();
        }

        tracing::info!(isolation_changed, "Executor configuration reloaded");
        Ok(())
    }

    pub fn config(&self) -> Arc<ExecutorConfig> {
        self.inner.config.load_full()
    }

    pub fn health_monitor(&self) -> Arc<dyn HealthMonitor> {
        self.inner.monitor.clone()
    }

    pub fn bulkheads(&self) -> &Bulkheads {
        &self.inner.bulkheads
    }
}

fn default_monitor(config: &ExecutorConfig) -> Arc<dyn HealthMonitor> {
    if config.circuit_breaker.enabled {
        Arc::new(CircuitBreakerMonitor::new(&config.circuit_breaker))
    } else {
        Arc::new(NoopHealthMonitor)
    }
}

impl Inner {
    async fn run<T: Send + 'static>(
        &self,
        descriptor: &CommandDescriptor,
        primary: ExecutionUnit<T>,
        fallback: Option<FallbackUnit<T>>,
        submitted: Instant,
    ) -> Result<T, CommandError> {
        let config = self.config.load_full();

        tracing::debug!(
            blocking = primary.is_blocking(),
            has_fallback = fallback.is_some(),
            "Executing command"
        );

        let (outcome, label) = match self.attempt(descriptor, primary, &config).await {
            Ok(value) => (Ok(value), "success"),
            Err(failure) => match fallback {
                Some(unit) if config.fallback_enabled(descriptor.command_key()) => {
                    let outcome = self.fall_back(descriptor, unit, failure).await;
                    let label = if outcome.is_ok() {
                        "fallback_success"
                    } else {
                        "fallback_failure"
                    };
                    (outcome, label)
                }
                unit => {
                    tracing::warn!(
                        error = %failure,
                        kind = failure.kind(),
                        fallback_disabled = unit.is_some(),
                        "Command failed without fallback"
                    );
                    let label = failure.kind();
                    (Err(failure), label)
                }
            },
        };

        metrics::record_execution(descriptor, label, submitted.elapsed());
        outcome
    }

    async fn attempt<T: Send + 'static>(
        &self,
        descriptor: &CommandDescriptor,
        primary: ExecutionUnit<T>,
        config: &ExecutorConfig,
    ) -> Result<T, CommandError> {
        let command = descriptor.command_key().to_string();

        if self.monitor.is_open(descriptor) {
            tracing::debug!("Circuit open, primary skipped");
            metrics::record_short_circuit(descriptor);
            return Err(CommandError::ShortCircuited { command });
        }

        let Some(_permit) = self
            .bulkheads
            .try_acquire(descriptor.group_key(), &config.isolation)
        else {
            tracing::debug!(
                limit = config.isolation.limit_for(descriptor.group_key()),
                "Group saturated, primary rejected"
            );
            metrics::record_rejection(descriptor);
            self.monitor.record_failure(descriptor);
            return Err(CommandError::Rejected {
                command,
                group: descriptor.group_key().to_string(),
            });
        };

        let budget = config.execution_timeout(&command);
        let result = match timeouts::with_budget(budget, primary.invoke()).await {
            Ok(UnitOutcome::Completed(value)) => Ok(value),
            Ok(UnitOutcome::Failed(source)) => Err(CommandError::Execution { command, source }),
            Ok(UnitOutcome::Panicked(message)) => Err(CommandError::Panicked { command, message }),
            Err(Elapsed(after)) => Err(CommandError::ExecutionTimeout { command, after }),
        };

        match &result {
            Ok(_) => self.monitor.record_success(descriptor),
            Err(e) => {
                tracing::debug!(error = %e, "Primary failed");
                self.monitor.record_failure(descriptor);
            }
        }
        result
    }

    async fn fall_back<T: Send + 'static>(
        &self,
        descriptor: &CommandDescriptor,
        fallback: FallbackUnit<T>,
        primary: CommandError,
    ) -> Result<T, CommandError> {
        tracing::info!(
            primary_error = %primary,
            kind = primary.kind(),
            "Invoking fallback"
        );

        let source: SharedError = match fallback.invoke().await {
            UnitOutcome::Completed(value) => {
                metrics::record_fallback(descriptor, true);
                return Ok(value);
            }
            UnitOutcome::Failed(e) => e,
            UnitOutcome::Panicked(message) => Arc::new(UnitPanic(message)),
        };

        metrics::record_fallback(descriptor, false);
        tracing::warn!(error = %source, "Fallback failed");

        Err(CommandError::Fallback {
            command: descriptor.command_key().to_string(),
            source,
            primary: Box::new(primary),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::error::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn descriptor() -> CommandDescriptor {
        CommandDescriptor::new("tests", "executor")
    }

    #[tokio::test]
    async fn test_disabled_fallback_is_not_invoked() {
        let mut config = ExecutorConfig::default();
        config.commands.insert(
            "executor".into(),
            crate::config::CommandConfig {
                execution_timeout_ms: None,
                fallback_enabled: false,
            },
        );
        let executor = CommandExecutor::new(config);

        let handle = executor
            .execute(
                descriptor(),
                ExecutionUnit::<u32>::ready(Err("boom")),
                Some(ExecutionUnit::value(1)),
            )
            .unwrap();

        let err = handle.wait(Some(Duration::from_secs(5))).await.unwrap_err();
        assert_eq!(err.kind(), "execution_failure");
    }

    #[tokio::test]
    async fn test_reload_rejects_invalid_config() {
        let executor = CommandExecutor::new(ExecutorConfig::default());

        let mut bad = ExecutorConfig::default();
        bad.isolation.max_concurrent = 0;
        assert!(executor.reload(bad).is_err());
        assert_eq!(executor.config().isolation.max_concurrent, 10);

        let mut good = ExecutorConfig::default();
        good.timeouts.execution_ms = Some(20);
        executor.reload(good).unwrap();
        assert_eq!(executor.config().timeouts.execution_ms, Some(20));
    }

    #[derive(Default)]
    struct Durations(std::sync::Mutex<Vec<f64>>);

    impl ::metrics::HistogramFn for Durations {
        fn record(&self, value: f64) {
            self.0.lock().unwrap().push(value);
        }
    }

    struct DurationRecorder(Arc<Durations>);

    impl ::metrics::Recorder for DurationRecorder {
        fn describe_counter(&self, _: ::metrics::KeyName, _: Option<::metrics::Unit>, _: ::metrics::SharedString) {}
        fn describe_gauge(&self, _: ::metrics::KeyName, _: Option<::metrics::Unit>, _: ::metrics::SharedString) {}
        fn describe_histogram(&self, _: ::metrics::KeyName, _: Option<::metrics::Unit>, _: ::metrics::SharedString) {}

        fn register_counter(&self, _: &::metrics::Key, _: &::metrics::Metadata<'_>) -> ::metrics::Counter {
            ::metrics::Counter::noop()
        }

        fn register_gauge(&self, _: &::metrics::Key, _: &::metrics::Metadata<'_>) -> ::metrics::Gauge {
            ::metrics::Gauge::noop()
        }

        fn register_histogram(&self, key: &::metrics::Key, _: &::metrics::Metadata<'_>) -> ::metrics::Histogram {
            if key.name() == "command_duration_seconds" {
                ::metrics::Histogram::from_arc(self.0.clone())
            } else {
                ::metrics::Histogram::noop()
            }
        }
    }

    #[test]
    fn test_duration_includes_scheduling_delay() {
        let durations = Arc::new(Durations::default());
        let recorder = DurationRecorder(durations.clone());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let executor = CommandExecutor::new(ExecutorConfig::default());
                let handle = executor
                    .execute(descriptor(), ExecutionUnit::value(1u32), None)
                    .unwrap();

                // The worker cannot start until this thread yields.
                std::thread::sleep(Duration::from_millis(50));
                handle.wait(Some(Duration::from_secs(5))).await.unwrap();
            })
        });

        let recorded = durations.0.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0] >= 0.05, "recorded {}s", recorded[0]);
    }

    #[tokio::test]
    async fn test_primary_failures_feed_health_monitor() {
        #[derive(Default)]
        struct Counting {
            successes: AtomicUsize,
            failures: AtomicUsize,
        }

        impl HealthMonitor for Counting {
            fn is_open(&self, _: &CommandDescriptor) -> bool {
                false
            }
            fn record_success(&self, _: &CommandDescriptor) {
                self.successes.fetch_add(1, Ordering::SeqCst);
            }
            fn record_failure(&self, _: &CommandDescriptor) {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }

        let monitor = Arc::new(Counting::default());
        let executor = CommandExecutor::with_health_monitor(ExecutorConfig::default(), monitor.clone());

        let ok = executor
            .execute(descriptor(), ExecutionUnit::value(1u32), None)
            .unwrap();
        ok.wait(None).await.unwrap();

        let failed = executor
            .execute(
                descriptor(),
                ExecutionUnit::<u32>::ready(Err::<u32, BoxError>("boom".into())),
                Some(ExecutionUnit::<u32>::ready(Err("fallback boom"))),
            )
            .unwrap();
        failed.wait(None).await.unwrap_err();

        assert_eq!(monitor.successes.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.failures.load(Ordering::SeqCst), 1);
    }
}
