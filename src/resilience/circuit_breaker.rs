//! Circuit breaker health monitor.
//!
//! # States
//! - Closed: normal operation, primaries are attempted
//! - Open: command assumed broken, primaries fail fast
//! - Half-Open: a single probe tests whether the command recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: after sleep window
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! Half-Open → Half-Open: probe unanswered for a sleep window, next caller probes
//! ```
//!
//! # Design Decisions
//! - Per-descriptor circuit (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open (prevents hammering a recovering dependency)

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::command::CommandDescriptor;
use crate::config::CircuitBreakerConfig;
use crate::health::{CircuitState, HealthMonitor};

/// Breaker state for one descriptor.
#[derive(Debug, Default)]
struct Circuit {
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    /// Milliseconds since the monitor's epoch at which the circuit last
    /// opened or admitted a probe.
    opened_at_ms: AtomicU64,
}

impl Circuit {
    fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: CircuitState, to: CircuitState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Consecutive-failure circuit breaker shared by all executions.
#[derive(Debug)]
pub struct CircuitBreakerMonitor {
    circuits: DashMap<CommandDescriptor, Arc<Circuit>>,
    failure_threshold: usize,
    sleep_window: Duration,
    epoch: Instant,
}

impl CircuitBreakerMonitor {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            circuits: DashMap::new(),
            failure_threshold: config.failure_threshold.max(1) as usize,
            sleep_window: config.sleep_window(),
            epoch: Instant::now(),
        }
    }

    /// Current state of a descriptor's circuit. Unknown descriptors are closed.
    pub fn state(&self, descriptor: &CommandDescriptor) -> CircuitState {
        self.circuits
            .get(descriptor)
            .map(|c| c.state())
            .unwrap_or(CircuitState::Closed)
    }

    /// Consecutive primary failures recorded while closed.
    pub fn consecutive_failures(&self, descriptor: &CommandDescriptor) -> usize {
        self.circuits
            .get(descriptor)
            .map(|c| c.consecutive_failures.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn circuit(&self, descriptor: &CommandDescriptor) -> Arc<Circuit> {
        if let Some(circuit) = self.circuits.get(descriptor) {
            return circuit.clone();
        }
        self.circuits
            .entry(descriptor.clone())
            .or_default()
            .clone()
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn open(&self, circuit: &Circuit, descriptor: &CommandDescriptor, from: CircuitState) {
        if circuit.transition(from, CircuitState::Open) {
            circuit.opened_at_ms.store(self.now_ms(), Ordering::Release);
            tracing::warn!(
                command = %descriptor,
                from = ?from,
                sleep_window_ms = self.sleep_window.as_millis() as u64,
                "Circuit opened"
            );
        }
    }
}

impl HealthMonitor for CircuitBreakerMonitor {
    fn is_open(&self, descriptor: &CommandDescriptor) -> bool {
        let circuit = self.circuit(descriptor);

        let state = circuit.state();
        if state == CircuitState::Closed {
            return false;
        }

        let opened_at = circuit.opened_at_ms.load(Ordering::Acquire);
        let now = self.now_ms();
        if Duration::from_millis(now.saturating_sub(opened_at)) < self.sleep_window {
            return true;
        }

        // Only the caller that claims the window becomes the probe.
        if circuit
            .opened_at_ms
            .compare_exchange(opened_at, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return true;
        }

        if state == CircuitState::Open {
            circuit.transition(CircuitState::Open, CircuitState::HalfOpen);
            tracing::info!(command = %descriptor, "Circuit half-open, admitting probe");
        } else {
            tracing::info!(command = %descriptor, "Probe unanswered, admitting another");
        }
        false
    }

    fn record_success(&self, descriptor: &CommandDescriptor) {
        let circuit = self.circuit(descriptor);
        circuit.consecutive_failures.store(0, Ordering::Relaxed);

        if circuit.transition(CircuitState::HalfOpen, CircuitState::Closed) {
            tracing::info!(command = %descriptor, "Circuit closed after successful probe");
        }
    }

    fn record_failure(&self, descriptor: &CommandDescriptor) {
        let circuit = self.circuit(descriptor);

        match circuit.state() {
            CircuitState::HalfOpen => self.open(&circuit, descriptor, CircuitState::HalfOpen),
            CircuitState::Open => {}
            CircuitState::Closed => {
                let failures = circuit.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.failure_threshold {
                    circuit.consecutive_failures.store(0, Ordering::Relaxed);
                    self.open(&circuit, descriptor, CircuitState::Closed);
                }
            }
        }
    }
}
