//! Metrics collection.
//!
//! # Metrics
//! - `command_executions_total` (counter): executions by group, command, outcome
//! - `command_duration_seconds` (histogram): submit-to-outcome latency
//! - `command_fallbacks_total` (counter): fallback invocations by result
//! - `command_short_circuits_total` (counter): primaries skipped by an open circuit
//! - `command_rejections_total` (counter): primaries refused by a saturated group
//!
//! # Design Decisions
//! - Recording only; exporting is left to whichever recorder the host installs
//! - Labels are group and command keys plus a fixed outcome vocabulary

use std::time::Duration;

use crate::command::CommandDescriptor;

/// Record a finished execution.
pub fn record_execution(descriptor: &CommandDescriptor, outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!(
        "command_executions_total",
        "group" => descriptor.group_key().to_string(),
        "command" => descriptor.command_key().to_string(),
        "outcome" => outcome
    )
    .increment(1);

    ::metrics::histogram!(
        "command_duration_seconds",
        "group" => descriptor.group_key().to_string(),
        "command" => descriptor.command_key().to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record a fallback invocation.
pub fn record_fallback(descriptor: &CommandDescriptor, succeeded: bool) {
    let result = if succeeded { "success" } else { "failure" };
    ::metrics::counter!(
        "command_fallbacks_total",
        "group" => descriptor.group_key().to_string(),
        "command" => descriptor.command_key().to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_short_circuit(descriptor: &CommandDescriptor) {
    ::metrics::counter!(
        "command_short_circuits_total",
        "group" => descriptor.group_key().to_string(),
        "command" => descriptor.command_key().to_string()
    )
    .increment(1);
}

pub fn record_rejection(descriptor: &CommandDescriptor) {
    ::metrics::counter!(
        "command_rejections_total",
        "group" => descriptor.group_key().to_string(),
        "command" => descriptor.command_key().to_string()
    )
    .increment(1);
}
