//! Command runner.
//!
//! Submits one simulated command to a [`CommandExecutor`] and prints the
//! terminal outcome as JSON. Useful for checking how a configuration treats
//! slow, failing or panicking primaries and their fallbacks.
//!
//! ```text
//! circuit-command --fail boom --fallback safe
//! circuit-command --delay-ms 5000 --wait-ms 100
//! circuit-command --config executor.toml --command reserve --panic
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde_json::json;

use circuit_command::command::{BoxError, CommandDescriptor, ExecutionUnit};
use circuit_command::config::{load_config, ExecutorConfig};
use circuit_command::observability::logging;
use circuit_command::CommandExecutor;

#[derive(Parser)]
#[command(name = "circuit-command")]
#[command(about = "Run a simulated command through the isolation executor", long_about = None)]
struct Cli {
    /// Executor configuration (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "cli")]
    group: String,

    #[arg(long, default_value = "simulated")]
    command: String,

    /// Value returned by a successful primary.
    #[arg(long, default_value = "ok")]
    value: String,

    /// Make the primary fail with this message.
    #[arg(long, conflicts_with = "panic")]
    fail: Option<String>,

    /// Make the primary panic.
    #[arg(long)]
    panic: bool,

    /// Delay before the primary finishes.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Run the primary on the blocking pool.
    #[arg(long)]
    blocking: bool,

    /// Fallback value.
    #[arg(long, conflicts_with = "fallback_fail")]
    fallback: Option<String>,

    /// Make the fallback fail with this message.
    #[arg(long)]
    fallback_fail: Option<String>,

    /// Caller wait budget. Waits indefinitely when unset.
    #[arg(long)]
    wait_ms: Option<u64>,
}

struct Behaviour {
    value: String,
    fail: Option<String>,
    panic: bool,
    delay: Duration,
}

impl Behaviour {
    fn finish(self) -> Result<String, BoxError> {
        if self.panic {
            panic!("simulated panic");
        }
        match self.fail {
            Some(message) => Err(message.into()),
            None => Ok(self.value),
        }
    }

    fn into_unit(self, blocking: bool) -> ExecutionUnit<String> {
        if blocking {
            ExecutionUnit::blocking(move || {
                std::thread::sleep(self.delay);
                self.finish()
            })
        } else {
            ExecutionUnit::new(move || async move {
                tokio::time::sleep(self.delay).await;
                self.finish()
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ExecutorConfig::default(),
    };
    logging::init(&config.observability);

    let executor = CommandExecutor::new(config);
    let descriptor = CommandDescriptor::new(cli.group, cli.command);

    let primary = Behaviour {
        value: cli.value,
        fail: cli.fail,
        panic: cli.panic,
        delay: Duration::from_millis(cli.delay_ms),
    }
    .into_unit(cli.blocking);

    let fallback = match (cli.fallback, cli.fallback_fail) {
        (Some(value), _) => Some(ExecutionUnit::value(value)),
        (None, Some(message)) => Some(ExecutionUnit::ready(Err::<String, BoxError>(message.into()))),
        (None, None) => None,
    };

    let handle = executor.execute(descriptor, primary, fallback)?;
    tracing::debug!(invocation_id = %handle.invocation_id(), "Command submitted");

    let outcome = handle.wait(cli.wait_ms.map(Duration::from_millis)).await;
    let report = match &outcome {
        Ok(value) => json!({
            "command": handle.descriptor(),
            "invocation_id": handle.invocation_id(),
            "outcome": "ok",
            "value": value,
        }),
        Err(e) => json!({
            "command": handle.descriptor(),
            "invocation_id": handle.invocation_id(),
            "outcome": e.kind(),
            "error": e.to_string(),
            "primary_error": e.primary_failure().map(ToString::to_string),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
