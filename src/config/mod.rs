//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ExecutorConfig (validated, immutable)
//!     → handed to CommandExecutor
//!
//! On reload:
//!     caller loads a new config via loader.rs
//!     → CommandExecutor::reload swaps the Arc<ExecutorConfig> atomically
//!     → new executions observe the new config, in-flight ones keep theirs
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::CircuitBreakerConfig;
pub use schema::CommandConfig;
pub use schema::ExecutorConfig;
pub use schema::IsolationConfig;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
