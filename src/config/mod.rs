//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → ServerConfig (validated, immutable)
//!     → RouterConfig handed to Router::with_config at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routers are built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdapterConfig, ListenerConfig, LogFormat, ObservabilityConfig, RouterConfig, ServerConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
