//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to Gateway::from_config and the HTTP server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AdminConfig;
pub use schema::CircuitBreakerConfig;
pub use schema::ConcurrencyConfig;
pub use schema::FetchConfig;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RenderConfig;
pub use schema::RetryConfig;
