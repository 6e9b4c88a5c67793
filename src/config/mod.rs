//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, declaration order kept)
//!     → GateConfig (raw strings)
//!     → registry compile (semantic checks, initial fetches)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All sections have defaults so a map-only config is enough
//! - Syntactic checks (serde) are separated from semantic ones, which run
//!   during registry compilation and report the offending entry by name

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::GateConfig;
pub use schema::ObservabilityConfig;
pub use schema::RejectionConfig;
pub use schema::ServerConfig;
