//! IP gatekeeper for services behind trusted reverse proxies.
//!
//! A request is admitted only when its peer address belongs to one of the
//! configured trusted networks; admitted requests get that entry's header
//! rewrites, everyone else gets the rejection response. Subnet lists come
//! from static configuration and from file or HTTP sources refreshed in
//! the background.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;

pub use config::{load_config, GateConfig};
pub use error::{ConfigError, RefreshError};
pub use http::{gatekeeper, GateServer, GateState, Rejection};
pub use lifecycle::Shutdown;
pub use registry::{spawn_refresh_tasks, TrustRegistry};
