//! HTTP-facing subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address attached)
//!     → server.rs (Axum setup, tracing, timeout)
//!     → gate.rs (trust decision against the registry)
//!         rejected → rejection response, done
//!         admitted → headers.rs (entry's rewrite actions)
//!     → server.rs forwarder → upstream
//! ```

pub mod gate;
pub mod headers;
pub mod server;

pub use gate::{gatekeeper, peer_ip, GateState, Rejection};
pub use headers::HeaderAction;
pub use server::GateServer;
