//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Compile registry (initial fetches) → Spawn refresh
//!     loops → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → trigger broadcast → server drains, refresh loops exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
