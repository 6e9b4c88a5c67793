//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gate decisions, refresh passes
//!     → tracing events (structured fields: proxy, endpoint, peer)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Log aggregation (stdout via tracing-subscriber)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod metrics;
