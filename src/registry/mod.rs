//! Trusted-network registry subsystem.
//!
//! # Data Flow
//! ```text
//! config map (raw strings)
//!     → entry.rs (compile: parse CIDRs, intervals, URLs; initial fetch)
//!     → TrustRegistry (immutable entry list, declared order)
//!     → lookup(ip) on every request
//!
//! Per dynamic source with an interval:
//!     refresh.rs loop ticks
//!     → source.rs fetches and parses the list
//!     → atomic swap of the published SubnetSet
//!     → lookups observe the new list, no locks
//! ```
//!
//! # Design Decisions
//! - The entry list itself never changes at runtime; only the sets inside
//!   dynamic sources are replaced
//! - Validation happens once, at compile time; the request path works with
//!   parsed types only
//! - Each source refreshes on its own schedule, so one dead origin cannot
//!   stall the others

pub mod entry;
pub mod interval;
pub mod refresh;
pub mod source;
pub mod subnet;

pub use entry::{TrustRegistry, TrustedProxy};
pub use interval::Interval;
pub use refresh::spawn_refresh_tasks;
pub use source::{DynamicSource, RefreshOutcome, SourceOrigin, MAX_LIST_BYTES};
pub use subnet::SubnetSet;
