//! Error taxonomy for the gate.
//!
//! Two families with different blast radius: [`ConfigError`] is fatal and
//! refuses startup, [`RefreshError`] covers a single refresh attempt of one
//! dynamic source and never takes the process down. Entry names, CIDRs and
//! URLs are quoted in messages so operators can grep the offending line out
//! of their configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Faults detected while loading or compiling the configuration.
///
/// Every variant is fatal: the registry either compiles completely or the
/// process does not start serving traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The trusted-proxy map has no entries at all.
    #[error("empty configuration")]
    EmptyRegistry,

    /// An entry declares neither static nor dynamic subnets, so it could
    /// never admit anything.
    #[error("error in {name:?} reverse proxy configuration: no configured subnets (CIDRs)")]
    NoSubnets { name: String },

    #[error("error in {name:?} reverse proxy configuration: action #{index} must contain the {field:?} option")]
    MissingActionField {
        name: String,
        index: usize,
        field: &'static str,
    },

    #[error("error in {name:?} reverse proxy configuration: action #{index}: the header name {value:?} is invalid")]
    InvalidHeaderName {
        name: String,
        index: usize,
        value: String,
    },

    #[error("error in {name:?} reverse proxy configuration: the static CIDR {cidr:?} is invalid")]
    InvalidStaticCidr { name: String, cidr: String },

    #[error("error in {name:?} reverse proxy configuration: the url {url:?} is invalid")]
    InvalidSourceUrl { name: String, url: String },

    #[error("error in {name:?} reverse proxy configuration: the url {url:?} has an unsupported scheme, expected file, http or https")]
    UnsupportedScheme { name: String, url: String },

    #[error("error in {name:?} reverse proxy configuration, endpoint {url:?}: invalid interval {raw:?}")]
    InvalidInterval {
        name: String,
        url: String,
        raw: String,
    },

    /// The blocking startup fetch of a dynamic source failed.
    #[error("error in {name:?} reverse proxy configuration, endpoint {url:?}: {source}")]
    InitialFetch {
        name: String,
        url: String,
        #[source]
        source: RefreshError,
    },

    #[error("the rejection status code {code} is invalid")]
    InvalidRejectionStatus { code: u16 },

    #[error("the upstream url {url:?} is invalid, an absolute http:// url is required")]
    InvalidUpstream { url: String },

    #[error("failed to build the fetch client: {reason}")]
    FetchClient { reason: String },
}

/// Faults of a single refresh attempt of one dynamic source.
///
/// Refresh loops log these and retry at the next tick; only the startup
/// fetch escalates them into a [`ConfigError`].
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("the file {path:?} does not exist")]
    FileMissing { path: PathBuf },

    #[error("no permissions to read the file {path:?}")]
    FileForbidden { path: PathBuf },

    /// Transport-level failure: connect, timeout, or a read error.
    #[error("failed to fetch {origin}: {reason}")]
    Unavailable { origin: String, reason: String },

    #[error("response code {status} is not acceptable")]
    UnacceptableStatus { status: u16 },

    #[error("response body exceeds the {limit} byte limit")]
    OversizedBody { limit: usize },

    /// A malformed line in a local file; the previous set stays published.
    #[error("the CIDR {entry:?} is invalid")]
    InvalidCidr { entry: String },

    /// A malformed line in a remote payload; the published set is cleared.
    #[error("invalid URL content: the CIDR {entry:?} is invalid")]
    InvalidContent { entry: String },
}
