//! Configuration schema.
//!
//! The shapes here are the raw deserialized form of the TOML file. They
//! carry strings, not parsed types; everything semantic (CIDRs, intervals,
//! source URLs, header names) is validated when the registry is compiled,
//! so a typo is reported with its entry name instead of a serde path.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener and upstream used by the bundled server binary.
    pub server: ServerConfig,

    /// Response sent to untrusted peers; a bare 403 when absent.
    #[serde(rename = "rewrite_403")]
    pub rejection: Option<RejectionConfig>,

    /// Trusted reverse-proxy entries. Declaration order is preserved and
    /// decides which entry wins when subnets overlap.
    pub map: IndexMap<String, ProxyEntryConfig>,

    /// Metrics exposure.
    pub observability: ObservabilityConfig,
}

/// Listener and upstream settings for the server binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the gate listens on.
    pub bind_address: String,

    /// Absolute http:// URL every admitted request is forwarded to.
    pub upstream: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            upstream: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Override for the response sent to untrusted peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RejectionConfig {
    /// Status code of the rejection response.
    pub code: u16,

    /// Body of the rejection response.
    #[serde(default)]
    pub content: String,
}

/// One named trusted reverse-proxy network, still in raw string form.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyEntryConfig {
    /// Header rewrites applied to requests this entry admits.
    pub header_actions: Vec<HeaderActionConfig>,

    /// CIDRs fixed for the lifetime of the process.
    pub static_cidrs: Vec<String>,

    /// Externally sourced CIDR lists.
    pub dynamic_cidrs: Vec<DynamicSourceConfig>,
}

/// Raw header action. Compiled into a validated
/// [`HeaderAction`](crate::http::headers::HeaderAction).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderActionConfig {
    #[serde(rename = "action")]
    pub kind: HeaderActionKind,

    /// Header the action reads. Required for every kind.
    #[serde(default)]
    pub source: String,

    /// Header `copy` and `rename` write. Ignored by `delete`.
    #[serde(default)]
    pub target: Option<String>,
}

/// Closed set of header action kinds; an unknown string fails
/// deserialization outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderActionKind {
    Rename,
    Copy,
    Delete,
}

/// One externally sourced CIDR list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamicSourceConfig {
    /// `file://`, `http://` or `https://` origin of the list.
    pub url: String,

    /// Refresh period such as `90s`, `15m` or `12h`. Absent or empty
    /// means fetch once at startup and never again.
    #[serde(default)]
    pub interval: Option<String>,
}

/// Metrics exposure settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
