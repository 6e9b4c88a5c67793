//! Trusted-proxy entries and the registry compiled from configuration.
//!
//! # Responsibilities
//! - Validate every entry of the raw configuration map: header actions,
//!   static CIDRs, source URLs and intervals. The first fault aborts the
//!   whole compile; a process never starts with a partially trusted map.
//! - Perform the blocking first fetch of every dynamic source, so the gate
//!   opens with complete lists instead of admitting nobody until the first
//!   background tick.
//! - Answer request-time lookups in declaration order.
//!
//! # Data Flow
//! ```text
//! GateConfig --compile--> TrustRegistry --lookup(ip)--> &TrustedProxy
//!                                |                          |
//!                        initial refresh             header actions
//! ```

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::header::HeaderName;
use reqwest::Client;
use url::Url;

use crate::config::schema::{DynamicSourceConfig, GateConfig, HeaderActionConfig, HeaderActionKind};
use crate::error::ConfigError;
use crate::http::headers::HeaderAction;
use crate::registry::interval::Interval;
use crate::registry::source::{DynamicSource, SourceOrigin, FETCH_TIMEOUT};
use crate::registry::subnet::{parse_subnet, SubnetSet};

/// One named trusted reverse-proxy network: a static subnet set, any number
/// of dynamically sourced sets, and the header rewrite applied to requests
/// it admits.
#[derive(Debug)]
pub struct TrustedProxy {
    name: String,
    static_set: SubnetSet,
    sources: Vec<Arc<DynamicSource>>,
    actions: Vec<HeaderAction>,
}

impl TrustedProxy {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether any of this entry's subnets, static or dynamic, contains
    /// the address.
    pub fn contains(&self, ip: IpAddr) -> bool {
        if self.static_set.contains(ip) {
            return true;
        }
        self.sources.iter().any(|source| source.contains(ip))
    }

    pub fn actions(&self) -> &[HeaderAction] {
        &self.actions
    }

    pub fn sources(&self) -> &[Arc<DynamicSource>] {
        &self.sources
    }

    /// Current number of subnets across the static set and every source.
    pub fn subnet_count(&self) -> usize {
        self.static_set.len() + self.sources.iter().map(|s| s.len()).sum::<usize>()
    }
}

/// Every trusted-proxy entry, in configuration-declared order.
#[derive(Debug, Default)]
pub struct TrustRegistry {
    entries: Vec<TrustedProxy>,
}

impl TrustRegistry {
    /// Validate and compile the configuration map.
    ///
    /// Parses every static CIDR, interval and source URL, and performs the
    /// blocking first refresh of each dynamic source. Any fault is fatal;
    /// the error names the offending entry and value.
    pub async fn compile(config: &GateConfig) -> Result<Self, ConfigError> {
        if config.map.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("proxy-gate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ConfigError::FetchClient {
                reason: err.to_string(),
            })?;

        let mut entries = Vec::with_capacity(config.map.len());

        for (name, raw) in &config.map {
            if raw.static_cidrs.is_empty() && raw.dynamic_cidrs.is_empty() {
                return Err(ConfigError::NoSubnets { name: name.clone() });
            }

            let actions = compile_actions(name, &raw.header_actions)?;

            let mut nets = Vec::with_capacity(raw.static_cidrs.len());
            for cidr in &raw.static_cidrs {
                let net = parse_subnet(cidr).ok_or_else(|| ConfigError::InvalidStaticCidr {
                    name: name.clone(),
                    cidr: cidr.clone(),
                })?;
                nets.push(net);
            }
            let static_set = SubnetSet::new(nets);

            let mut sources = Vec::with_capacity(raw.dynamic_cidrs.len());
            for raw_source in &raw.dynamic_cidrs {
                let source = compile_source(name, raw_source, &client)?;
                let outcome =
                    source
                        .refresh()
                        .await
                        .map_err(|err| ConfigError::InitialFetch {
                            name: name.clone(),
                            url: raw_source.url.clone(),
                            source: err,
                        })?;
                tracing::info!(
                    proxy = %name,
                    endpoint = %source.origin(),
                    added = outcome.added,
                    total = outcome.total,
                    "subnet list fetched"
                );
                sources.push(Arc::new(source));
            }

            let entry = TrustedProxy {
                name: name.clone(),
                static_set,
                sources,
                actions,
            };
            tracing::info!(proxy = %name, subnets = entry.subnet_count(), "trusted proxy ready");
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    /// First entry in declared order whose subnets contain the address.
    pub fn lookup(&self, ip: IpAddr) -> Option<&TrustedProxy> {
        self.entries.iter().find(|entry| entry.contains(ip))
    }

    pub fn entries(&self) -> &[TrustedProxy] {
        &self.entries
    }
}

fn compile_actions(
    name: &str,
    raw: &[HeaderActionConfig],
) -> Result<Vec<HeaderAction>, ConfigError> {
    let mut actions = Vec::with_capacity(raw.len());
    for (index, action) in raw.iter().enumerate() {
        if action.source.is_empty() {
            return Err(ConfigError::MissingActionField {
                name: name.to_string(),
                index,
                field: "source",
            });
        }
        let source = parse_header_name(name, index, &action.source)?;
        let compiled = match action.kind {
            HeaderActionKind::Delete => HeaderAction::Delete { source },
            HeaderActionKind::Copy => HeaderAction::Copy {
                source,
                target: require_target(name, index, action)?,
            },
            HeaderActionKind::Rename => HeaderAction::Rename {
                source,
                target: require_target(name, index, action)?,
            },
        };
        actions.push(compiled);
    }
    Ok(actions)
}

fn require_target(
    name: &str,
    index: usize,
    action: &HeaderActionConfig,
) -> Result<HeaderName, ConfigError> {
    let raw = action
        .target
        .as_deref()
        .filter(|target| !target.is_empty())
        .ok_or_else(|| ConfigError::MissingActionField {
            name: name.to_string(),
            index,
            field: "target",
        })?;
    parse_header_name(name, index, raw)
}

fn parse_header_name(name: &str, index: usize, raw: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::try_from(raw).map_err(|_| ConfigError::InvalidHeaderName {
        name: name.to_string(),
        index,
        value: raw.to_string(),
    })
}

fn compile_source(
    name: &str,
    raw: &DynamicSourceConfig,
    client: &Client,
) -> Result<DynamicSource, ConfigError> {
    let parsed = Url::parse(&raw.url).map_err(|_| ConfigError::InvalidSourceUrl {
        name: name.to_string(),
        url: raw.url.clone(),
    })?;

    let origin = match parsed.scheme() {
        "file" => {
            let path = parsed
                .to_file_path()
                .map_err(|_| ConfigError::InvalidSourceUrl {
                    name: name.to_string(),
                    url: raw.url.clone(),
                })?;
            SourceOrigin::File(path)
        }
        "http" | "https" => SourceOrigin::Remote {
            url: parsed,
            client: client.clone(),
        },
        _ => {
            return Err(ConfigError::UnsupportedScheme {
                name: name.to_string(),
                url: raw.url.clone(),
            });
        }
    };

    let interval = match raw.interval.as_deref().filter(|value| !value.is_empty()) {
        None => None,
        Some(raw_interval) => Some(Interval::parse(raw_interval).ok_or_else(|| {
            ConfigError::InvalidInterval {
                name: name.to_string(),
                url: raw.url.clone(),
                raw: raw_interval.to_string(),
            }
        })?),
    };

    Ok(DynamicSource::new(origin, interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> GateConfig {
        toml::from_str(raw).unwrap()
    }

    async fn compile_err(raw: &str) -> String {
        TrustRegistry::compile(&config(raw))
            .await
            .unwrap_err()
            .to_string()
    }

    #[tokio::test]
    async fn test_empty_map_is_rejected() {
        assert_eq!(compile_err("").await, "empty configuration");
    }

    #[tokio::test]
    async fn test_entry_without_subnets_is_rejected() {
        let message = compile_err("[map.cloudflare]\n").await;
        assert!(message.contains("\"cloudflare\""));
        assert!(message.contains("no configured subnets (CIDRs)"));
    }

    #[tokio::test]
    async fn test_action_without_source_is_rejected() {
        let raw = r#"
            [map.edge]
            static_cidrs = ["10.0.0.0/8"]

            [[map.edge.header_actions]]
            action = "delete"
        "#;
        let message = compile_err(raw).await;
        assert!(message.contains("action #0 must contain the \"source\" option"));
    }

    #[tokio::test]
    async fn test_copy_and_rename_require_a_target() {
        for kind in ["copy", "rename"] {
            let raw = format!(
                r#"
                [map.edge]
                static_cidrs = ["10.0.0.0/8"]

                [[map.edge.header_actions]]
                action = "{kind}"
                source = "X-Real-IP"
                "#
            );
            let message = compile_err(&raw).await;
            assert!(
                message.contains("action #0 must contain the \"target\" option"),
                "{kind}: {message}"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_needs_no_target() {
        let raw = r#"
            [map.edge]
            static_cidrs = ["10.0.0.0/8"]

            [[map.edge.header_actions]]
            action = "delete"
            source = "X-Internal-Auth"
        "#;
        let registry = TrustRegistry::compile(&config(raw)).await.unwrap();
        assert_eq!(registry.entries()[0].actions().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_header_name_is_rejected() {
        let raw = r#"
            [map.edge]
            static_cidrs = ["10.0.0.0/8"]

            [[map.edge.header_actions]]
            action = "delete"
            source = "bad header"
        "#;
        let message = compile_err(raw).await;
        assert!(message.contains("the header name \"bad header\" is invalid"));
    }

    #[tokio::test]
    async fn test_invalid_static_cidr_is_rejected() {
        let raw = r#"
            [map.cloudflare]
            static_cidrs = ["173.245.48.0/20", "127.0.0./33"]
        "#;
        let message = compile_err(raw).await;
        assert!(message.contains("the static CIDR \"127.0.0./33\" is invalid"));
    }

    #[tokio::test]
    async fn test_invalid_source_url_is_rejected() {
        let raw = r#"
            [map.edge]
            [[map.edge.dynamic_cidrs]]
            url = "!!!some invalid url!!!"
        "#;
        let message = compile_err(raw).await;
        assert!(message.contains("the url \"!!!some invalid url!!!\" is invalid"));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_rejected() {
        let raw = r#"
            [map.edge]
            [[map.edge.dynamic_cidrs]]
            url = "ftp://lists.example/cidrs"
        "#;
        let message = compile_err(raw).await;
        assert!(message.contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn test_invalid_interval_is_rejected() {
        for bad in ["60x", "0s", "60"] {
            let raw = format!(
                r#"
                [map.edge]
                [[map.edge.dynamic_cidrs]]
                url = "file:///dev/null"
                interval = "{bad}"
                "#
            );
            let message = compile_err(&raw).await;
            assert!(
                message.contains(&format!("invalid interval \"{bad}\"")),
                "{message}"
            );
        }
    }

    #[tokio::test]
    async fn test_empty_interval_means_fetch_once() {
        let raw = r#"
            [map.edge]
            [[map.edge.dynamic_cidrs]]
            url = "file:///dev/null"
            interval = ""
        "#;
        let registry = TrustRegistry::compile(&config(raw)).await.unwrap();
        let sources = registry.entries()[0].sources();
        assert!(sources[0].interval().is_none());
        assert_eq!(sources[0].len(), 0);
    }

    #[tokio::test]
    async fn test_failed_initial_fetch_is_fatal() {
        let raw = r#"
            [map.edge]
            [[map.edge.dynamic_cidrs]]
            url = "file:///definitely/not/there.txt"
        "#;
        let message = compile_err(raw).await;
        assert!(message.contains("endpoint \"file:///definitely/not/there.txt\""));
        assert!(message.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_static_entry_answers_membership() {
        let raw = r#"
            [map.office]
            static_cidrs = ["192.168.0.0/16"]
        "#;
        let registry = TrustRegistry::compile(&config(raw)).await.unwrap();
        let entry = &registry.entries()[0];
        assert!(entry.contains("192.168.1.1".parse().unwrap()));
        assert!(!entry.contains("10.0.0.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_lookup_honors_declaration_order() {
        let raw = r#"
            [map.narrow]
            static_cidrs = ["10.1.0.0/16"]

            [map.wide]
            static_cidrs = ["10.0.0.0/8"]
        "#;
        let registry = TrustRegistry::compile(&config(raw)).await.unwrap();

        let both = "10.1.2.3".parse().unwrap();
        assert_eq!(registry.lookup(both).unwrap().name(), "narrow");

        let wide_only = "10.2.0.1".parse().unwrap();
        assert_eq!(registry.lookup(wide_only).unwrap().name(), "wide");

        assert!(registry.lookup("192.0.2.1".parse().unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_bare_ip_static_entry_trusts_exactly_that_host() {
        let raw = r#"
            [map.edge]
            static_cidrs = ["203.0.113.7"]
        "#;
        let registry = TrustRegistry::compile(&config(raw)).await.unwrap();
        assert!(registry.lookup("203.0.113.7".parse().unwrap()).is_some());
        assert!(registry.lookup("203.0.113.8".parse().unwrap()).is_none());
    }
}
