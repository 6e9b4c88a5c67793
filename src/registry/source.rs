//! Dynamic subnet sources.
//!
//! # Responsibilities
//! - Represent one remote or local origin of a subnet list, together with
//!   its optional refresh interval and the currently published set.
//! - Fetch and parse the list on demand. A successful pass builds a
//!   complete replacement set and publishes it with a single atomic swap,
//!   so request-path readers never lock and never observe a half-built
//!   list.
//!
//! # Design Decisions
//! - Failure containment differs by origin. A malformed line in a local
//!   file keeps the previous set published, on the assumption that the
//!   file is mid-edit. A malformed line in a remote payload clears the set
//!   instead: the origin itself is suspect and trusting its other lines
//!   would be guesswork.
//! - Remote bodies are read incrementally and capped at
//!   [`MAX_LIST_BYTES`]; a list origin that streams megabytes is treated
//!   as broken, not buffered.

use std::fmt;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use reqwest::Client;
use url::Url;

use crate::error::RefreshError;
use crate::registry::interval::Interval;
use crate::registry::subnet::{normalize_entry, parse_subnet, SubnetSet};

/// Hard ceiling on a remote list body, in bytes.
pub const MAX_LIST_BYTES: usize = 2000;

/// Transport timeout for remote list fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a dynamic list comes from. Decided once when the configuration is
/// compiled; no unsupported scheme survives to refresh time.
#[derive(Debug, Clone)]
pub enum SourceOrigin {
    /// A local file, reachable on every refresh without the network.
    File(PathBuf),
    /// An HTTP or HTTPS endpoint, fetched with the shared client.
    Remote { url: Url, client: Client },
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::File(path) => write!(f, "file://{}", path.display()),
            SourceOrigin::Remote { url, .. } => write!(f, "{url}"),
        }
    }
}

/// Counters reported by one refresh pass.
///
/// `added` and `skipped` are deltas against the set published before the
/// pass; `total` is the size of the set published by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}

/// One dynamic origin of subnets and its currently published set.
///
/// The set starts empty; the registry performs a blocking first refresh at
/// startup, and sources with an interval are re-fetched by their own
/// background loop afterwards.
pub struct DynamicSource {
    origin: SourceOrigin,
    interval: Option<Interval>,
    current: ArcSwap<SubnetSet>,
}

impl DynamicSource {
    pub fn new(origin: SourceOrigin, interval: Option<Interval>) -> Self {
        Self {
            origin,
            interval,
            current: ArcSwap::from_pointee(SubnetSet::empty()),
        }
    }

    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    pub fn interval(&self) -> Option<Interval> {
        self.interval
    }

    /// Size of the currently published set.
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Whether the currently published set contains the address.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.current.load().contains(ip)
    }

    /// Fetch the origin, parse the payload and publish a replacement set.
    ///
    /// On failure the published set follows the containment rules
    /// described at module level: transport and status failures always
    /// keep the previous set, a malformed file keeps it, a malformed
    /// remote payload clears it.
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        match &self.origin {
            SourceOrigin::File(path) => self.refresh_from_file(path).await,
            SourceOrigin::Remote { url, client } => self.refresh_from_remote(url, client).await,
        }
    }

    async fn refresh_from_file(&self, path: &Path) -> Result<RefreshOutcome, RefreshError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => RefreshError::FileMissing {
                path: path.to_path_buf(),
            },
            ErrorKind::PermissionDenied => RefreshError::FileForbidden {
                path: path.to_path_buf(),
            },
            _ => RefreshError::Unavailable {
                origin: self.origin.to_string(),
                reason: err.to_string(),
            },
        })?;

        let (fresh, outcome) = self
            .scan_lines(content.lines())
            .map_err(|entry| RefreshError::InvalidCidr { entry })?;
        self.current.store(Arc::new(fresh));
        Ok(outcome)
    }

    async fn refresh_from_remote(
        &self,
        url: &Url,
        client: &Client,
    ) -> Result<RefreshOutcome, RefreshError> {
        let mut response = client.get(url.clone()).send().await.map_err(|err| {
            RefreshError::Unavailable {
                origin: self.origin.to_string(),
                reason: err.to_string(),
            }
        })?;

        match response.status().as_u16() {
            200 => {}
            // Not modified: the previous set is still the current list.
            304 => {
                return Ok(RefreshOutcome {
                    added: 0,
                    skipped: 0,
                    total: self.len(),
                });
            }
            status => return Err(RefreshError::UnacceptableStatus { status }),
        }

        let mut body = Vec::new();
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    return Err(RefreshError::Unavailable {
                        origin: self.origin.to_string(),
                        reason: err.to_string(),
                    });
                }
            };
            if body.len() + chunk.len() > MAX_LIST_BYTES {
                return Err(RefreshError::OversizedBody {
                    limit: MAX_LIST_BYTES,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let content = normalize_newlines(&String::from_utf8_lossy(&body));
        match self.scan_lines(content.split('\n')) {
            Ok((fresh, outcome)) => {
                self.current.store(Arc::new(fresh));
                Ok(outcome)
            }
            Err(entry) => {
                // The origin served garbage; stop trusting everything it
                // previously claimed.
                self.current.store(Arc::new(SubnetSet::empty()));
                Err(RefreshError::InvalidContent { entry })
            }
        }
    }

    /// Parse payload lines into a complete replacement set, counting each
    /// line as added or skipped against the pre-refresh set. Blank lines
    /// are ignored. Returns the first offending entry on a parse failure;
    /// nothing is published in that case.
    fn scan_lines<'a, I>(&self, lines: I) -> Result<(SubnetSet, RefreshOutcome), String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let previous = self.current.load();
        let mut nets = Vec::new();
        let mut added = 0;
        let mut skipped = 0;
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let normalized = normalize_entry(line);
            let known = previous.has_entry(&normalized);
            let Some(net) = parse_subnet(line) else {
                return Err(line.to_string());
            };
            if known {
                skipped += 1;
            } else {
                added += 1;
            }
            nets.push(net);
        }
        let total = nets.len();
        Ok((SubnetSet::new(nets), RefreshOutcome { added, skipped, total }))
    }
}

impl fmt::Debug for DynamicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSource")
            .field("origin", &self.origin)
            .field("interval", &self.interval)
            .field("subnets", &self.len())
            .finish()
    }
}

/// Collapse the line-ending zoo into bare newlines: CRLF pairs first, then
/// stray CR, vertical tab and form feed.
fn normalize_newlines(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000B}', '\u{000C}'], "\n")
}
