//! Background refresh loops for dynamic sources.
//!
//! Each source with an interval gets its own task: sleep one period, run
//! one refresh, repeat. Loops are independent on purpose; a slow or dead
//! origin delays only its own list. A failed pass is logged with the
//! time of the next attempt and never tears the loop down.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::entry::TrustRegistry;
use crate::registry::source::DynamicSource;

/// Spawn one refresh loop per dynamic source that declares an interval.
/// Sources without one were fetched at compile time and stay as they are.
///
/// The returned handles complete shortly after `shutdown` is triggered.
pub fn spawn_refresh_tasks(registry: &TrustRegistry, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    for entry in registry.entries() {
        for source in entry.sources() {
            let Some(interval) = source.interval() else {
                continue;
            };
            let period = interval.as_duration();
            tracing::info!(
                proxy = %entry.name(),
                endpoint = %source.origin(),
                interval = %interval,
                next_run = %next_run_at(period),
                "subnet list sync started"
            );
            handles.push(tokio::spawn(refresh_loop(
                entry.name().to_string(),
                source.clone(),
                period,
                shutdown.subscribe(),
            )));
        }
    }
    handles
}

async fn refresh_loop(
    proxy: String,
    source: Arc<DynamicSource>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = sleep(period) => {}
            _ = shutdown.recv() => {
                tracing::debug!(proxy = %proxy, endpoint = %source.origin(), "subnet list sync stopped");
                return;
            }
        }

        match source.refresh().await {
            Ok(outcome) => {
                metrics::record_refresh("ok");
                tracing::info!(
                    proxy = %proxy,
                    endpoint = %source.origin(),
                    added = outcome.added,
                    skipped = outcome.skipped,
                    total = outcome.total,
                    next_run = %next_run_at(period),
                    "subnet list updated"
                );
            }
            Err(err) => {
                metrics::record_refresh("error");
                tracing::error!(
                    proxy = %proxy,
                    endpoint = %source.origin(),
                    error = %err,
                    next_run = %next_run_at(period),
                    "subnet list update failed"
                );
            }
        }
    }
}

/// Wall-clock timestamp of the next tick, for log lines.
///
/// Periods too large to land on a representable date, which only a config
/// with an absurd interval can produce, print as "never". RFC 2822 cannot
/// express years past 9999.
fn next_run_at(period: Duration) -> String {
    let delta = match chrono::Duration::from_std(period) {
        Ok(delta) => delta,
        Err(_) => return "never".to_string(),
    };
    match Utc::now().checked_add_signed(delta) {
        Some(at) if at.year() <= 9999 => at.to_rfc2822(),
        _ => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_run_is_in_the_future() {
        let stamp = next_run_at(Duration::from_secs(3_600));
        // RFC 2822, e.g. "Wed, 26 Aug 2026 12:00:00 +0000".
        assert!(stamp.ends_with("+0000"));
    }

    #[test]
    fn test_absurd_periods_do_not_panic() {
        assert_eq!(next_run_at(Duration::from_secs(u64::MAX)), "never");
        // Representable as a chrono delta, but past year 9999.
        let millennia = Duration::from_secs(999_999 * 604_800);
        assert_eq!(next_run_at(millennia), "never");
    }
}
