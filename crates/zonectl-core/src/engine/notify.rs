// # Notifier
//
// Receives one summary per zone after a push with `--notify`. The built-in
// notifier writes to the log; chat and webhook integrations plug in behind
// the same trait.

use super::report::ZoneReport;
use async_trait::async_trait;
use tracing::{info, warn};

/// Sink for per-zone push summaries
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, zone: &ZoneReport);
}

/// Notifier writing summaries through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, zone: &ZoneReport) {
        match &zone.error {
            Some(error) => warn!(
                zone = %zone.domain,
                changes = zone.changes(),
                "push failed: {error}"
            ),
            None if zone.changes() == 0 => info!(zone = %zone.domain, "no changes"),
            None => info!(
                zone = %zone.domain,
                changes = zone.changes(),
                "pushed {} change(s)",
                zone.changes()
            ),
        }
    }
}
