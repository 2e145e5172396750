//! Passive report listener
//!
//! Formats unsolicited attribute reports and appends them to a shared
//! rolling log. Runs alongside operator commands, so the log and the last
//! report sit behind locks; readers see a consistent, possibly slightly
//! stale, view.

use std::sync::Arc;

use attr_link::AttributeReport;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::{self, DisplayMode};
use crate::rolling_log::{HistoryEntry, RollingLog, REPORT_LOG_CAPACITY};

#[derive(Clone)]
pub struct ReportListener {
    log: Arc<RwLock<RollingLog<HistoryEntry>>>,
    last_report: Arc<RwLock<Option<String>>>,
}

impl ReportListener {
    pub fn new() -> Self {
        Self {
            log: Arc::new(RwLock::new(RollingLog::new(REPORT_LOG_CAPACITY))),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Record one report: one log line per attribute, friendly formatting
    pub fn handle(&self, report: &AttributeReport) {
        if report.attributes.is_empty() {
            debug!("Ignoring empty report on ep{}", report.endpoint);
            return;
        }

        let lines: Vec<String> = report
            .attributes
            .iter()
            .map(|(id, value)| {
                format!(
                    "ep{} {} = {}",
                    report.endpoint,
                    id,
                    codec::format_value(value, DisplayMode::Friendly)
                )
            })
            .collect();

        debug!(
            "report ep{} ({}): {} attributes",
            report.endpoint,
            report.namespace,
            lines.len()
        );

        self.log
            .write()
            .extend(lines.iter().cloned().map(HistoryEntry::new));
        *self.last_report.write() = Some(lines.join("\n"));
    }

    /// Consume reports until the channel closes or the returned token is
    /// cancelled.
    pub fn spawn(
        &self,
        mut reports: mpsc::UnboundedReceiver<AttributeReport>,
    ) -> (tokio::task::JoinHandle<()>, CancellationToken) {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let listener = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    report = reports.recv() => match report {
                        Some(report) => listener.handle(&report),
                        None => {
                            debug!("Report channel closed");
                            break;
                        },
                    },
                    () = task_token.cancelled() => {
                        info!("Report listener received cancellation signal, shutting down");
                        break;
                    }
                }
            }
        });

        (handle, token)
    }

    /// Log lines, oldest first
    pub fn render(&self) -> String {
        self.log.read().render()
    }

    pub fn last_report(&self) -> Option<String> {
        self.last_report.read().clone()
    }

    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    /// Clear the log and the last report
    pub fn clear(&self) {
        self.log.write().clear();
        *self.last_report.write() = None;
    }
}

impl Default for ReportListener {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use attr_link::{AttrValue, AttributeId, SimulatedDevice};

    fn report(endpoint: u8, values: &[(u16, i64)]) -> AttributeReport {
        AttributeReport {
            endpoint,
            namespace: "manuSpecificExplorer".to_string(),
            attributes: values
                .iter()
                .map(|(id, v)| (AttributeId(*id), AttrValue::Integer(*v)))
                .collect(),
        }
    }

    #[test]
    fn test_handle_formats_and_tags_endpoint() {
        let listener = ReportListener::new();
        listener.handle(&report(2, &[(0x0515, 0x0a), (0x0516, 0x0100)]));

        assert_eq!(listener.len(), 2);
        let text = listener.render();
        assert!(text.contains("ep2 0x0515 = 10 (0x0A)"));
        assert!(text.contains("ep2 0x0516 = 256 (0x0100) [01 00]"));
        assert_eq!(
            listener.last_report().unwrap(),
            "ep2 0x0515 = 10 (0x0A)\nep2 0x0516 = 256 (0x0100) [01 00]"
        );
    }

    #[test]
    fn test_empty_report_keeps_last_report() {
        let listener = ReportListener::new();
        listener.handle(&report(1, &[(0x0524, 0x14)]));
        listener.handle(&report(1, &[]));

        assert_eq!(listener.len(), 1);
        assert_eq!(listener.last_report().unwrap(), "ep1 0x0524 = 20 (0x14)");
    }

    #[test]
    fn test_log_is_capped() {
        let listener = ReportListener::new();
        for i in 0..60 {
            listener.handle(&report(1, &[(0x0515, i)]));
        }
        assert_eq!(listener.len(), REPORT_LOG_CAPACITY);
        assert!(listener.render().lines().next().unwrap().ends_with("10 (0x0A)"));
        assert_eq!(listener.last_report().unwrap(), "ep1 0x0515 = 59 (0x3B)");

        listener.clear();
        assert!(listener.is_empty());
        assert!(listener.last_report().is_none());
    }

    #[tokio::test]
    async fn test_spawned_listener_filters_by_namespace() {
        let device = SimulatedDevice::seeded("manuSpecificExplorer");
        let listener = ReportListener::new();
        let (handle, token) = listener.spawn(device.subscribe("manuSpecificExplorer"));

        let mut other = report(1, &[(0x0001, 1)]);
        other.namespace = "genBasic".to_string();
        device.emit_report(other);
        device.emit_report(report(1, &[(0x0524, 0x14)]));

        for _ in 0..50 {
            if !listener.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(listener.len(), 1);
        assert!(listener.render().ends_with("ep1 0x0524 = 20 (0x14)"));

        token.cancel();
        handle.await.unwrap();
    }
}
