//! Batch orchestrator
//!
//! Drives ordered, paced reads and writes over id lists, inclusive ranges and
//! write-spec lists. Size caps are checked before any request is sent; after
//! that, a failing item becomes that item's outcome and the rest still run.

use attr_link::{AttributeId, AttributeTransport, Endpoint};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{AttributeClient, ReadOutcome};
use crate::codec::{self, DisplayMode};
use crate::error::{ExplorerError, Result};
use crate::pacing::{Pacer, CANCELLED};
use crate::rolling_log::{HistoryEntry, RollingLog};
use crate::write_spec::WriteSpec;

// Batch size limits
pub const MAX_LIST_READ: usize = 64;
pub const MAX_RANGE_SCAN: usize = 128;
pub const MAX_BULK_WRITE: usize = 32;

/// How an item counts towards the batch summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded,
    Failed,
    Empty,
}

/// Per-item outcome carried by a [`BatchResult`]
pub trait ItemOutcome {
    fn kind(&self) -> OutcomeKind;

    /// Display line for this item
    fn line(&self, label: &str, mode: DisplayMode) -> String;

    /// Summary line over the counts
    fn summarize(succeeded: usize, failed: usize, empty: usize, total: usize) -> String;

    /// Outcome recorded for items skipped after cancellation
    fn cancelled() -> Self;
}

impl ItemOutcome for ReadOutcome {
    fn kind(&self) -> OutcomeKind {
        match self {
            ReadOutcome::Value(_) => OutcomeKind::Succeeded,
            ReadOutcome::Empty => OutcomeKind::Empty,
            ReadOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    fn line(&self, label: &str, mode: DisplayMode) -> String {
        ReadOutcome::line(self, label, mode)
    }

    fn summarize(succeeded: usize, failed: usize, empty: usize, total: usize) -> String {
        format!("{succeeded} found, {failed} errors, {empty} empty (of {total})")
    }

    fn cancelled() -> Self {
        ReadOutcome::Failed(CANCELLED.to_string())
    }
}

/// Outcome of one bulk-write item (no read-back)
#[derive(Debug, Clone, PartialEq)]
pub enum BulkWriteOutcome {
    Written(WriteSpec),
    Failed(String),
}

impl ItemOutcome for BulkWriteOutcome {
    fn kind(&self) -> OutcomeKind {
        match self {
            BulkWriteOutcome::Written(_) => OutcomeKind::Succeeded,
            BulkWriteOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    fn line(&self, label: &str, mode: DisplayMode) -> String {
        match self {
            BulkWriteOutcome::Written(spec) => spec.describe(mode),
            BulkWriteOutcome::Failed(msg) => format!("{label}: {msg}"),
        }
    }

    fn summarize(succeeded: usize, failed: usize, _empty: usize, total: usize) -> String {
        format!("{succeeded} ok, {failed} failed (of {total})")
    }

    fn cancelled() -> Self {
        BulkWriteOutcome::Failed(CANCELLED.to_string())
    }
}

/// One entry of a batch, in request order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<O> {
    pub label: String,
    /// `None` when the item's token did not parse
    pub id: Option<AttributeId>,
    pub outcome: O,
}

/// Ordered per-item outcomes plus derived counts. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<O> {
    items: Vec<BatchItem<O>>,
    succeeded: usize,
    failed: usize,
    empty: usize,
}

impl<O: ItemOutcome> BatchResult<O> {
    pub fn new(items: Vec<BatchItem<O>>) -> Self {
        let (mut succeeded, mut failed, mut empty) = (0, 0, 0);
        for item in &items {
            match item.outcome.kind() {
                OutcomeKind::Succeeded => succeeded += 1,
                OutcomeKind::Failed => failed += 1,
                OutcomeKind::Empty => empty += 1,
            }
        }
        Self {
            items,
            succeeded,
            failed,
            empty,
        }
    }

    pub fn items(&self) -> &[BatchItem<O>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<BatchItem<O>> {
        self.items
    }

    pub fn requested(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn empty(&self) -> usize {
        self.empty
    }

    pub fn lines(&self, mode: DisplayMode) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.outcome.line(&item.label, mode))
            .collect()
    }

    pub fn summary(&self) -> String {
        O::summarize(self.succeeded, self.failed, self.empty, self.requested())
    }
}

/// Validate an inclusive range against the scan cap; returns the item count
pub fn validate_range(start: AttributeId, end: AttributeId) -> Result<usize> {
    if start > end {
        return Err(ExplorerError::invalid_format(format!(
            "Range start {start} is after end {end}"
        )));
    }
    let count = usize::from(end.value() - start.value()) + 1;
    if count > MAX_RANGE_SCAN {
        return Err(ExplorerError::limit("attributes in range", count, MAX_RANGE_SCAN));
    }
    Ok(count)
}

/// Parse `START-END` into an inclusive, capped range
pub fn parse_range(text: &str) -> Result<(AttributeId, AttributeId)> {
    let (start, end) = text.trim().split_once('-').ok_or_else(|| {
        ExplorerError::invalid_format(format!("Invalid range '{}' (expected START-END)", text.trim()))
    })?;
    let start = codec::parse_attribute_id(start)?;
    let end = codec::parse_attribute_id(end)?;
    validate_range(start, end)?;
    Ok((start, end))
}

pub struct BatchOrchestrator<'a, T: AttributeTransport> {
    client: &'a AttributeClient<T>,
    pacer: Pacer,
}

impl<'a, T: AttributeTransport> BatchOrchestrator<'a, T> {
    pub fn new(client: &'a AttributeClient<T>, pacer: Pacer) -> Self {
        Self { client, pacer }
    }

    /// Read an ordered list of id tokens. Duplicates are read twice; a token
    /// that does not parse is recorded as a failed item without a request.
    pub async fn read_list(
        &self,
        endpoint: &Endpoint,
        tokens: &[String],
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchResult<ReadOutcome>> {
        if tokens.is_empty() {
            return Err(ExplorerError::invalid_format("No attribute ids given"));
        }
        if tokens.len() > MAX_LIST_READ {
            return Err(ExplorerError::limit("attributes", tokens.len(), MAX_LIST_READ));
        }

        let client = self.client;
        let items = tokens.iter().map(|token| match codec::parse_attribute_id(token) {
            Ok(id) => (id.to_string(), Ok(id)),
            Err(e) => (token.trim().to_string(), Err(e)),
        });

        let outputs = self
            .pacer
            .run(
                items,
                cancel,
                move |(label, parsed)| async move {
                    match parsed {
                        Ok(id) => BatchItem {
                            label,
                            id: Some(id),
                            outcome: client.read_one(endpoint, id).await,
                        },
                        Err(e) => BatchItem {
                            label,
                            id: None,
                            outcome: ReadOutcome::from(e),
                        },
                    }
                },
                |(label, parsed)| BatchItem {
                    label,
                    id: parsed.ok(),
                    outcome: ReadOutcome::cancelled(),
                },
            )
            .await;

        let result = BatchResult::new(outputs);
        log_failures(&result);
        info!("batch read ep{}: {}", endpoint.id, result.summary());
        Ok(result)
    }

    /// Read every id in `[start, end]`, in order
    pub async fn read_range(
        &self,
        endpoint: &Endpoint,
        start: AttributeId,
        end: AttributeId,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchResult<ReadOutcome>> {
        validate_range(start, end)?;

        let client = self.client;
        let ids = (start.value()..=end.value()).map(AttributeId);
        let outputs = self
            .pacer
            .run(
                ids,
                cancel,
                move |id| async move {
                    BatchItem {
                        label: id.to_string(),
                        id: Some(id),
                        outcome: client.read_one(endpoint, id).await,
                    }
                },
                |id| BatchItem {
                    label: id.to_string(),
                    id: Some(id),
                    outcome: ReadOutcome::cancelled(),
                },
            )
            .await;

        Ok(BatchResult::new(outputs))
    }

    /// Range scan with display logging
    pub async fn scan(
        &self,
        endpoint: &Endpoint,
        start: AttributeId,
        end: AttributeId,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchResult<ReadOutcome>> {
        let result = self.read_range(endpoint, start, end, cancel).await?;
        log_failures(&result);
        info!(
            "scan ep{} {}-{}: {}",
            endpoint.id,
            start,
            end,
            result.summary()
        );
        Ok(result)
    }

    /// Write each spec token in order without read-back. Every item's
    /// outcome is appended to `history`, which is truncated once at the end.
    pub async fn bulk_write(
        &self,
        endpoint: &Endpoint,
        tokens: &[String],
        history: &mut RollingLog<HistoryEntry>,
        mode: DisplayMode,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchResult<BulkWriteOutcome>> {
        if tokens.is_empty() {
            return Err(ExplorerError::invalid_format("No write specs given"));
        }
        if tokens.len() > MAX_BULK_WRITE {
            return Err(ExplorerError::limit("writes", tokens.len(), MAX_BULK_WRITE));
        }

        let client = self.client;
        let outputs = self
            .pacer
            .run(
                tokens.iter().map(|t| t.trim().to_string()),
                cancel,
                move |token| async move {
                    let spec = match WriteSpec::parse(&token) {
                        Ok(spec) => spec,
                        Err(e) => {
                            return BatchItem {
                                label: token,
                                id: None,
                                outcome: BulkWriteOutcome::Failed(e.to_string()),
                            }
                        },
                    };
                    let id = spec.id;
                    let outcome = match client.write_one(endpoint, id, &spec.typed).await {
                        Ok(()) => BulkWriteOutcome::Written(spec),
                        Err(e) => BulkWriteOutcome::Failed(e.to_string()),
                    };
                    BatchItem {
                        label: id.to_string(),
                        id: Some(id),
                        outcome,
                    }
                },
                |token| BatchItem {
                    label: token,
                    id: None,
                    outcome: BulkWriteOutcome::cancelled(),
                },
            )
            .await;

        let result = BatchResult::new(outputs);
        log_failures(&result);

        history.extend(result.items().iter().map(|item| {
            HistoryEntry::new(match &item.outcome {
                BulkWriteOutcome::Written(spec) => format!("Write {}: ok", spec.describe(mode)),
                BulkWriteOutcome::Failed(msg) => format!("Write {} failed: {}", item.label, msg),
            })
        }));

        info!("bulk write ep{}: {}", endpoint.id, result.summary());
        Ok(result)
    }
}

fn log_failures<O: ItemOutcome>(result: &BatchResult<O>) {
    for item in result.items() {
        if item.outcome.kind() == OutcomeKind::Failed {
            warn!(
                "{}",
                item.outcome.line(&item.label, DisplayMode::Friendly)
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use attr_link::AttrValue;

    fn read_item(id: u16, outcome: ReadOutcome) -> BatchItem<ReadOutcome> {
        BatchItem {
            label: AttributeId(id).to_string(),
            id: Some(AttributeId(id)),
            outcome,
        }
    }

    #[test]
    fn test_counts_sum_to_requested() {
        let result = BatchResult::new(vec![
            read_item(1, ReadOutcome::Value(AttrValue::Integer(1))),
            read_item(2, ReadOutcome::Empty),
            read_item(3, ReadOutcome::Failed("Not supported".into())),
            read_item(4, ReadOutcome::Value(AttrValue::Integer(4))),
        ]);
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.empty(), 1);
        assert_eq!(result.failed(), 1);
        assert_eq!(
            result.succeeded() + result.failed() + result.empty(),
            result.requested()
        );
        assert_eq!(result.summary(), "2 found, 1 errors, 1 empty (of 4)");
    }

    #[test]
    fn test_write_summary() {
        let spec = WriteSpec::parse("0515:0a").unwrap();
        let result = BatchResult::new(vec![
            BatchItem {
                label: "0x0515".into(),
                id: Some(spec.id),
                outcome: BulkWriteOutcome::Written(spec),
            },
            BatchItem {
                label: "zz".into(),
                id: None,
                outcome: BulkWriteOutcome::Failed("bad".into()),
            },
        ]);
        assert_eq!(result.summary(), "1 ok, 1 failed (of 2)");
        assert_eq!(
            result.lines(DisplayMode::RawHex),
            vec!["0x0515 = 0A (uint8)".to_string(), "zz: bad".to_string()]
        );
    }

    #[test]
    fn test_validate_range() {
        assert_eq!(
            validate_range(AttributeId(0x0515), AttributeId(0x0517)).unwrap(),
            3
        );
        assert_eq!(validate_range(AttributeId(0), AttributeId(127)).unwrap(), 128);
        assert_eq!(
            validate_range(AttributeId(0), AttributeId(128)),
            Err(ExplorerError::limit("attributes in range", 129, MAX_RANGE_SCAN))
        );
        assert!(matches!(
            validate_range(AttributeId(5), AttributeId(4)),
            Err(ExplorerError::InvalidFormat(_))
        ));
        assert_eq!(
            validate_range(AttributeId(0xFFFF), AttributeId(0xFFFF)).unwrap(),
            1
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failed_items_are_logged() {
        use attr_link::{SimulatedDevice, Target};
        use std::sync::Arc;

        let device = Arc::new(SimulatedDevice::seeded("manuSpecificExplorer"));
        let client = AttributeClient::new(
            device,
            Target {
                namespace: "manuSpecificExplorer".to_string(),
                vendor_qualifier: 0x115F,
            },
        );
        let batch = BatchOrchestrator::new(&client, Pacer::from_millis(0));
        let result = batch
            .scan(&Endpoint { id: 1 }, AttributeId(0x0516), AttributeId(0x0517), None)
            .await
            .unwrap();

        assert_eq!(result.failed(), 1);
        assert!(logs_contain("0x0517: Not supported"));
        assert!(logs_contain("1 found, 1 errors, 0 empty (of 2)"));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            parse_range(" 0515-0x0517 ").unwrap(),
            (AttributeId(0x0515), AttributeId(0x0517))
        );
        assert!(parse_range("0515").is_err());
        assert!(parse_range("0515-").is_err());
        assert!(parse_range("0517-0515").is_err());
    }
}
