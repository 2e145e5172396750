//! Snapshot engine
//!
//! Captures a range into a [`SnapshotTable`], diffs a table against a fresh
//! read of the same range on the table's own endpoint, and converts tables
//! to and from the JSON interchange form. The engine keeps no state; the
//! caller owns the table.

use std::collections::BTreeMap;
use std::fmt;

use attr_link::{AttrValue, AttributeId, AttributeTransport, Target};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::batch::{self, BatchOrchestrator};
use crate::client::{AttributeClient, ReadOutcome};
use crate::codec::{self, DisplayMode};
use crate::error::{ExplorerError, Result};
use crate::pacing::Pacer;

/// Default endpoint when an imported document names none
pub const DEFAULT_IMPORT_ENDPOINT: u8 = 1;

/// Diff text for a value present now but not in the snapshot
pub const ABSENT: &str = "absent";

/// Equality rule used by compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    /// String equality of the formatted text under the current display mode.
    /// Comparing under a different display mode than the capture reports
    /// every value as changed.
    #[default]
    #[serde(alias = "formatted")]
    FormattedText,
    /// Equality of the stored raw value
    #[serde(alias = "raw")]
    RawValue,
}

impl CompareMode {
    pub fn name(self) -> &'static str {
        match self {
            CompareMode::FormattedText => "formatted",
            CompareMode::RawValue => "raw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub raw: AttrValue,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotTable {
    pub target: Target,
    pub endpoint: u8,
    pub start: AttributeId,
    pub end: AttributeId,
    pub captured_at: Option<DateTime<Utc>>,
    pub entries: BTreeMap<AttributeId, SnapshotEntry>,
}

impl SnapshotTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `0x0515-0x0517 on endpoint 1`
    pub fn describe_range(&self) -> String {
        format!("{}-{} on endpoint {}", self.start, self.end, self.endpoint)
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(id, entry)| format!("{} = {}", id, entry.formatted))
            .collect()
    }
}

/// One changed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub id: AttributeId,
    pub previous: String,
    pub current: String,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.id, self.previous, self.current)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareReport {
    pub diffs: Vec<DiffEntry>,
    pub unchanged: usize,
    /// Ids re-read
    pub compared: usize,
}

impl CompareReport {
    pub fn summary(&self) -> String {
        format!(
            "{} changed, {} unchanged (of {})",
            self.diffs.len(),
            self.unchanged,
            self.compared
        )
    }
}

// ============================================================================
// Interchange form
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vendor_qualifier: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint: Option<u8>,
    range_start: u16,
    range_end: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    entries: BTreeMap<String, SnapshotEntry>,
}

/// Serialize a table to pretty-printed JSON
pub fn export(table: &SnapshotTable) -> Result<String> {
    let document = SnapshotDocument {
        namespace: Some(table.target.namespace.clone()),
        vendor_qualifier: Some(table.target.vendor_qualifier),
        endpoint: Some(table.endpoint),
        range_start: table.start.value(),
        range_end: table.end.value(),
        timestamp: table.captured_at.map(|t| t.to_rfc3339()),
        entries: table
            .entries
            .iter()
            .map(|(id, entry)| (id.key(), entry.clone()))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parse the interchange form. Missing namespace/vendor qualifier fall back
/// to `default_target`, a missing endpoint to 1.
pub fn import(text: &str, default_target: &Target) -> Result<SnapshotTable> {
    let document: SnapshotDocument = serde_json::from_str(text.trim())?;

    let start = AttributeId(document.range_start);
    let end = AttributeId(document.range_end);
    // Same cap as capture, so an imported table can always be compared
    batch::validate_range(start, end)?;

    let captured_at = document
        .timestamp
        .map(|ts| {
            DateTime::parse_from_rfc3339(&ts)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| ExplorerError::invalid_format(format!("Invalid timestamp '{ts}': {e}")))
        })
        .transpose()?;

    let mut entries = BTreeMap::new();
    for (key, entry) in document.entries {
        let id = codec::parse_attribute_id(&key)?;
        if id < start || id > end {
            return Err(ExplorerError::invalid_format(format!(
                "Snapshot entry {id} outside range {start}-{end}"
            )));
        }
        entries.insert(id, entry);
    }

    Ok(SnapshotTable {
        target: Target {
            namespace: document
                .namespace
                .unwrap_or_else(|| default_target.namespace.clone()),
            vendor_qualifier: document
                .vendor_qualifier
                .unwrap_or(default_target.vendor_qualifier),
        },
        endpoint: document.endpoint.unwrap_or(DEFAULT_IMPORT_ENDPOINT),
        start,
        end,
        captured_at,
        entries,
    })
}

// ============================================================================
// Capture / compare
// ============================================================================

pub struct SnapshotEngine<'a, T: AttributeTransport> {
    client: &'a AttributeClient<T>,
    batch: BatchOrchestrator<'a, T>,
}

impl<'a, T: AttributeTransport> SnapshotEngine<'a, T> {
    pub fn new(client: &'a AttributeClient<T>, pacer: Pacer) -> Self {
        Self {
            client,
            batch: BatchOrchestrator::new(client, pacer),
        }
    }

    /// Read `[start, end]` and keep the ids that returned a value. The
    /// table records the requested endpoint and bounds however many
    /// entries were captured.
    pub async fn capture(
        &self,
        endpoint: u8,
        start: AttributeId,
        end: AttributeId,
        mode: DisplayMode,
        cancel: Option<&CancellationToken>,
    ) -> Result<SnapshotTable> {
        let handle = self.client.resolve_endpoint(endpoint).await?;
        let result = self.batch.read_range(&handle, start, end, cancel).await?;
        let requested = result.requested();

        let entries: BTreeMap<AttributeId, SnapshotEntry> = result
            .into_items()
            .into_iter()
            .filter_map(|item| match (item.id, item.outcome) {
                (Some(id), ReadOutcome::Value(raw)) => Some((
                    id,
                    SnapshotEntry {
                        formatted: codec::format_value(&raw, mode),
                        raw,
                    },
                )),
                _ => None,
            })
            .collect();

        info!(
            "snapshot ep{} {}-{}: {} of {} captured",
            endpoint,
            start,
            end,
            entries.len(),
            requested
        );

        Ok(SnapshotTable {
            target: self.client.target().clone(),
            endpoint,
            start,
            end,
            captured_at: Some(Utc::now()),
            entries,
        })
    }

    /// Re-read the table's range on the table's endpoint and report changes
    pub async fn compare(
        &self,
        table: &SnapshotTable,
        mode: DisplayMode,
        compare_mode: CompareMode,
        cancel: Option<&CancellationToken>,
    ) -> Result<CompareReport> {
        let handle = self.client.resolve_endpoint(table.endpoint).await?;
        let result = self
            .batch
            .read_range(&handle, table.start, table.end, cancel)
            .await?;

        let mut diffs = Vec::new();
        let mut unchanged = 0usize;

        for item in result.items() {
            let Some(id) = item.id else { continue };
            let previous = table.entries.get(&id);

            match (&item.outcome, previous) {
                (ReadOutcome::Value(raw), Some(old)) => {
                    let current = codec::format_value(raw, mode);
                    let equal = match compare_mode {
                        CompareMode::FormattedText => old.formatted == current,
                        CompareMode::RawValue => old.raw == *raw,
                    };
                    if equal {
                        unchanged += 1;
                    } else {
                        diffs.push(DiffEntry {
                            id,
                            previous: old.formatted.clone(),
                            current,
                        });
                    }
                },
                (ReadOutcome::Value(raw), None) => diffs.push(DiffEntry {
                    id,
                    previous: ABSENT.to_string(),
                    current: codec::format_value(raw, mode),
                }),
                (ReadOutcome::Empty, Some(old)) => diffs.push(DiffEntry {
                    id,
                    previous: old.formatted.clone(),
                    current: "no data".to_string(),
                }),
                (ReadOutcome::Failed(msg), Some(old)) => diffs.push(DiffEntry {
                    id,
                    previous: old.formatted.clone(),
                    current: format!("ERROR: {msg}"),
                }),
                (ReadOutcome::Empty | ReadOutcome::Failed(_), None) => {},
            }
        }

        let report = CompareReport {
            diffs,
            unchanged,
            compared: result.requested(),
        };
        debug!(
            "compare ep{} {}-{} ({}): {}",
            table.endpoint,
            table.start,
            table.end,
            compare_mode.name(),
            report.summary()
        );
        Ok(report)
    }
}
