//! Command execution
//!
//! [`Explorer`] runs decoded [`Command`]s against the attribute client and
//! the caller-owned [`ExplorerState`]. Commands run one at a time; only the
//! report listener works concurrently.

use std::sync::Arc;

use attr_link::{AttributeTransport, ClusterInfo, Endpoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::BatchOrchestrator;
use crate::client::{AttributeClient, ReadOutcome};
use crate::codec::{self, DisplayMode};
use crate::command::{Command, CommandOutput, SnapshotOp};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::pacing::Pacer;
use crate::report::ReportListener;
use crate::snapshot::{self, SnapshotEngine};
use crate::state::ExplorerState;
use crate::write_spec::WriteSpec;

pub struct Explorer<T: AttributeTransport> {
    client: AttributeClient<T>,
    config: ExplorerConfig,
    pacer: Pacer,
    reports: ReportListener,
}

impl<T: AttributeTransport> Explorer<T> {
    pub fn new(transport: Arc<T>, config: ExplorerConfig, reports: ReportListener) -> Self {
        let pacer = config.pacer();
        Self {
            client: AttributeClient::new(transport, config.target()),
            config,
            pacer,
            reports,
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn client(&self) -> &AttributeClient<T> {
        &self.client
    }

    pub fn reports(&self) -> &ReportListener {
        &self.reports
    }

    /// Fresh session state from the configuration
    pub fn new_state(&self) -> ExplorerState {
        ExplorerState::new(&self.config)
    }

    /// Decode and run `text` entered in operator field `field`
    pub async fn execute_field(
        &self,
        state: &mut ExplorerState,
        field: &str,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput> {
        let command = Command::parse(field, text)?;
        self.execute(state, command, cancel).await
    }

    /// Run one command. On error, prior state (history, snapshot) is left
    /// as it was, apart from the history entry a failed single write adds.
    pub async fn execute(
        &self,
        state: &mut ExplorerState,
        command: Command,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput> {
        let mode = state.display_mode();

        match command {
            Command::ReadOne(id) => {
                let endpoint = self.endpoint(state).await?;
                let output = match self.client.read_value(&endpoint, id).await? {
                    Some(value) => format!("{} = {}", id, codec::format_value(&value, mode)),
                    None => format!("{id}: No data"),
                };
                Ok(CommandOutput::new(output))
            },

            Command::WriteOne(spec) => self.write_one(state, spec, mode).await,

            Command::BatchRead(tokens) => {
                let endpoint = self.endpoint(state).await?;
                let result = self
                    .batch()
                    .read_list(&endpoint, &tokens, cancel)
                    .await?;
                Ok(CommandOutput::new(result.lines(mode).join("\n")).with_status(result.summary()))
            },

            Command::Scan { start, end } => {
                let endpoint = self.endpoint(state).await?;
                let result = self.batch().scan(&endpoint, start, end, cancel).await?;
                Ok(CommandOutput::new(result.lines(mode).join("\n")).with_status(result.summary()))
            },

            Command::BulkWrite(tokens) => {
                let endpoint = self.endpoint(state).await?;
                let result = self
                    .batch()
                    .bulk_write(&endpoint, &tokens, &mut state.write_history, mode, cancel)
                    .await?;
                Ok(CommandOutput::new(result.lines(mode).join("\n")).with_status(result.summary()))
            },

            Command::Snapshot(op) => self.snapshot(state, op, mode, cancel).await,

            Command::SetEndpoint(id) => {
                self.client.resolve_endpoint(id).await?;
                state.endpoint = id;
                info!("Endpoint set to {}", id);
                Ok(CommandOutput::new(format!("Endpoint set to {id}")))
            },

            Command::SetRawHex(raw_hex) => {
                state.raw_hex = raw_hex;
                let text = if raw_hex { "on" } else { "off" };
                Ok(CommandOutput::new(format!("Raw hex display {text}")))
            },

            Command::ListClusters => {
                let endpoint = self.endpoint(state).await?;
                let clusters = self.client.list_clusters(&endpoint).await?;
                let mut lines = vec![format!("Endpoint {}", endpoint.id)];
                push_clusters(&mut lines, "Input clusters", &clusters.input);
                push_clusters(&mut lines, "Output clusters", &clusters.output);
                Ok(CommandOutput::new(lines.join("\n")).with_status(format!(
                    "{} input, {} output",
                    clusters.input.len(),
                    clusters.output.len()
                )))
            },

            Command::ShowHistory => Ok(CommandOutput::new(or_empty(state.write_history.render()))
                .with_status(format!(
                    "{} of {} entries",
                    state.write_history.len(),
                    state.write_history.capacity()
                ))),

            Command::ClearHistory => {
                state.write_history.clear();
                Ok(CommandOutput::new("History cleared"))
            },

            Command::ShowReports => {
                let mut output = CommandOutput::new(or_empty(self.reports.render()));
                if let Some(last) = self.reports.last_report() {
                    output = output.with_status(format!("Last report: {}", last.replace('\n', "; ")));
                }
                Ok(output)
            },

            Command::ClearReports => {
                self.reports.clear();
                Ok(CommandOutput::new("Reports cleared"))
            },
        }
    }

    async fn write_one(
        &self,
        state: &mut ExplorerState,
        spec: WriteSpec,
        mode: DisplayMode,
    ) -> Result<CommandOutput> {
        let endpoint = self.endpoint(state).await?;
        let outcome = self
            .client
            .write_with_readback(&endpoint, spec.id, &spec.typed)
            .await;

        match outcome.result {
            Ok(()) => {
                state.record(format!("Write {}: ok", spec.describe(mode)));
                info!("Wrote {} on ep{}", spec, endpoint.id);

                let output = CommandOutput::new(format!("Wrote {}", spec.describe(mode)));
                let status = match &outcome.readback {
                    Some(ReadOutcome::Failed(_)) => outcome.readback_text(mode),
                    Some(_) => outcome.readback_text(mode).map(|text| format!("Read back: {text}")),
                    None => None,
                };
                Ok(match status {
                    Some(status) => output.with_status(status),
                    None => output,
                })
            },
            Err(e) => {
                state.record(format!("Write {} failed: {}", spec.id, e));
                Err(e)
            },
        }
    }

    async fn snapshot(
        &self,
        state: &mut ExplorerState,
        op: SnapshotOp,
        mode: DisplayMode,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput> {
        debug!("snapshot {} (ep{})", op, state.endpoint);
        match op {
            SnapshotOp::Capture { start, end } => {
                let table = self
                    .engine()
                    .capture(state.endpoint, start, end, mode, cancel)
                    .await?;
                let status = format!(
                    "Captured {} of {} attributes, {}",
                    table.len(),
                    usize::from(end.value() - start.value()) + 1,
                    table.describe_range()
                );
                let output = CommandOutput::new(or_empty(table.lines().join("\n"))).with_status(status);
                state.snapshot = Some(table);
                Ok(output)
            },

            SnapshotOp::Compare => {
                let table = state.snapshot.as_ref().ok_or(ExplorerError::NoSnapshot)?;
                let report = self
                    .engine()
                    .compare(table, mode, state.compare_mode, cancel)
                    .await?;
                let result = if report.diffs.is_empty() {
                    "No changes".to_string()
                } else {
                    report
                        .diffs
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                info!("compare {}: {}", table.describe_range(), report.summary());

                let mut status = report.summary();
                let current = self.client.target();
                if table.target != *current {
                    warn!(
                        "Snapshot target {} (0x{:04X}) compared against {} (0x{:04X})",
                        table.target.namespace,
                        table.target.vendor_qualifier,
                        current.namespace,
                        current.vendor_qualifier
                    );
                    status.push_str(&format!(
                        "; snapshot taken on {} (0x{:04X}), read from {} (0x{:04X})",
                        table.target.namespace,
                        table.target.vendor_qualifier,
                        current.namespace,
                        current.vendor_qualifier
                    ));
                }
                Ok(CommandOutput::new(result).with_status(status))
            },

            SnapshotOp::Export => {
                let table = state.snapshot.as_ref().ok_or(ExplorerError::NoSnapshot)?;
                let text = snapshot::export(table)?;
                Ok(CommandOutput::new(text).with_status(format!("Exported {} entries", table.len())))
            },

            SnapshotOp::Import(text) => {
                let table = snapshot::import(&text, self.client.target())?;
                let status = format!("Imported {} entries, {}", table.len(), table.describe_range());
                let output = CommandOutput::new(or_empty(table.lines().join("\n"))).with_status(status);
                state.snapshot = Some(table);
                Ok(output)
            },

            SnapshotOp::Clear => {
                state.snapshot = None;
                Ok(CommandOutput::new("Snapshot cleared"))
            },
        }
    }

    async fn endpoint(&self, state: &ExplorerState) -> Result<Endpoint> {
        self.client.resolve_endpoint(state.endpoint).await
    }

    fn batch(&self) -> BatchOrchestrator<'_, T> {
        BatchOrchestrator::new(&self.client, self.pacer)
    }

    fn engine(&self) -> SnapshotEngine<'_, T> {
        SnapshotEngine::new(&self.client, self.pacer)
    }
}

fn push_clusters(lines: &mut Vec<String>, title: &str, clusters: &[ClusterInfo]) {
    lines.push(format!("{title}:"));
    if clusters.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(clusters.iter().map(|c| format!("  {c}")));
}

fn or_empty(text: String) -> String {
    if text.is_empty() {
        "(empty)".to_string()
    } else {
        text
    }
}
