//! Snapshot Integration Tests
//!
//! Capture, compare, export and import through the explorer:
//! - capture then compare with no change yields no diffs
//! - value changes, disappearing and appearing attributes
//! - formatted-text equality across display modes
//! - interchange round trip

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::sync::Arc;

use attr_explorer::{
    snapshot, AttributeClient, CompareMode, DisplayMode, Explorer, ExplorerConfig, ExplorerError,
    ExplorerState, Pacer, ReportListener, SnapshotEngine,
};
use attr_link::{AttrValue, AttributeId, AttributeReport, SimulatedDevice};

const NS: &str = "manuSpecificExplorer";

fn setup() -> (Arc<SimulatedDevice>, Explorer<SimulatedDevice>, ExplorerState) {
    let device = Arc::new(SimulatedDevice::seeded(NS));
    let config = ExplorerConfig {
        item_delay_ms: 0,
        ..Default::default()
    };
    let explorer = Explorer::new(device.clone(), config, ReportListener::new());
    let state = explorer.new_state();
    (device, explorer, state)
}

async fn run(
    explorer: &Explorer<SimulatedDevice>,
    state: &mut ExplorerState,
    text: &str,
) -> attr_explorer::Result<attr_explorer::CommandOutput> {
    explorer.execute_field(state, "snapshot", text, None).await
}

// ============================================================================
// Capture / compare
// ============================================================================

#[tokio::test]
async fn test_capture_then_compare_has_no_diffs() {
    let (_device, explorer, mut state) = setup();

    let output = run(&explorer, &mut state, "snapshot:0000-0006").await.unwrap();
    let table = state.snapshot.clone().unwrap();

    // 0x0005 has no data and 0x0006 is unsupported: both left out
    assert_eq!(table.len(), 5);
    assert_eq!(table.start, AttributeId(0x0000));
    assert_eq!(table.end, AttributeId(0x0006));
    assert_eq!(table.endpoint, 1);
    assert_eq!(
        output.status.as_deref(),
        Some("Captured 5 of 7 attributes, 0x0000-0x0006 on endpoint 1")
    );

    let client = explorer.client();
    let engine = SnapshotEngine::new(client, Pacer::from_millis(0));
    let report = engine
        .compare(&table, DisplayMode::Friendly, CompareMode::FormattedText, None)
        .await
        .unwrap();
    assert!(report.diffs.is_empty());
    assert_eq!(report.unchanged, table.len());
    assert_eq!(report.compared, 7);

    let output = run(&explorer, &mut state, "compare").await.unwrap();
    assert_eq!(output.result, "No changes");
    assert_eq!(output.status.as_deref(), Some("0 changed, 5 unchanged (of 7)"));
}

#[tokio::test]
async fn test_compare_reports_changes() {
    let (device, explorer, mut state) = setup();
    run(&explorer, &mut state, "snapshot:0000-0006").await.unwrap();

    device.set_attribute(1, 0x0001, AttrValue::Integer(0x0600));
    device.remove_attribute(1, 0x0002);
    device.set_no_data(1, 0x0003);
    device.set_attribute(1, 0x0006, AttrValue::Integer(7));

    let output = run(&explorer, &mut state, "compare").await.unwrap();
    let lines: Vec<&str> = output.result.lines().collect();
    assert_eq!(
        lines,
        vec![
            "0x0001: 1300 (0x0514) [05 14] -> 1536 (0x0600) [06 00]",
            "0x0002: 100000 (0x0186A0) [01 86 A0] -> ERROR: Not supported",
            "0x0003: [3 bytes] DE AD BE -> no data",
            "0x0006: absent -> 7 (0x07)",
        ]
    );
    assert_eq!(output.status.as_deref(), Some("4 changed, 2 unchanged (of 7)"));

    // Compare leaves the snapshot untouched
    assert_eq!(state.snapshot.as_ref().unwrap().len(), 5);
}

#[tokio::test]
async fn test_compare_uses_snapshot_endpoint() {
    let (device, explorer, mut state) = setup();
    explorer
        .execute_field(&mut state, "endpoint", "2", None)
        .await
        .unwrap();
    run(&explorer, &mut state, "snapshot:0000-0000").await.unwrap();

    explorer
        .execute_field(&mut state, "endpoint", "1", None)
        .await
        .unwrap();
    device.set_attribute(1, 0x0000, AttrValue::Integer(0x42));

    let output = run(&explorer, &mut state, "compare").await.unwrap();
    assert_eq!(output.result, "No changes");
}

#[tokio::test]
async fn test_display_mode_change_gives_spurious_diffs() {
    let (_device, explorer, mut state) = setup();
    run(&explorer, &mut state, "snapshot:0515-0516").await.unwrap();

    explorer
        .execute_field(&mut state, "raw", "on", None)
        .await
        .unwrap();
    let output = run(&explorer, &mut state, "compare").await.unwrap();
    assert_eq!(
        output.result,
        "0x0515: 10 (0x0A) -> 0A\n0x0516: 256 (0x0100) [01 00] -> 0100"
    );

    // Raw-value equality ignores the display mode
    state.compare_mode = CompareMode::RawValue;
    let output = run(&explorer, &mut state, "compare").await.unwrap();
    assert_eq!(output.result, "No changes");
}

#[tokio::test]
async fn test_snapshot_without_capture() {
    let (_device, explorer, mut state) = setup();
    assert_eq!(
        run(&explorer, &mut state, "compare").await,
        Err(ExplorerError::NoSnapshot)
    );
    assert_eq!(
        run(&explorer, &mut state, "export").await,
        Err(ExplorerError::NoSnapshot)
    );
}

#[tokio::test]
async fn test_failed_capture_keeps_previous_snapshot() {
    let (_device, explorer, mut state) = setup();
    run(&explorer, &mut state, "snapshot:0515-0516").await.unwrap();
    let before = state.snapshot.clone();

    assert!(run(&explorer, &mut state, "snapshot:0000-0200").await.is_err());
    assert!(run(&explorer, &mut state, "import:{broken").await.is_err());
    assert_eq!(state.snapshot, before);

    run(&explorer, &mut state, "clear").await.unwrap();
    assert!(state.snapshot.is_none());
}

// ============================================================================
// Export / import
// ============================================================================

#[tokio::test]
async fn test_export_import_round_trip() {
    let (_device, explorer, mut state) = setup();
    run(&explorer, &mut state, "snapshot:0000-0006").await.unwrap();
    let captured = state.snapshot.clone().unwrap();

    let exported = run(&explorer, &mut state, "export").await.unwrap();
    assert_eq!(exported.status.as_deref(), Some("Exported 5 entries"));

    run(&explorer, &mut state, "clear").await.unwrap();
    let output = run(&explorer, &mut state, &format!("import:{}", exported.result))
        .await
        .unwrap();
    assert_eq!(
        output.status.as_deref(),
        Some("Imported 5 entries, 0x0000-0x0006 on endpoint 1")
    );
    assert_eq!(state.snapshot.as_ref(), Some(&captured));

    // The imported table compares clean against the unchanged device
    let output = run(&explorer, &mut state, "compare").await.unwrap();
    assert_eq!(output.result, "No changes");
}

#[tokio::test]
async fn test_export_document_fields() {
    let (_device, explorer, mut state) = setup();
    run(&explorer, &mut state, "snapshot:0003-0004").await.unwrap();
    let exported = run(&explorer, &mut state, "export").await.unwrap();

    let doc: serde_json::Value = serde_json::from_str(&exported.result).unwrap();
    assert_eq!(doc["namespace"], NS);
    assert_eq!(doc["vendorQualifier"], 0x115F);
    assert_eq!(doc["endpoint"], 1);
    assert_eq!(doc["rangeStart"], 3);
    assert_eq!(doc["rangeEnd"], 4);
    assert!(doc["timestamp"].is_string());
    assert_eq!(doc["entries"]["0003"]["raw"]["hex"], "DEADBE");
    assert_eq!(doc["entries"]["0004"]["raw"], "fw-1.4.2");
    assert_eq!(doc["entries"]["0004"]["formatted"], "\"fw-1.4.2\"");
}

#[tokio::test]
async fn test_compare_notes_foreign_snapshot_target() {
    let (_device, explorer, mut state) = setup();
    let doc = r#"{
        "namespace": "manuSpecificOther",
        "vendorQualifier": 4660,
        "rangeStart": 1301,
        "rangeEnd": 1301,
        "entries": {"0515": {"raw": 10, "formatted": "10 (0x0A)"}}
    }"#;
    run(&explorer, &mut state, &format!("import:{doc}")).await.unwrap();

    let output = run(&explorer, &mut state, "compare").await.unwrap();
    assert_eq!(output.result, "No changes");
    assert_eq!(
        output.status.as_deref(),
        Some(
            "0 changed, 1 unchanged (of 1); snapshot taken on manuSpecificOther (0x1234), \
             read from manuSpecificExplorer (0x115F)"
        )
    );
}

#[tokio::test]
async fn test_import_without_endpoint_defaults_to_one() {
    let device = Arc::new(SimulatedDevice::seeded(NS));
    let client = AttributeClient::new(device, ExplorerConfig::default().target());
    let table = snapshot::import(
        r#"{"rangeStart": 1301, "rangeEnd": 1302, "entries": {}}"#,
        client.target(),
    )
    .unwrap();
    assert_eq!(table.endpoint, 1);
    assert_eq!(table.target.namespace, NS);
}

// ============================================================================
// Reports through the explorer
// ============================================================================

#[tokio::test]
async fn test_reports_command() {
    let (_device, explorer, mut state) = setup();
    explorer.reports().handle(&AttributeReport {
        endpoint: 1,
        namespace: NS.to_string(),
        attributes: vec![(AttributeId(0x0524), AttrValue::Integer(0x14))],
    });

    let output = explorer
        .execute_field(&mut state, "reports", "", None)
        .await
        .unwrap();
    assert!(output.result.ends_with("ep1 0x0524 = 20 (0x14)"));
    assert_eq!(
        output.status.as_deref(),
        Some("Last report: ep1 0x0524 = 20 (0x14)")
    );

    explorer
        .execute_field(&mut state, "reports", "clear", None)
        .await
        .unwrap();
    assert!(explorer.reports().is_empty());
}
