//! Attribute Explorer Core
//!
//! Interactive exploration of a typed key/value attribute protocol:
//!
//! - **codec**: hex parsing, type inference and value formatting
//! - **write_spec**: `ATTR[:TYPE]:VALUE` parsing
//! - **client**: single-attribute read/write with read-back
//! - **pacing / batch**: ordered, paced list reads, range scans and bulk writes
//! - **snapshot**: capture, compare, export and import of attribute tables
//! - **rolling_log / report**: write history and passive report log
//! - **command / explorer**: operator command grammar and execution

pub mod batch;
pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod explorer;
pub mod pacing;
pub mod report;
pub mod rolling_log;
pub mod snapshot;
pub mod state;
pub mod write_spec;

pub use batch::{
    BatchItem, BatchOrchestrator, BatchResult, BulkWriteOutcome, ItemOutcome, OutcomeKind,
    MAX_BULK_WRITE, MAX_LIST_READ, MAX_RANGE_SCAN,
};
pub use client::{AttributeClient, ReadOutcome, WriteOutcome};
pub use codec::{DisplayMode, TypedValue};
pub use command::{Command, CommandOutput, SnapshotOp, FIELDS};
pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};
pub use explorer::Explorer;
pub use pacing::Pacer;
pub use report::ReportListener;
pub use rolling_log::{HistoryEntry, RollingLog, REPORT_LOG_CAPACITY};
pub use snapshot::{CompareMode, CompareReport, DiffEntry, SnapshotEngine, SnapshotEntry, SnapshotTable};
pub use state::ExplorerState;
pub use write_spec::WriteSpec;
