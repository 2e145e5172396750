//! Operator session state
//!
//! The single owned aggregate every command reads and mutates: selected
//! endpoint, display mode, compare mode, write history and the current
//! snapshot.

use crate::codec::DisplayMode;
use crate::config::ExplorerConfig;
use crate::rolling_log::{HistoryEntry, RollingLog};
use crate::snapshot::{CompareMode, SnapshotTable};

#[derive(Debug, Clone)]
pub struct ExplorerState {
    pub endpoint: u8,
    pub raw_hex: bool,
    pub compare_mode: CompareMode,
    pub write_history: RollingLog<HistoryEntry>,
    pub snapshot: Option<SnapshotTable>,
}

impl ExplorerState {
    pub fn new(config: &ExplorerConfig) -> Self {
        Self {
            endpoint: config.endpoint,
            raw_hex: config.raw_hex,
            compare_mode: config.compare_mode,
            write_history: RollingLog::new(config.history_capacity),
            snapshot: None,
        }
    }

    pub fn display_mode(&self) -> DisplayMode {
        DisplayMode::from_raw_hex(self.raw_hex)
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.write_history.append(HistoryEntry::new(message));
    }
}

impl Default for ExplorerState {
    fn default() -> Self {
        Self::new(&ExplorerConfig::default())
    }
}
