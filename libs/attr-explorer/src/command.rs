//! Operator command grammar
//!
//! Each operator field's text is decoded once into a [`Command`]; nothing
//! past this point looks at raw text again, except batch and bulk tokens,
//! which are kept per item so a bad token fails only its own item.

use std::fmt;
use std::str::FromStr;

use attr_link::AttributeId;
use common::parse_bool;

use crate::batch;
use crate::codec;
use crate::error::{ExplorerError, Result};
use crate::write_spec::WriteSpec;

/// Operator-facing fields
pub const FIELDS: [&str; 11] = [
    "read", "write", "batch", "scan", "bulk", "snapshot", "endpoint", "raw", "clusters", "history",
    "reports",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOp {
    Capture { start: AttributeId, end: AttributeId },
    Compare,
    Export,
    Import(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ReadOne(AttributeId),
    WriteOne(WriteSpec),
    BatchRead(Vec<String>),
    Scan { start: AttributeId, end: AttributeId },
    BulkWrite(Vec<String>),
    Snapshot(SnapshotOp),
    SetEndpoint(u8),
    SetRawHex(bool),
    ListClusters,
    ShowHistory,
    ClearHistory,
    ShowReports,
    ClearReports,
}

impl Command {
    /// Decode `text` entered in operator field `field`
    pub fn parse(field: &str, text: &str) -> Result<Self> {
        let text = text.trim();
        match field.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Command::ReadOne(codec::parse_attribute_id(text)?)),
            "write" => Ok(Command::WriteOne(WriteSpec::parse(text)?)),
            "batch" => Ok(Command::BatchRead(split_tokens(text, &[',']))),
            "scan" => {
                let (start, end) = batch::parse_range(text)?;
                Ok(Command::Scan { start, end })
            },
            "bulk" => Ok(Command::BulkWrite(split_tokens(text, &[',', ';', '\n']))),
            "snapshot" => Ok(Command::Snapshot(parse_snapshot(text)?)),
            "endpoint" => text
                .parse::<u8>()
                .map(Command::SetEndpoint)
                .map_err(|_| ExplorerError::invalid_format(format!("Invalid endpoint '{text}' (expected 0-255)"))),
            "raw" => parse_bool(text)
                .map(Command::SetRawHex)
                .ok_or_else(|| ExplorerError::invalid_format(format!("Invalid raw mode '{text}' (expected on/off)"))),
            "clusters" => Ok(Command::ListClusters),
            "history" => match text.to_ascii_lowercase().as_str() {
                "" | "show" => Ok(Command::ShowHistory),
                "clear" => Ok(Command::ClearHistory),
                other => Err(ExplorerError::invalid_format(format!(
                    "Unknown history action '{other}' (expected clear)"
                ))),
            },
            "reports" => match text.to_ascii_lowercase().as_str() {
                "" | "show" => Ok(Command::ShowReports),
                "clear" => Ok(Command::ClearReports),
                other => Err(ExplorerError::invalid_format(format!(
                    "Unknown reports action '{other}' (expected clear)"
                ))),
            },
            other => Err(ExplorerError::invalid_format(format!(
                "Unknown field '{}' (expected one of: {})",
                other,
                FIELDS.join(", ")
            ))),
        }
    }

    /// Whether the command sends requests in a paced loop
    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            Command::BatchRead(_)
                | Command::Scan { .. }
                | Command::BulkWrite(_)
                | Command::Snapshot(SnapshotOp::Capture { .. } | SnapshotOp::Compare)
        )
    }
}

fn parse_snapshot(text: &str) -> Result<SnapshotOp> {
    if let Some((head, rest)) = text.split_once(':') {
        match head.trim().to_ascii_lowercase().as_str() {
            "snapshot" => {
                let (start, end) = batch::parse_range(rest)?;
                return Ok(SnapshotOp::Capture { start, end });
            },
            "import" => return Ok(SnapshotOp::Import(rest.trim().to_string())),
            _ => {},
        }
    }

    match text.to_ascii_lowercase().as_str() {
        "compare" => Ok(SnapshotOp::Compare),
        "export" => Ok(SnapshotOp::Export),
        "clear" => Ok(SnapshotOp::Clear),
        _ => Err(ExplorerError::invalid_format(format!(
            "Invalid snapshot command '{text}' (expected snapshot:START-END, compare, export, import:<text> or clear)"
        ))),
    }
}

fn split_tokens(text: &str, separators: &[char]) -> Vec<String> {
    text.split(|c| separators.contains(&c))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl fmt::Display for SnapshotOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotOp::Capture { start, end } => write!(f, "snapshot:{}-{}", start.key(), end.key()),
            SnapshotOp::Compare => f.write_str("compare"),
            SnapshotOp::Export => f.write_str("export"),
            SnapshotOp::Import(_) => f.write_str("import"),
            SnapshotOp::Clear => f.write_str("clear"),
        }
    }
}

/// Field and text for a command spelled `<field> <text>`
impl FromStr for Command {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (field, text) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        Self::parse(field, text)
    }
}

/// Result of one command: the result field plus an optional status line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub result: String,
    pub status: Option<String>,
}

impl CommandOutput {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_read_and_write() {
        assert_eq!(
            Command::parse("read", "0x0515").unwrap(),
            Command::ReadOne(AttributeId(0x0515))
        );
        match Command::parse("WRITE", "0524:uint16:0014").unwrap() {
            Command::WriteOne(spec) => assert_eq!(spec.id, AttributeId(0x0524)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Command::parse("read", "nope").is_err());
    }

    #[test]
    fn test_batch_tokens() {
        assert_eq!(
            Command::parse("batch", "0515, 0516,,0515 ,").unwrap(),
            Command::BatchRead(vec!["0515".into(), "0516".into(), "0515".into()])
        );
        assert_eq!(
            Command::parse("bulk", "0515:0a; 0516:0100\n0524:uint16:0014,").unwrap(),
            Command::BulkWrite(vec![
                "0515:0a".into(),
                "0516:0100".into(),
                "0524:uint16:0014".into()
            ])
        );
    }

    #[test]
    fn test_scan_range() {
        assert_eq!(
            Command::parse("scan", "0515-0517").unwrap(),
            Command::Scan {
                start: AttributeId(0x0515),
                end: AttributeId(0x0517)
            }
        );
        assert!(matches!(
            Command::parse("scan", "0000-0080"),
            Err(ExplorerError::LimitExceeded { .. })
        ));
        assert!(matches!(
            Command::parse("scan", "0517-0515"),
            Err(ExplorerError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_snapshot_ops() {
        assert_eq!(
            Command::parse("snapshot", "snapshot:0515-0517").unwrap(),
            Command::Snapshot(SnapshotOp::Capture {
                start: AttributeId(0x0515),
                end: AttributeId(0x0517)
            })
        );
        assert_eq!(
            Command::parse("snapshot", "Compare").unwrap(),
            Command::Snapshot(SnapshotOp::Compare)
        );
        assert_eq!(
            Command::parse("snapshot", "export").unwrap(),
            Command::Snapshot(SnapshotOp::Export)
        );
        assert_eq!(
            Command::parse("snapshot", "clear").unwrap(),
            Command::Snapshot(SnapshotOp::Clear)
        );
        // Import text keeps its own colons
        assert_eq!(
            Command::parse("snapshot", r#"import:{"rangeStart":1}"#).unwrap(),
            Command::Snapshot(SnapshotOp::Import(r#"{"rangeStart":1}"#.into()))
        );
        assert!(Command::parse("snapshot", "diff").is_err());
    }

    #[test]
    fn test_state_commands() {
        assert_eq!(
            Command::parse("endpoint", "2").unwrap(),
            Command::SetEndpoint(2)
        );
        assert!(Command::parse("endpoint", "300").is_err());
        assert_eq!(Command::parse("raw", "on").unwrap(), Command::SetRawHex(true));
        assert_eq!(
            Command::parse("raw", "false").unwrap(),
            Command::SetRawHex(false)
        );
        assert_eq!(
            Command::parse("history", "").unwrap(),
            Command::ShowHistory
        );
        assert_eq!(
            Command::parse("history", "clear").unwrap(),
            Command::ClearHistory
        );
        assert_eq!(
            Command::parse("reports", "clear").unwrap(),
            Command::ClearReports
        );
        assert_eq!(
            Command::parse("clusters", "").unwrap(),
            Command::ListClusters
        );
        assert!(Command::parse("format", "c:").is_err());
    }

    #[test]
    fn test_from_str_splits_field() {
        let cmd: Command = "scan 0515-0516".parse().unwrap();
        assert!(cmd.is_batch());
        let cmd: Command = "clusters".parse().unwrap();
        assert_eq!(cmd, Command::ListClusters);
        assert!(!cmd.is_batch());
    }
}
