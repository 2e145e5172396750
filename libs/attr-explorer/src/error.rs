//! Explorer error types
//!
//! `InvalidFormat`, `UnknownType` and `LimitExceeded` are raised before any
//! request is sent and abort the whole command. `Unsupported` and `Transport`
//! abort only single-attribute commands; inside a batch they become that
//! item's outcome.

use attr_link::AttrLinkError;
use thiserror::Error;

/// Result type for explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExplorerError {
    /// Malformed operator input (id, range, write-spec, import text)
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Type name outside the DataType enumeration
    #[error("Unknown type '{0}' (expected one of: uint8, uint16, uint32, int8, int16, int32, buffer, string)")]
    UnknownType(String),

    /// Batch or range over its cap
    #[error("Too many {what}: {requested} requested, limit is {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: usize,
        limit: usize,
    },

    /// Target rejected the attribute
    #[error("Not supported")]
    Unsupported,

    /// Any other read/write failure
    #[error("{0}")]
    Transport(String),

    /// Compare/export with nothing captured
    #[error("No snapshot captured")]
    NoSnapshot,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExplorerError {
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        ExplorerError::InvalidFormat(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ExplorerError::Config(msg.into())
    }

    pub fn limit(what: &'static str, requested: usize, limit: usize) -> Self {
        ExplorerError::LimitExceeded {
            what,
            requested,
            limit,
        }
    }
}

impl From<AttrLinkError> for ExplorerError {
    fn from(err: AttrLinkError) -> Self {
        if err.is_unsupported() {
            ExplorerError::Unsupported
        } else {
            ExplorerError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExplorerError {
    fn from(err: serde_json::Error) -> Self {
        ExplorerError::InvalidFormat(format!("JSON error: {}", err))
    }
}
