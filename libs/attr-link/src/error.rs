//! Attribute Link Error Types
//!
//! Core error types for the attribute transport.

use thiserror::Error;

/// Result type for attr-link operations
pub type Result<T> = std::result::Result<T, AttrLinkError>;

/// Status text carried by targets that reject an attribute id
pub const UNSUPPORTED_ATTRIBUTE_MARKER: &str = "UNSUPPORTED_ATTRIBUTE";

/// Attribute link errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttrLinkError {
    /// Target rejected the attribute id
    #[error("Status '{UNSUPPORTED_ATTRIBUTE_MARKER}' for attribute {0}")]
    UnsupportedAttribute(String),

    /// Attribute exists but cannot be written
    #[error("Status 'READ_ONLY' for attribute {0}")]
    ReadOnly(String),

    /// Endpoint not present on the target entity
    #[error("Endpoint {0} not found")]
    EndpointNotFound(u8),

    /// Request timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Any other transport-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<serde_json::Error> for AttrLinkError {
    fn from(err: serde_json::Error) -> Self {
        AttrLinkError::InvalidData(format!("JSON error: {}", err))
    }
}

// Helper methods for creating errors
impl AttrLinkError {
    pub fn transport(msg: impl Into<String>) -> Self {
        AttrLinkError::Transport(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        AttrLinkError::Timeout(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AttrLinkError::InvalidData(msg.into())
    }

    /// Check if the error text carries the unsupported-attribute marker.
    ///
    /// Transports only guarantee the text, so the check is made on the
    /// rendered message rather than on the variant.
    pub fn is_unsupported(&self) -> bool {
        let msg = self.to_string();
        msg.contains(UNSUPPORTED_ATTRIBUTE_MARKER)
            || msg.to_ascii_lowercase().contains("unsupported attribute")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_variant_is_detected() {
        let err = AttrLinkError::UnsupportedAttribute("0x0517".to_string());
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_unsupported_marker_in_transport_text_is_detected() {
        let err = AttrLinkError::transport("Read 0xef00 failed (Status 'UNSUPPORTED_ATTRIBUTE')");
        assert!(err.is_unsupported());

        let err = AttrLinkError::transport("device says: Unsupported Attribute");
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_other_errors_are_not_unsupported() {
        assert!(!AttrLinkError::timeout("no response after 10s").is_unsupported());
        assert!(!AttrLinkError::ReadOnly("0x0001".to_string()).is_unsupported());
        assert!(!AttrLinkError::EndpointNotFound(3).is_unsupported());
    }
}
