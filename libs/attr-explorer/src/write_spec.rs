//! Write-spec parser
//!
//! `ATTR:VALUE` infers the type from the payload length, `ATTR:TYPE:VALUE`
//! names it. VALUE is hex with an optional `0x` prefix; whitespace and colon
//! separators inside it are ignored, so `0524:buffer:0a:0b` is a two-byte
//! buffer.

use std::fmt;
use std::str::FromStr;

use attr_link::{AttributeId, AttributeWrite, DataType};

use crate::codec::{self, DisplayMode, TypedValue};
use crate::error::{ExplorerError, Result};

/// A parsed write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSpec {
    pub id: AttributeId,
    /// Normalized hex as typed by the operator (lowercase, even length)
    pub hex_payload: String,
    pub typed: TypedValue,
    /// Whether TYPE was given rather than inferred
    pub explicit_type: bool,
}

impl WriteSpec {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let segments: Vec<&str> = text.split(':').collect();
        if segments.len() < 2 {
            return Err(ExplorerError::invalid_format(format!(
                "Invalid write spec '{}' (expected ATTR:VALUE or ATTR:TYPE:VALUE)",
                text
            )));
        }

        let id = codec::parse_attribute_id(segments[0])?;

        let (data_type, value_text) = if segments.len() == 2 {
            (None, segments[1].to_string())
        } else if let Some(data_type) = DataType::from_name(segments[1]) {
            (Some(data_type), segments[2..].join(":"))
        } else if looks_like_hex(segments[1]) {
            (None, segments[1..].join(":"))
        } else {
            return Err(ExplorerError::UnknownType(segments[1].trim().to_string()));
        };

        let hex_payload = codec::normalize_hex(&value_text)?;
        let typed = match data_type {
            Some(data_type) => codec::parse_as(data_type, &hex_payload)?,
            None => codec::infer_type(&hex_payload)?,
        };

        Ok(Self {
            id,
            hex_payload,
            typed,
            explicit_type: data_type.is_some(),
        })
    }

    pub fn data_type(&self) -> DataType {
        self.typed.data_type
    }

    pub fn to_write(&self) -> AttributeWrite {
        self.typed.to_write(self.id)
    }

    /// Confirmation text, e.g. `0x0524 = 0014 (uint16)`
    pub fn describe(&self, mode: DisplayMode) -> String {
        match mode {
            DisplayMode::RawHex => format!(
                "{} = {} ({})",
                self.id,
                self.hex_payload.to_ascii_uppercase(),
                self.typed.data_type
            ),
            DisplayMode::Friendly => format!(
                "{} = {} ({})",
                self.id,
                codec::format_typed(&self.typed, mode),
                self.typed.data_type
            ),
        }
    }
}

impl FromStr for WriteSpec {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for WriteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.explicit_type {
            write!(f, "{}:{}:{}", self.id.key(), self.typed.data_type, self.hex_payload)
        } else {
            write!(f, "{}:{}", self.id.key(), self.hex_payload)
        }
    }
}

fn looks_like_hex(segment: &str) -> bool {
    let compact: String = segment.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
}
