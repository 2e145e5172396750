//! Hex/value codec
//!
//! Parses operator-supplied hex into typed values and renders attribute
//! values as text. Rendering is pure: the same value and display mode always
//! produce the same text, which snapshot comparison relies on.

use attr_link::{AttrValue, AttributeId, AttributeWrite, DataType};
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

/// Text rendering policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Decimal with hex and byte breakdown
    #[default]
    Friendly,
    /// Zero-padded uppercase hex only
    RawHex,
}

impl DisplayMode {
    pub fn from_raw_hex(raw_hex: bool) -> Self {
        if raw_hex {
            DisplayMode::RawHex
        } else {
            DisplayMode::Friendly
        }
    }

    pub fn is_raw(self) -> bool {
        matches!(self, DisplayMode::RawHex)
    }
}

/// A value paired with the data type it is encoded as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    pub data_type: DataType,
    pub value: AttrValue,
}

impl TypedValue {
    pub fn new(data_type: DataType, value: impl Into<AttrValue>) -> Self {
        Self {
            data_type,
            value: value.into(),
        }
    }

    /// Build the transport write request for this value
    pub fn to_write(&self, id: AttributeId) -> AttributeWrite {
        AttributeWrite {
            id,
            value: self.value.clone(),
            type_tag: self.data_type.tag(),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse an attribute id: optional `0x`, 1-4 hex digits, whitespace ignored
pub fn parse_attribute_id(text: &str) -> Result<AttributeId> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = strip_hex_prefix(&compact);

    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ExplorerError::invalid_format(format!(
            "Invalid attribute id '{}' (expected 1-4 hex digits)",
            text.trim()
        )));
    }

    u16::from_str_radix(digits, 16)
        .map(AttributeId)
        .map_err(|e| ExplorerError::invalid_format(format!("Invalid attribute id '{}': {}", text.trim(), e)))
}

/// Normalize a hex payload to lowercase, even-length digits.
///
/// Drops an optional `0x` prefix plus any whitespace and colon separators;
/// an odd digit count is left-padded with one `0`.
pub fn normalize_hex(text: &str) -> Result<String> {
    let compact: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let digits = strip_hex_prefix(&compact);

    if digits.is_empty() {
        return Err(ExplorerError::invalid_format("Empty hex value"));
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ExplorerError::invalid_format(format!(
            "Invalid hex value '{}': unexpected character '{}'",
            text.trim(),
            bad
        )));
    }

    let mut normalized = digits.to_ascii_lowercase();
    if normalized.len() % 2 == 1 {
        normalized.insert(0, '0');
    }
    Ok(normalized)
}

fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

fn decode_bytes(hex_payload: &str) -> Result<Vec<u8>> {
    let normalized = normalize_hex(hex_payload)?;
    hex::decode(&normalized).map_err(|e| ExplorerError::invalid_format(format!("Invalid hex value: {e}")))
}

fn be_integer(bytes: &[u8]) -> i64 {
    bytes
        .iter()
        .fold(0i64, |acc, b| (acc << 8) | i64::from(*b))
}

/// Infer a type from payload length: 1 → uint8, 2 → uint16, 4 → uint32,
/// anything else → buffer.
///
/// Length is a heuristic only; a 2-byte signed value still reads as uint16
/// unless the caller names the type explicitly.
pub fn infer_type(hex_payload: &str) -> Result<TypedValue> {
    let bytes = decode_bytes(hex_payload)?;
    let data_type = match bytes.len() {
        1 => DataType::Uint8,
        2 => DataType::Uint16,
        4 => DataType::Uint32,
        _ => return Ok(TypedValue::new(DataType::Buffer, bytes)),
    };
    Ok(TypedValue::new(data_type, AttrValue::Integer(be_integer(&bytes))))
}

/// Parse a payload as an explicitly named type.
///
/// Numeric types are read as unsigned integers of the type's width; signed
/// types keep their wire bits (`int8` `ff` is 255, not -1).
pub fn parse_typed(type_name: &str, hex_payload: &str) -> Result<TypedValue> {
    let data_type = DataType::from_name(type_name)
        .ok_or_else(|| ExplorerError::UnknownType(type_name.trim().to_string()))?;
    parse_as(data_type, hex_payload)
}

/// [`parse_typed`] with an already resolved type
pub fn parse_as(data_type: DataType, hex_payload: &str) -> Result<TypedValue> {
    let normalized = normalize_hex(hex_payload)?;
    match data_type.width() {
        None if data_type == DataType::Buffer => Ok(TypedValue::new(data_type, decode_bytes(&normalized)?)),
        None => Ok(TypedValue::new(data_type, AttrValue::Text(normalized))),
        Some(width) => {
            let significant = normalized.trim_start_matches('0');
            let max = if width >= 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 };
            let value = if significant.is_empty() {
                0
            } else if significant.len() > 16 {
                u64::MAX
            } else {
                u64::from_str_radix(significant, 16).map_err(|e| {
                    ExplorerError::invalid_format(format!("Invalid hex value '{hex_payload}': {e}"))
                })?
            };
            if significant.len() > 16 || value > max {
                return Err(ExplorerError::invalid_format(format!(
                    "Value 0x{} does not fit in {} ({} bytes)",
                    normalized, data_type, width
                )));
            }
            Ok(TypedValue::new(data_type, AttrValue::Integer(value as i64)))
        },
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Minimal whole-byte count for a non-negative magnitude (at least one)
fn byte_width(n: u64) -> usize {
    let bits = 64 - n.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn hex_padded(n: u64, bytes: usize) -> String {
    format!("{:0width$X}", n, width = bytes * 2)
}

fn byte_breakdown(n: u64, bytes: usize) -> String {
    (0..bytes)
        .rev()
        .map(|i| format!("{:02X}", (n >> (i * 8)) & 0xFF))
        .collect::<Vec<_>>()
        .join(" ")
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_integer(n: i64, width: Option<usize>, mode: DisplayMode) -> String {
    let magnitude = n.unsigned_abs();
    let bytes = width.unwrap_or(0).max(byte_width(magnitude));
    let sign = if n < 0 { "-" } else { "" };

    match mode {
        DisplayMode::RawHex => format!("{}{}", sign, hex_padded(magnitude, bytes)),
        DisplayMode::Friendly if n < 0 => format!("{} (-0x{})", n, hex_padded(magnitude, bytes)),
        DisplayMode::Friendly if magnitude < 256 => {
            format!("{} (0x{})", n, hex_padded(magnitude, bytes))
        },
        DisplayMode::Friendly => format!(
            "{} (0x{}) [{}]",
            n,
            hex_padded(magnitude, bytes),
            byte_breakdown(magnitude, bytes)
        ),
    }
}

fn format_bytes(bytes: &[u8], mode: DisplayMode) -> String {
    match mode {
        DisplayMode::RawHex => hex::encode_upper(bytes),
        DisplayMode::Friendly => {
            let unit = if bytes.len() == 1 { "byte" } else { "bytes" };
            if bytes.is_empty() {
                format!("[0 {unit}]")
            } else {
                format!("[{} {}] {}", bytes.len(), unit, spaced_hex(bytes))
            }
        },
    }
}

/// Render a value whose data type is unknown (transport reads and reports)
pub fn format_value(value: &AttrValue, mode: DisplayMode) -> String {
    match value {
        AttrValue::Integer(n) => format_integer(*n, None, mode),
        AttrValue::Bytes(bytes) => format_bytes(bytes, mode),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Text(s) if mode.is_raw() => s.clone(),
        AttrValue::Text(s) => format!("\"{s}\""),
        AttrValue::List(items) if mode.is_raw() => items
            .iter()
            .map(|item| format_value(item, mode))
            .collect::<Vec<_>>()
            .join(" "),
        AttrValue::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| format_value(item, mode))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Render a typed value; numeric types pad to their wire width
pub fn format_typed(typed: &TypedValue, mode: DisplayMode) -> String {
    match (&typed.value, typed.data_type.width()) {
        (AttrValue::Integer(n), width) => format_integer(*n, width, mode),
        (value, _) => format_value(value, mode),
    }
}
