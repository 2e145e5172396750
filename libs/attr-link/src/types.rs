//! Attribute vocabulary shared by transports and the explorer core
//!
//! Attribute ids, the closed set of wire data types, and the value model
//! used for transport payloads and decoded operator input.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Attribute Id
// ============================================================================

/// 16-bit attribute identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeId(pub u16);

impl AttributeId {
    pub fn value(self) -> u16 {
        self.0
    }

    /// Lowercase zero-padded map key, e.g. `0515`
    pub fn key(self) -> String {
        format!("{:04x}", self.0)
    }
}

impl From<u16> for AttributeId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

// ============================================================================
// Data Type
// ============================================================================

/// Closed set of attribute data types with their wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Int8,
    Int16,
    Int32,
    /// Octet string
    Buffer,
    /// Character string
    #[serde(rename = "string")]
    CharString,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Buffer,
        DataType::CharString,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Buffer => "buffer",
            DataType::CharString => "string",
        }
    }

    /// Numeric type tag carried on the wire
    pub fn tag(self) -> u8 {
        match self {
            DataType::Uint8 => 0x20,
            DataType::Uint16 => 0x21,
            DataType::Uint32 => 0x23,
            DataType::Int8 => 0x28,
            DataType::Int16 => 0x29,
            DataType::Int32 => 0x2B,
            DataType::Buffer => 0x41,
            DataType::CharString => 0x42,
        }
    }

    /// Fixed byte width, `None` for variable-width types
    pub fn width(self) -> Option<usize> {
        match self {
            DataType::Uint8 | DataType::Int8 => Some(1),
            DataType::Uint16 | DataType::Int16 => Some(2),
            DataType::Uint32 | DataType::Int32 => Some(4),
            DataType::Buffer | DataType::CharString => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.width().is_some()
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Attribute Value
// ============================================================================

/// Attribute value as delivered by a transport or decoded from operator input
///
/// JSON form: bool, number, string, array, or `{"hex": "0A0B"}` for bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    List(Vec<AttrValue>),
    Bytes(#[serde(with = "hex_object")] Vec<u8>),
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Bytes as `{"hex": "0A0B"}` so they stay distinguishable from lists
mod hex_object {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct HexRepr {
        hex: String,
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        HexRepr {
            hex: hex::encode_upper(bytes),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let repr = HexRepr::deserialize(deserializer)?;
        hex::decode(&repr.hex).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Addressing
// ============================================================================

/// Protocol namespace (cluster) plus vendor qualifier the tool is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub namespace: String,
    pub vendor_qualifier: u16,
}

/// Resolved endpoint handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub id: u8,
}

/// Cluster descriptor as listed by an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub id: u16,
    pub name: Option<String>,
}

impl ClusterInfo {
    pub fn new(id: u16, name: Option<&str>) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
        }
    }
}

impl fmt::Display for ClusterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "0x{:04X} {}", self.id, name),
            None => write!(f, "0x{:04X}", self.id),
        }
    }
}

/// Input (server) and output (client) clusters of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterList {
    pub input: Vec<ClusterInfo>,
    pub output: Vec<ClusterInfo>,
}

/// Unsolicited attribute report delivered by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeReport {
    pub endpoint: u8,
    pub namespace: String,
    pub attributes: Vec<(AttributeId, AttrValue)>,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_attribute_id_display_and_key() {
        let id = AttributeId(0x0aBc);
        assert_eq!(id.to_string(), "0x0ABC");
        assert_eq!(id.key(), "0abc");
        assert_eq!(AttributeId(0x5).to_string(), "0x0005");
    }

    #[test]
    fn test_data_type_lookup_is_case_insensitive() {
        assert_eq!(DataType::from_name("UINT16"), Some(DataType::Uint16));
        assert_eq!(DataType::from_name(" Buffer "), Some(DataType::Buffer));
        assert_eq!(DataType::from_name("string"), Some(DataType::CharString));
        assert_eq!(DataType::from_name("float32"), None);
    }

    #[test]
    fn test_data_type_tags_and_widths() {
        assert_eq!(DataType::Uint8.tag(), 0x20);
        assert_eq!(DataType::Int32.tag(), 0x2B);
        assert_eq!(DataType::from_tag(0x41), Some(DataType::Buffer));
        assert_eq!(DataType::Uint32.width(), Some(4));
        assert_eq!(DataType::CharString.width(), None);
        assert!(!DataType::Buffer.is_numeric());
    }

    #[test]
    fn test_attr_value_json_forms() {
        let values = vec![
            AttrValue::Integer(20),
            AttrValue::Bool(true),
            AttrValue::Text("abc".into()),
            AttrValue::Bytes(vec![0x0A, 0xFF]),
            AttrValue::List(vec![AttrValue::Integer(1), AttrValue::Text("0A".into())]),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(
            json,
            r#"[20,true,"abc",{"hex":"0AFF"},[1,"0A"]]"#
        );

        let back: Vec<AttrValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_cluster_info_display() {
        assert_eq!(ClusterInfo::new(0, Some("genBasic")).to_string(), "0x0000 genBasic");
        assert_eq!(ClusterInfo::new(0xEF00, None).to_string(), "0xEF00");
    }
}
