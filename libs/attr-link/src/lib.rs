//! Attribute Link Library
//!
//! Shared vocabulary and transport abstraction for typed key/value device
//! attribute protocols (modeled on the Zigbee Cluster Library attribute model).
//!
//! # Architecture
//!
//! This library provides:
//! - **Types**: `AttributeId`, `DataType`, `AttrValue`, `Target`, `Endpoint`
//! - **Core Trait**: `AttributeTransport` for read/write/endpoint/cluster access
//! - **Errors**: `AttrLinkError` with unsupported-attribute detection
//! - **Memory device**: `SimulatedDevice`, an in-memory transport used by the
//!   CLI demo mode and by tests

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export core types
pub use error::{AttrLinkError, Result};
pub use memory::SimulatedDevice;
pub use traits::{AttributeTransport, AttributeWrite, WriteOptions};
pub use types::{
    AttrValue, AttributeId, AttributeReport, ClusterInfo, ClusterList, DataType, Endpoint, Target,
};
