//! Core Transport Trait
//!
//! The attribute transport is the external collaborator the explorer talks
//! to: it resolves endpoints, lists clusters and carries read/write requests
//! for one namespace + vendor qualifier.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{AttrValue, AttributeId, ClusterList, Endpoint, Target};

/// One attribute in a write request
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeWrite {
    pub id: AttributeId,
    pub value: AttrValue,
    /// Wire type tag (see `DataType::tag`)
    pub type_tag: u8,
}

/// Write request options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Ask the target to confirm the write with a response frame
    pub confirmation_requested: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            confirmation_requested: true,
        }
    }
}

/// Attribute transport trait
///
/// Implementations own addressing of the remote entity; callers only ever
/// name an endpoint id and the target namespace.
#[async_trait]
pub trait AttributeTransport: Send + Sync {
    /// Get implementation name
    fn name(&self) -> &str;

    /// Resolve a numeric endpoint id to a handle
    async fn resolve_endpoint(&self, id: u8) -> Result<Endpoint>;

    /// List input/output clusters exposed by an endpoint
    async fn list_clusters(&self, endpoint: &Endpoint) -> Result<ClusterList>;

    /// Read attributes; ids without data may be omitted from the result
    async fn read(
        &self,
        endpoint: &Endpoint,
        target: &Target,
        ids: &[AttributeId],
    ) -> Result<HashMap<AttributeId, AttrValue>>;

    /// Write attributes
    async fn write(
        &self,
        endpoint: &Endpoint,
        target: &Target,
        writes: &[AttributeWrite],
        options: WriteOptions,
    ) -> Result<()>;
}
