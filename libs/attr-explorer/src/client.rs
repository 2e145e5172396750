//! Attribute client
//!
//! Single-attribute read/write against the transport for the configured
//! target. Reads never fail as a call: "no data" and transport errors are
//! folded into [`ReadOutcome`].

use std::sync::Arc;

use attr_link::{
    AttrValue, AttributeId, AttributeTransport, ClusterList, Endpoint, Target, WriteOptions,
};
use tracing::{debug, warn};

use crate::codec::{self, DisplayMode, TypedValue};
use crate::error::{ExplorerError, Result};

/// Outcome of a single read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Value(AttrValue),
    /// Response carried no value for the id
    Empty,
    Failed(String),
}

impl ReadOutcome {
    pub fn is_value(&self) -> bool {
        matches!(self, ReadOutcome::Value(_))
    }

    /// One display line: `label = value`, `label: No data` or `label: <error>`
    pub fn line(&self, label: &str, mode: DisplayMode) -> String {
        match self {
            ReadOutcome::Value(value) => format!("{} = {}", label, codec::format_value(value, mode)),
            ReadOutcome::Empty => format!("{label}: No data"),
            ReadOutcome::Failed(msg) => format!("{label}: {msg}"),
        }
    }
}

impl From<ExplorerError> for ReadOutcome {
    fn from(err: ExplorerError) -> Self {
        ReadOutcome::Failed(err.to_string())
    }
}

/// Outcome of a write followed by a read-back
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub result: Result<()>,
    /// `None` when the write itself failed and no read-back was attempted
    pub readback: Option<ReadOutcome>,
}

impl WriteOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Read-back note for display, if one was attempted
    pub fn readback_text(&self, mode: DisplayMode) -> Option<String> {
        self.readback.as_ref().map(|outcome| match outcome {
            ReadOutcome::Value(value) => codec::format_value(value, mode),
            ReadOutcome::Empty => "no data".to_string(),
            ReadOutcome::Failed(msg) => format!("read-back failed: {msg}"),
        })
    }
}

/// Client bound to one target (namespace + vendor qualifier)
pub struct AttributeClient<T: AttributeTransport> {
    transport: Arc<T>,
    target: Target,
}

impl<T: AttributeTransport> AttributeClient<T> {
    pub fn new(transport: Arc<T>, target: Target) -> Self {
        Self { transport, target }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub async fn resolve_endpoint(&self, id: u8) -> Result<Endpoint> {
        Ok(self.transport.resolve_endpoint(id).await?)
    }

    pub async fn list_clusters(&self, endpoint: &Endpoint) -> Result<ClusterList> {
        Ok(self.transport.list_clusters(endpoint).await?)
    }

    /// Read one attribute; `Ok(None)` when the response carried no value
    pub async fn read_value(&self, endpoint: &Endpoint, id: AttributeId) -> Result<Option<AttrValue>> {
        debug!("read ep{} {} ({})", endpoint.id, id, self.target.namespace);
        let mut values = self.transport.read(endpoint, &self.target, &[id]).await?;
        Ok(values.remove(&id))
    }

    pub async fn read_one(&self, endpoint: &Endpoint, id: AttributeId) -> ReadOutcome {
        match self.read_value(endpoint, id).await {
            Ok(Some(value)) => ReadOutcome::Value(value),
            Ok(None) => ReadOutcome::Empty,
            Err(e) => {
                debug!("read ep{} {} failed: {}", endpoint.id, id, e);
                ReadOutcome::from(e)
            },
        }
    }

    /// Write without read-back
    pub async fn write_one(
        &self,
        endpoint: &Endpoint,
        id: AttributeId,
        typed: &TypedValue,
    ) -> Result<()> {
        debug!(
            "write ep{} {} type=0x{:02X} value={:?}",
            endpoint.id,
            id,
            typed.data_type.tag(),
            typed.value
        );
        self.transport
            .write(
                endpoint,
                &self.target,
                &[typed.to_write(id)],
                WriteOptions::default(),
            )
            .await?;
        Ok(())
    }

    /// Write, then read the attribute back; read-back failure does not fail
    /// the write.
    pub async fn write_with_readback(
        &self,
        endpoint: &Endpoint,
        id: AttributeId,
        typed: &TypedValue,
    ) -> WriteOutcome {
        if let Err(e) = self.write_one(endpoint, id, typed).await {
            warn!("write ep{} {} failed: {}", endpoint.id, id, e);
            return WriteOutcome {
                result: Err(e),
                readback: None,
            };
        }

        let readback = self.read_one(endpoint, id).await;
        if let ReadOutcome::Failed(msg) = &readback {
            debug!("read-back ep{} {} failed: {}", endpoint.id, id, msg);
        }
        WriteOutcome {
            result: Ok(()),
            readback: Some(readback),
        }
    }
}
