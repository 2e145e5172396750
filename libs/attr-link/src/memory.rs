//! In-memory simulated device
//!
//! A simple attribute target for demo mode and testing. Holds per-endpoint
//! attribute tables and cluster lists, can script per-attribute failures,
//! and counts every request it serves.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AttrLinkError, Result};
use crate::traits::{AttributeTransport, AttributeWrite, WriteOptions};
use crate::types::{
    AttrValue, AttributeId, AttributeReport, ClusterInfo, ClusterList, Endpoint, Target,
};

#[derive(Debug, Default)]
struct EndpointState {
    clusters: ClusterList,
    /// `None` = attribute known but currently holds no data
    attributes: HashMap<AttributeId, Option<AttrValue>>,
    read_only: HashSet<AttributeId>,
    write_only: HashSet<AttributeId>,
    failures: HashMap<AttributeId, AttrLinkError>,
}

/// Simulated attribute target
pub struct SimulatedDevice {
    namespace: String,
    endpoints: RwLock<HashMap<u8, EndpointState>>,
    latency: Option<Duration>,
    read_requests: AtomicUsize,
    write_requests: AtomicUsize,
    writes: Mutex<Vec<(u8, AttributeWrite, WriteOptions)>>,
    subscribers: Mutex<Vec<(String, mpsc::UnboundedSender<AttributeReport>)>>,
}

impl SimulatedDevice {
    /// Create a device serving `namespace` with no endpoints
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            endpoints: RwLock::new(HashMap::new()),
            latency: None,
            read_requests: AtomicUsize::new(0),
            write_requests: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Add per-request latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add an endpoint with the given cluster lists
    pub fn with_endpoint(self, id: u8, clusters: ClusterList) -> Self {
        self.endpoints.write().insert(
            id,
            EndpointState {
                clusters,
                ..Default::default()
            },
        );
        self
    }

    /// Device preloaded with a small manufacturer-specific attribute table
    pub fn seeded(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let clusters = ClusterList {
            input: vec![
                ClusterInfo::new(0x0000, Some("genBasic")),
                ClusterInfo::new(0x0006, Some("genOnOff")),
                ClusterInfo::new(0xFC00, Some(namespace.as_str())),
            ],
            output: vec![ClusterInfo::new(0x0019, Some("genOta"))],
        };
        let device = Self::new(namespace).with_endpoint(1, clusters).with_endpoint(
            2,
            ClusterList {
                input: vec![ClusterInfo::new(0xFC00, None)],
                output: Vec::new(),
            },
        );

        device.set_attribute(1, 0x0000, AttrValue::Integer(0x03));
        device.set_attribute(1, 0x0001, AttrValue::Integer(0x0514));
        device.set_attribute(1, 0x0002, AttrValue::Integer(0x0001_86A0));
        device.set_attribute(1, 0x0003, AttrValue::Bytes(vec![0xDE, 0xAD, 0xBE]));
        device.set_attribute(1, 0x0004, AttrValue::Text("fw-1.4.2".to_string()));
        device.set_no_data(1, 0x0005);
        device.set_attribute(1, 0x0515, AttrValue::Integer(0x0A));
        device.set_attribute(1, 0x0516, AttrValue::Integer(0x0100));
        device.set_attribute(1, 0x0524, AttrValue::Integer(0x0014));
        device.set_read_only(1, 0x0000);
        device.set_write_only(1, 0x0600);
        device.set_attribute(2, 0x0000, AttrValue::Integer(0x01));
        device
    }

    /// Namespace this device serves
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_attribute(&self, endpoint: u8, id: u16, value: AttrValue) {
        self.with_state(endpoint, |state| {
            state.attributes.insert(AttributeId(id), Some(value));
        });
    }

    /// Mark an attribute as known but holding no data
    pub fn set_no_data(&self, endpoint: u8, id: u16) {
        self.with_state(endpoint, |state| {
            state.attributes.insert(AttributeId(id), None);
        });
    }

    pub fn remove_attribute(&self, endpoint: u8, id: u16) {
        self.with_state(endpoint, |state| {
            state.attributes.remove(&AttributeId(id));
        });
    }

    pub fn set_read_only(&self, endpoint: u8, id: u16) {
        self.with_state(endpoint, |state| {
            state.read_only.insert(AttributeId(id));
        });
    }

    /// Writable attribute whose reads fail with `WRITE_ONLY`
    pub fn set_write_only(&self, endpoint: u8, id: u16) {
        self.with_state(endpoint, |state| {
            state.write_only.insert(AttributeId(id));
            state.attributes.entry(AttributeId(id)).or_insert(None);
        });
    }

    /// Script a failure for every request touching this attribute
    pub fn fail_attribute(&self, endpoint: u8, id: u16, error: AttrLinkError) {
        self.with_state(endpoint, |state| {
            state.failures.insert(AttributeId(id), error);
        });
    }

    pub fn clear_failure(&self, endpoint: u8, id: u16) {
        self.with_state(endpoint, |state| {
            state.failures.remove(&AttributeId(id));
        });
    }

    /// Current stored value, `None` if absent or holding no data
    pub fn attribute(&self, endpoint: u8, id: u16) -> Option<AttrValue> {
        self.endpoints
            .read()
            .get(&endpoint)
            .and_then(|state| state.attributes.get(&AttributeId(id)).cloned().flatten())
    }

    pub fn read_requests(&self) -> usize {
        self.read_requests.load(Ordering::Relaxed)
    }

    pub fn write_requests(&self) -> usize {
        self.write_requests.load(Ordering::Relaxed)
    }

    /// Every accepted write as (endpoint, write, options)
    pub fn writes(&self) -> Vec<(u8, AttributeWrite, WriteOptions)> {
        self.writes.lock().clone()
    }

    /// Subscribe to reports for one namespace; other namespaces are filtered out
    pub fn subscribe(
        &self,
        namespace: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<AttributeReport> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push((namespace.into(), tx));
        rx
    }

    /// Deliver an unsolicited report, returning how many subscribers got it
    pub fn emit_report(&self, report: AttributeReport) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(_, tx)| !tx.is_closed());
        let mut delivered = 0;
        for (namespace, tx) in subscribers.iter() {
            if *namespace == report.namespace && tx.send(report.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    fn with_state(&self, endpoint: u8, f: impl FnOnce(&mut EndpointState)) {
        let mut endpoints = self.endpoints.write();
        f(endpoints.entry(endpoint).or_default());
    }

    fn check_namespace(&self, target: &Target) -> Result<()> {
        if target.namespace != self.namespace {
            return Err(AttrLinkError::transport(format!(
                "Cluster '{}' not found on device",
                target.namespace
            )));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AttributeTransport for SimulatedDevice {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn resolve_endpoint(&self, id: u8) -> Result<Endpoint> {
        if self.endpoints.read().contains_key(&id) {
            Ok(Endpoint { id })
        } else {
            Err(AttrLinkError::EndpointNotFound(id))
        }
    }

    async fn list_clusters(&self, endpoint: &Endpoint) -> Result<ClusterList> {
        self.endpoints
            .read()
            .get(&endpoint.id)
            .map(|state| state.clusters.clone())
            .ok_or(AttrLinkError::EndpointNotFound(endpoint.id))
    }

    async fn read(
        &self,
        endpoint: &Endpoint,
        target: &Target,
        ids: &[AttributeId],
    ) -> Result<HashMap<AttributeId, AttrValue>> {
        self.read_requests.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        self.check_namespace(target)?;

        let endpoints = self.endpoints.read();
        let state = endpoints
            .get(&endpoint.id)
            .ok_or(AttrLinkError::EndpointNotFound(endpoint.id))?;

        let mut values = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(err) = state.failures.get(id) {
                return Err(err.clone());
            }
            if state.write_only.contains(id) {
                return Err(AttrLinkError::transport(format!(
                    "Status 'WRITE_ONLY' for attribute {id}"
                )));
            }
            match state.attributes.get(id) {
                Some(Some(value)) => {
                    values.insert(*id, value.clone());
                },
                Some(None) => {},
                None => return Err(AttrLinkError::UnsupportedAttribute(id.to_string())),
            }
        }
        debug!(
            "sim read ep{} {:?}: {} values",
            endpoint.id,
            ids,
            values.len()
        );
        Ok(values)
    }

    async fn write(
        &self,
        endpoint: &Endpoint,
        target: &Target,
        writes: &[AttributeWrite],
        options: WriteOptions,
    ) -> Result<()> {
        self.write_requests.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        self.check_namespace(target)?;

        let mut endpoints = self.endpoints.write();
        let state = endpoints
            .get_mut(&endpoint.id)
            .ok_or(AttrLinkError::EndpointNotFound(endpoint.id))?;

        // Validate the whole request before applying any of it
        for write in writes {
            if let Some(err) = state.failures.get(&write.id) {
                return Err(err.clone());
            }
            if state.read_only.contains(&write.id) {
                return Err(AttrLinkError::ReadOnly(write.id.to_string()));
            }
        }

        let mut log = self.writes.lock();
        for write in writes {
            state
                .attributes
                .insert(write.id, Some(write.value.clone()));
            log.push((endpoint.id, write.clone(), options));
        }
        debug!("sim write ep{}: {} attributes", endpoint.id, writes.len());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn target() -> Target {
        Target {
            namespace: "manuSpecific".to_string(),
            vendor_qualifier: 0x1234,
        }
    }

    #[tokio::test]
    async fn test_read_returns_values_and_omits_no_data() {
        let device = SimulatedDevice::new("manuSpecific").with_endpoint(1, ClusterList::default());
        device.set_attribute(1, 0x0010, AttrValue::Integer(7));
        device.set_no_data(1, 0x0011);

        let ep = device.resolve_endpoint(1).await.unwrap();
        let values = device
            .read(&ep, &target(), &[AttributeId(0x0010), AttributeId(0x0011)])
            .await
            .unwrap();

        assert_eq!(values.get(&AttributeId(0x0010)), Some(&AttrValue::Integer(7)));
        assert!(!values.contains_key(&AttributeId(0x0011)));
        assert_eq!(device.read_requests(), 1);
    }

    #[tokio::test]
    async fn test_unknown_attribute_is_unsupported() {
        let device = SimulatedDevice::new("manuSpecific").with_endpoint(1, ClusterList::default());
        let ep = Endpoint { id: 1 };

        let err = device
            .read(&ep, &target(), &[AttributeId(0x0999)])
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_write_only_attribute_fails_read_but_accepts_write() {
        let device = SimulatedDevice::new("manuSpecific").with_endpoint(1, ClusterList::default());
        device.set_write_only(1, 0x0600);
        let ep = Endpoint { id: 1 };

        let write = AttributeWrite {
            id: AttributeId(0x0600),
            value: AttrValue::Integer(1),
            type_tag: 0x20,
        };
        device
            .write(&ep, &target(), &[write], WriteOptions::default())
            .await
            .unwrap();

        let err = device
            .read(&ep, &target(), &[AttributeId(0x0600)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("WRITE_ONLY"));
        assert!(!err.is_unsupported());
    }

    #[tokio::test]
    async fn test_read_only_write_is_rejected_without_side_effects() {
        let device = SimulatedDevice::new("manuSpecific").with_endpoint(1, ClusterList::default());
        device.set_attribute(1, 0x0000, AttrValue::Integer(3));
        device.set_read_only(1, 0x0000);
        let ep = Endpoint { id: 1 };

        let writes = [
            AttributeWrite {
                id: AttributeId(0x0001),
                value: AttrValue::Integer(9),
                type_tag: 0x20,
            },
            AttributeWrite {
                id: AttributeId(0x0000),
                value: AttrValue::Integer(4),
                type_tag: 0x20,
            },
        ];
        let err = device
            .write(&ep, &target(), &writes, WriteOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, AttrLinkError::ReadOnly("0x0000".to_string()));
        assert_eq!(device.attribute(1, 0x0001), None);
        assert_eq!(device.attribute(1, 0x0000), Some(AttrValue::Integer(3)));
    }

    #[tokio::test]
    async fn test_wrong_namespace_and_missing_endpoint() {
        let device = SimulatedDevice::new("manuSpecific").with_endpoint(1, ClusterList::default());
        let other = Target {
            namespace: "genBasic".to_string(),
            vendor_qualifier: 0,
        };

        assert!(device
            .read(&Endpoint { id: 1 }, &other, &[AttributeId(0)])
            .await
            .is_err());
        assert_eq!(
            device.resolve_endpoint(9).await.unwrap_err(),
            AttrLinkError::EndpointNotFound(9)
        );
    }

    #[tokio::test]
    async fn test_reports_are_filtered_by_namespace() {
        let device = SimulatedDevice::new("manuSpecific");
        let mut rx = device.subscribe("manuSpecific");

        let other = AttributeReport {
            endpoint: 1,
            namespace: "genOnOff".to_string(),
            attributes: vec![(AttributeId(0), AttrValue::Bool(true))],
        };
        let ours = AttributeReport {
            endpoint: 1,
            namespace: "manuSpecific".to_string(),
            attributes: vec![(AttributeId(0x0515), AttrValue::Integer(10))],
        };

        assert_eq!(device.emit_report(other), 0);
        assert_eq!(device.emit_report(ours.clone()), 1);
        assert_eq!(rx.recv().await, Some(ours));
    }

    #[tokio::test]
    async fn test_seeded_device_lists_clusters() {
        let device = SimulatedDevice::seeded("manuSpecific");
        let ep = device.resolve_endpoint(1).await.unwrap();
        let clusters = device.list_clusters(&ep).await.unwrap();

        assert_eq!(clusters.input.len(), 3);
        assert_eq!(clusters.output[0].id, 0x0019);
        assert_eq!(device.attribute(1, 0x0524), Some(AttrValue::Integer(0x14)));
    }
}
