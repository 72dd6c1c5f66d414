// # Memory DNS Provider
//
// In-memory implementation of DnsServiceProvider.
//
// ## Purpose
//
// Holds zones in a map protected by a RwLock. Every stored record carries
// a provider-assigned identifier, returned in `RecordConfig::original`, so
// corrections address records the way a real per-record API would.
//
// ## When to Use
//
// - Testing the pipeline end to end without network access
// - Demonstrations and dry runs
//
// State is lost when the process exits.

use crate::capabilities::{Capability, DocumentationNote, DocumentationNotes};
use crate::config::ProviderInstanceConfig;
use crate::correction::{Correction, CorrectionAction};
use crate::diff::{Change, ChangeType, Differ};
use crate::error::{Error, Result};
use crate::models::{DomainConfig, Nameserver, Original, RecordConfig};
use crate::registry::ProviderMetadata;
use crate::traits::{DnsServiceProvider, DnsServiceProviderFactory};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Type name of the in-memory adapter
pub const MEMORY_TYPE: &str = "MEMORY";

/// Instance setting: comma-separated nameservers reported for every zone
pub const NAMESERVERS_META: &str = "nameservers";

/// Identifier of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRecordId(pub u64);

type ZoneMap = HashMap<String, Vec<(MemoryRecordId, RecordConfig)>>;

/// Shared zone storage
///
/// Cloning is cheap and clones share state, so a test can keep a handle
/// while the engine drives the provider.
#[derive(Debug, Clone, Default)]
pub struct MemoryZones {
    inner: Arc<RwLock<ZoneMap>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryZones {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) -> MemoryRecordId {
        MemoryRecordId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Create `zone` (if needed) and append `records`
    pub async fn seed(&self, zone: &str, records: Vec<RecordConfig>) {
        let stored: Vec<_> = records
            .into_iter()
            .map(|mut rc| {
                rc.original = None;
                (self.allocate(), rc)
            })
            .collect();
        let mut guard = self.inner.write().await;
        guard.entry(zone.to_string()).or_default().extend(stored);
    }

    /// Records of `zone`, without identifiers
    pub async fn records(&self, zone: &str) -> Option<Vec<RecordConfig>> {
        let guard = self.inner.read().await;
        guard
            .get(zone)
            .map(|records| records.iter().map(|(_, rc)| rc.clone()).collect())
    }

    /// Names of all zones, sorted
    pub async fn zone_names(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply one change produced by the by-record diff
    async fn apply(&self, zone: &str, change: &Change) -> Result<()> {
        let mut guard = self.inner.write().await;
        let records = guard
            .get_mut(zone)
            .ok_or_else(|| Error::not_found(format!("zone {zone}")))?;
        match change.change_type {
            ChangeType::Report => {}
            ChangeType::Create => {
                for rc in &change.new {
                    records.push((self.allocate(), rc.clone()));
                }
            }
            ChangeType::Delete => {
                for old in &change.old {
                    let id = record_id(old)?;
                    records.retain(|(rid, _)| *rid != id);
                }
            }
            ChangeType::Change => {
                for (old, new) in change.old.iter().zip(&change.new) {
                    let id = record_id(old)?;
                    let slot = records
                        .iter_mut()
                        .find(|(rid, _)| *rid == id)
                        .ok_or_else(|| Error::not_found(format!("{zone}: record {}", id.0)))?;
                    slot.1 = new.clone();
                }
            }
        }
        Ok(())
    }
}

fn record_id(rc: &RecordConfig) -> Result<MemoryRecordId> {
    rc.original
        .as_ref()
        .and_then(|o| o.downcast_ref::<MemoryRecordId>())
        .copied()
        .ok_or_else(|| Error::provider(MEMORY_TYPE, format!("{rc}: record has no memory identifier")))
}

/// In-memory DNS provider
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    zones: MemoryZones,
    nameservers: Vec<String>,
}

impl MemoryProvider {
    /// A provider with empty storage
    pub fn new() -> Self {
        Self::with_zones(MemoryZones::new())
    }

    /// A provider over shared storage
    pub fn with_zones(zones: MemoryZones) -> Self {
        Self {
            zones,
            nameservers: Vec::new(),
        }
    }

    /// Nameservers reported by [`DnsServiceProvider::get_nameservers`]
    pub fn with_nameservers<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.nameservers = names.iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    /// The underlying storage
    pub fn zones(&self) -> &MemoryZones {
        &self.zones
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsServiceProvider for MemoryProvider {
    fn provider_name(&self) -> &str {
        MEMORY_TYPE
    }

    async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
        Ok(Nameserver::from_names(self.nameservers.as_slice()))
    }

    async fn get_zone_records(
        &self,
        domain: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<RecordConfig>> {
        let guard = self.zones.inner.read().await;
        let records = guard
            .get(domain)
            .ok_or_else(|| Error::not_found(format!("zone {domain}")))?;
        Ok(records
            .iter()
            .map(|(id, rc)| rc.clone().with_original(Original::new(*id)))
            .collect())
    }

    async fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        observed: Vec<RecordConfig>,
    ) -> Result<(Vec<Correction>, usize)> {
        let changes = Differ::new(dc, self.comparable_meta_keys()).by_record(&observed);
        let count = changes.actual_change_count();
        debug!(zone = %dc.name, changes = count, "memory corrections");
        let corrections = changes.into_corrections(|change| -> CorrectionAction {
            let zones = self.zones.clone();
            let zone = dc.name.clone();
            let change = change.clone();
            Box::pin(async move { zones.apply(&zone, &change).await })
        });
        Ok((corrections, count))
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        Ok(self.zones.zone_names().await)
    }

    async fn ensure_zone_exists(&self, domain: &str, _meta: &BTreeMap<String, String>) -> Result<()> {
        let mut guard = self.zones.inner.write().await;
        if !guard.contains_key(domain) {
            debug!(zone = %domain, "creating memory zone");
            guard.insert(domain.to_string(), Vec::new());
        }
        Ok(())
    }
}

/// Factory for [`MemoryProvider`]
///
/// Every created instance starts empty unless the factory was built over
/// shared storage with [`MemoryProviderFactory::with_zones`].
#[derive(Default)]
pub struct MemoryProviderFactory {
    zones: Option<MemoryZones>,
}

impl MemoryProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the same storage to every created instance
    pub fn with_zones(zones: MemoryZones) -> Self {
        Self { zones: Some(zones) }
    }
}

impl DnsServiceProviderFactory for MemoryProviderFactory {
    fn metadata(&self) -> ProviderMetadata {
        let mut features = DocumentationNotes::new();
        features.insert(Capability::CanConcur, DocumentationNote::can());
        features.insert(Capability::DocDualHost, DocumentationNote::can());
        features.insert(Capability::CanAutoDnssec, DocumentationNote::can_with("intent is accepted and ignored"));
        ProviderMetadata {
            type_name: MEMORY_TYPE.to_string(),
            maintainer: "zonectl".to_string(),
            record_types: Vec::new(),
            features,
            lists_zones: true,
            creates_zones: true,
            creds_schema: Vec::new(),
        }
    }

    fn create(&self, config: &ProviderInstanceConfig) -> Result<Box<dyn DnsServiceProvider>> {
        let zones = self.zones.clone().unwrap_or_default();
        let nameservers: Vec<&str> = config
            .meta
            .get(NAMESERVERS_META)
            .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Ok(Box::new(MemoryProvider::with_zones(zones).with_nameservers(nameservers.as_slice())))
    }
}
