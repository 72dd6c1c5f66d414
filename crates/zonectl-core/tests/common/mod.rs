//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call and every executed correction so tests
//! can assert on what the pipeline did, not just on what it returned.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zonectl_core::audit::{RecordAuditor, rejectif};
use zonectl_core::capabilities::{Capability, DocumentationNote, DocumentationNotes};
use zonectl_core::config::ProviderInstanceConfig;
use zonectl_core::correction::{Correction, CorrectionAction};
use zonectl_core::diff::{ChangeList, Differ};
use zonectl_core::engine::{Engine, EngineEvent, ProviderSet};
use zonectl_core::error::{Error, Result};
use zonectl_core::models::{DomainConfig, HostnameDot, Nameserver, RecordConfig, RecordData};
use zonectl_core::registry::{ProviderMetadata, RegistrarMetadata};
use zonectl_core::traits::{
    DnsServiceProvider, DnsServiceProviderFactory, Registrar, RegistrarFactory, delegation_change,
};
use zonectl_core::{EngineConfig, ProviderRegistry};

pub const ZONE: &str = "example.com";
pub const MOCK_TYPE: &str = "MOCK";
pub const MOCK_REGISTRAR_TYPE: &str = "MOCKREG";

// ---------------------------------------------------------------------------
// record builders
// ---------------------------------------------------------------------------

pub fn a(short: &str, ip: &str, ttl: u32) -> RecordConfig {
    RecordConfig::new(short, ZONE, ttl, RecordData::A {
        address: ip.parse().unwrap(),
    })
    .unwrap()
}

pub fn cname(short: &str, target: &str, ttl: u32) -> RecordConfig {
    RecordConfig::new(short, ZONE, ttl, RecordData::Cname {
        target: HostnameDot::parse(target, ZONE).unwrap(),
    })
    .unwrap()
}

pub fn ns(short: &str, target: &str, ttl: u32) -> RecordConfig {
    RecordConfig::new(short, ZONE, ttl, RecordData::Ns {
        target: HostnameDot::parse(target, ZONE).unwrap(),
    })
    .unwrap()
}

pub fn txt(short: &str, value: &str, ttl: u32) -> RecordConfig {
    RecordConfig::new(short, ZONE, ttl, RecordData::Txt { txt: value.into() }).unwrap()
}

pub fn mx(short: &str, preference: u16, target: &str, ttl: u32) -> RecordConfig {
    RecordConfig::new(short, ZONE, ttl, RecordData::Mx {
        preference,
        mx: HostnameDot::parse(target, ZONE).unwrap(),
    })
    .unwrap()
}

pub fn zone_with(records: Vec<RecordConfig>) -> DomainConfig {
    let mut dc = DomainConfig::new(ZONE);
    dc.records = records;
    dc
}

/// Which grouping the mock provider diffs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    ByRecord,
    ByRecordSet,
    ByLabel,
    ByZone,
}

impl Grouping {
    pub const ALL: [Grouping; 4] = [
        Grouping::ByRecord,
        Grouping::ByRecordSet,
        Grouping::ByLabel,
        Grouping::ByZone,
    ];

    pub fn diff(self, dc: &DomainConfig, observed: &[RecordConfig]) -> ChangeList {
        let differ = Differ::new(dc, Vec::new());
        match self {
            Grouping::ByRecord => differ.by_record(observed),
            Grouping::ByRecordSet => differ.by_record_set(observed),
            Grouping::ByLabel => differ.by_label(observed),
            Grouping::ByZone => differ.by_zone(observed),
        }
    }
}

// ---------------------------------------------------------------------------
// recording DNS provider
// ---------------------------------------------------------------------------

/// A DNS provider serving canned records and recording executed corrections
///
/// Clones share state, so a test keeps one handle while the registry
/// factory hands out others.
#[derive(Clone)]
pub struct RecordingProvider {
    observed: Arc<Mutex<BTreeMap<String, Vec<RecordConfig>>>>,
    nameservers: Vec<String>,
    grouping: Grouping,
    /// Executed correction messages, in order
    applied: Arc<Mutex<Vec<String>>>,
    /// A correction whose message contains this fails
    fail_on: Option<String>,
    strict_txt: bool,
    read_calls: Arc<AtomicUsize>,
    created_zones: Arc<Mutex<Vec<String>>>,
    /// How long each correction action takes
    action_delay: Option<Duration>,
    /// How long `list_zones` takes
    list_delay: Option<Duration>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            observed: Arc::new(Mutex::new(BTreeMap::new())),
            nameservers: Vec::new(),
            grouping: Grouping::ByRecord,
            applied: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            strict_txt: false,
            read_calls: Arc::new(AtomicUsize::new(0)),
            created_zones: Arc::new(Mutex::new(Vec::new())),
            action_delay: None,
            list_delay: None,
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_zone(self, zone: &str, records: Vec<RecordConfig>) -> Self {
        self.observed.lock().unwrap().insert(zone.to_string(), records);
        self
    }

    pub fn with_nameservers(mut self, names: &[&str]) -> Self {
        self.nameservers = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Make every correction action take `delay`
    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = Some(delay);
        self
    }

    /// Make zone listing take `delay`
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Most correction actions ever running at the same time
    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Register TXT auditor predicates
    pub fn with_strict_txt(mut self) -> Self {
        self.strict_txt = true;
        self
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn created_zones(&self) -> Vec<String> {
        self.created_zones.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsServiceProvider for RecordingProvider {
    fn provider_name(&self) -> &str {
        MOCK_TYPE
    }

    async fn get_nameservers(&self, _domain: &str) -> Result<Vec<Nameserver>> {
        Ok(Nameserver::from_names(self.nameservers.as_slice()))
    }

    async fn get_zone_records(
        &self,
        domain: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<RecordConfig>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.observed
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("zone {domain}")))
    }

    async fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        observed: Vec<RecordConfig>,
    ) -> Result<(Vec<Correction>, usize)> {
        let changes = self.grouping.diff(dc, &observed);
        let count = changes.actual_change_count();
        let corrections = changes.into_corrections(|change| -> CorrectionAction {
            let applied = Arc::clone(&self.applied);
            let running = Arc::clone(&self.running);
            let max_running = Arc::clone(&self.max_running);
            let delay = self.action_delay;
            let msg = change.msg();
            let fail = self.fail_on.as_ref().is_some_and(|needle| msg.contains(needle));
            Box::pin(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                running.fetch_sub(1, Ordering::SeqCst);
                if fail {
                    return Err(Error::provider(MOCK_TYPE, format!("refused: {msg}")));
                }
                applied.lock().unwrap().push(msg);
                Ok(())
            })
        });
        Ok((corrections, count))
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.observed.lock().unwrap().keys().cloned().collect())
    }

    async fn ensure_zone_exists(&self, domain: &str, _meta: &BTreeMap<String, String>) -> Result<()> {
        self.created_zones.lock().unwrap().push(domain.to_string());
        self.observed
            .lock()
            .unwrap()
            .entry(domain.to_string())
            .or_default();
        Ok(())
    }

    fn auditor(&self) -> RecordAuditor {
        let mut auditor = RecordAuditor::new();
        if self.strict_txt {
            auditor
                .add("TXT", rejectif::txt_longer_than(255))
                .add("TXT", rejectif::txt_has_backticks);
        }
        auditor
    }
}

/// Factory handing out clones of one [`RecordingProvider`]
pub struct RecordingFactory {
    pub provider: RecordingProvider,
    pub metadata: ProviderMetadata,
}

impl DnsServiceProviderFactory for RecordingFactory {
    fn metadata(&self) -> ProviderMetadata {
        self.metadata.clone()
    }

    fn create(&self, _config: &ProviderInstanceConfig) -> Result<Box<dyn DnsServiceProvider>> {
        Ok(Box::new(self.provider.clone()))
    }
}

/// Registration record for the mock: every type, concurrent, no dual host
pub fn mock_metadata() -> ProviderMetadata {
    let mut features = DocumentationNotes::new();
    features.insert(Capability::CanConcur, DocumentationNote::can());
    ProviderMetadata {
        type_name: MOCK_TYPE.to_string(),
        maintainer: "tests".to_string(),
        features,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// mock registrar
// ---------------------------------------------------------------------------

/// A registrar with a fixed current delegation
#[derive(Clone)]
pub struct MockRegistrar {
    current: Vec<String>,
    applied: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockRegistrar {
    pub fn new(current: &[&str]) -> Self {
        Self {
            current: current.iter().map(|n| n.to_string()).collect(),
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Delegations set so far
    pub fn applied(&self) -> Vec<Vec<String>> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Registrar for MockRegistrar {
    fn registrar_name(&self) -> &str {
        MOCK_REGISTRAR_TYPE
    }

    async fn get_registrar_corrections(&self, dc: &DomainConfig) -> Result<Vec<Correction>> {
        let Some(change) = delegation_change(self.current.as_slice(), dc) else {
            return Ok(Vec::new());
        };
        let applied = Arc::clone(&self.applied);
        let new = change.new.clone();
        Ok(vec![Correction::new(change.describe(), async move {
            applied.lock().unwrap().push(new);
            Ok(())
        })])
    }
}

pub struct MockRegistrarFactory(pub MockRegistrar);

impl RegistrarFactory for MockRegistrarFactory {
    fn metadata(&self) -> RegistrarMetadata {
        RegistrarMetadata {
            type_name: MOCK_REGISTRAR_TYPE.to_string(),
            maintainer: "tests".to_string(),
            creds_schema: Vec::new(),
        }
    }

    fn create(&self, _config: &ProviderInstanceConfig) -> Result<Box<dyn Registrar>> {
        Ok(Box::new(self.0.clone()))
    }
}

// ---------------------------------------------------------------------------
// engine wiring
// ---------------------------------------------------------------------------

/// Engine with the mock bound as instance `"mock"` (and optionally a
/// registrar bound as `"reg"`)
pub fn engine_with(
    provider: RecordingProvider,
    metadata: ProviderMetadata,
    registrar: Option<MockRegistrar>,
    config: EngineConfig,
) -> (Engine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    let mut registry = ProviderRegistry::with_builtins();
    registry
        .register_dns_provider(Box::new(RecordingFactory {
            provider: provider.clone(),
            metadata: metadata.clone(),
        }))
        .unwrap();
    let mut set = ProviderSet::new();
    set.add_dns_provider("mock", metadata.type_name.clone(), Arc::new(provider));
    if let Some(reg) = registrar {
        registry
            .register_registrar(Box::new(MockRegistrarFactory(reg.clone())))
            .unwrap();
        set.add_registrar("reg", MOCK_REGISTRAR_TYPE, Arc::new(reg));
    }
    Engine::new(Arc::new(registry), set, config).expect("engine construction succeeds")
}

/// Engine with the mock and default settings
pub fn engine(provider: RecordingProvider) -> (Engine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    engine_with(provider, mock_metadata(), None, EngineConfig::default())
}

/// A zone bound to the `"mock"` instance
pub fn bound_zone(records: Vec<RecordConfig>) -> DomainConfig {
    let mut dc = zone_with(records);
    dc.dns_providers.insert("mock".to_string(), 0);
    dc
}

/// Drain every event currently in the channel
pub fn drain(rx: &mut tokio::sync::mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}
