//! Correction pipeline
//!
//! The engine turns a list of desired zones into executed (or previewed)
//! corrections:
//!
//! ```text
//!  DomainConfig ──► normalize ──► validate ──┐
//!                                            │  per DNS provider, in name order
//!                    ┌───────────────────────┘
//!                    ▼
//!  capability gate ──► audit ──► read observed ──► normalize + filter
//!                                                      │
//!                                                      ▼
//!                            provider computes corrections (diff)
//!                                                      │
//!  registrar corrections ─────────────────────────────►│
//!                                                      ▼
//!                               execute in order (push) / print (preview)
//! ```
//!
//! ## Failure handling
//!
//! Every provider of a zone is planned before anything executes. A planning
//! error (capability violation, audit rejection, read-back failure) marks
//! the zone failed and nothing of it is executed. During execution the
//! first failing correction aborts the rest of its zone; other zones
//! proceed.
//!
//! ## Concurrency
//!
//! Zones run one at a time unless [`ConcurrencyMode::Concurrent`] is
//! configured, in which case zones whose providers all declare `CanConcur`
//! run in parallel (bounded by `max_parallel_zones`). Corrections within a
//! zone are always serialized.

pub mod notify;
pub mod report;

pub use notify::{LogNotifier, Notifier};
pub use report::{ProviderReport, RunMode, RunReport, ZoneReport};

use crate::capabilities::{Capability, ProviderCapabilities};
use crate::config::{ConcurrencyMode, Credentials, EngineConfig, ProviderInstanceConfig, ZoneConfigFile};
use crate::correction::Correction;
use crate::error::{Error, Result};
use crate::models::{DomainConfig, HostnameDot, Nameserver, RecordConfig, RecordData, RecordType};
use crate::normalize::{self, IgnoreMatcher};
use crate::registry::ProviderRegistry;
use crate::traits::{DnsServiceProvider, Registrar};
use chrono::Utc;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Metadata key overriding the TTL of synthesized apex NS records
pub const NS_TTL_META: &str = "ns_ttl";

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Run started
    Started { zones: usize, mode: RunMode },

    /// Corrections computed for one (zone, provider) pair
    CorrectionsComputed {
        zone: String,
        provider: String,
        corrections: usize,
        changes: usize,
    },

    /// A correction was executed
    CorrectionApplied {
        zone: String,
        provider: String,
        msg: String,
    },

    /// A correction outlived the correction deadline; it keeps running
    CorrectionOverdue {
        zone: String,
        provider: String,
        msg: String,
    },

    /// A correction failed; the rest of the zone is skipped
    CorrectionFailed {
        zone: String,
        provider: String,
        msg: String,
        error: String,
    },

    /// A zone failed before or during execution
    ZoneFailed { zone: String, error: String },

    /// A zone finished without error
    ZoneFinished { zone: String, changes: usize },

    /// Run finished
    Stopped { reason: String },
}

/// Per-run switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Never create missing zones
    pub no_populate: bool,
    /// Send a per-zone summary to the notifier after a push
    pub notify: bool,
}

/// A configured DNS provider instance
#[derive(Clone)]
pub struct BoundProvider {
    pub name: String,
    pub type_name: String,
    pub provider: Arc<dyn DnsServiceProvider>,
}

/// A configured registrar instance
#[derive(Clone)]
pub struct BoundRegistrar {
    pub name: String,
    pub type_name: String,
    pub registrar: Arc<dyn Registrar>,
}

/// The provider and registrar instances of a run, keyed by instance name
#[derive(Clone, Default)]
pub struct ProviderSet {
    dns: BTreeMap<String, BoundProvider>,
    registrars: BTreeMap<String, BoundRegistrar>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every declared instance
    ///
    /// `only` restricts DNS providers to the named instances; zones bound to
    /// other providers skip them.
    pub fn from_config(
        registry: &ProviderRegistry,
        file: &ZoneConfigFile,
        creds: &Credentials,
        engine: &EngineConfig,
        only: Option<&[String]>,
    ) -> Result<Self> {
        let mut set = Self::new();
        for decl in &file.dns_providers {
            if only.is_some_and(|names| !names.iter().any(|n| n == &decl.name)) {
                debug!(provider = %decl.name, "provider not selected");
                continue;
            }
            let config = ProviderInstanceConfig::resolve(decl, creds, engine)?;
            let provider = registry.create_dns_provider(&config)?;
            set.add_dns_provider(config.name, config.type_name, Arc::from(provider));
        }
        for decl in &file.registrars {
            let config = ProviderInstanceConfig::resolve(decl, creds, engine)?;
            let registrar = registry.create_registrar(&config)?;
            set.add_registrar(config.name, config.type_name, Arc::from(registrar));
        }
        Ok(set)
    }

    pub fn add_dns_provider(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        provider: Arc<dyn DnsServiceProvider>,
    ) {
        let name = name.into();
        self.dns.insert(
            name.clone(),
            BoundProvider {
                name,
                type_name: type_name.into(),
                provider,
            },
        );
    }

    pub fn add_registrar(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        registrar: Arc<dyn Registrar>,
    ) {
        let name = name.into();
        self.registrars.insert(
            name.clone(),
            BoundRegistrar {
                name,
                type_name: type_name.into(),
                registrar,
            },
        );
    }

    pub fn dns_provider(&self, name: &str) -> Option<&BoundProvider> {
        self.dns.get(name)
    }

    pub fn registrar(&self, name: &str) -> Option<&BoundRegistrar> {
        self.registrars.get(name)
    }

    pub fn dns_provider_names(&self) -> impl Iterator<Item = &str> {
        self.dns.keys().map(String::as_str)
    }
}

/// Normalize and validate a zone's desired state in place
///
/// This is everything that can be checked without a provider; `check` and
/// `print-ir` stop here.
pub fn prepare_domain(dc: &mut DomainConfig, default_ttl: u32) -> Result<IgnoreMatcher> {
    dc.name = dc.name.to_ascii_lowercase();
    normalize::normalize_records(&mut dc.records, &dc.name, default_ttl)?;
    normalize::normalize_records(&mut dc.ensure_absent, &dc.name, default_ttl)?;
    let ignore = IgnoreMatcher::compile(dc)?;
    normalize::check_records(dc, &ignore)?;
    Ok(ignore)
}

/// Add apex NS records for the zone's nameservers, unless some are declared
fn synthesize_apex_ns(dc: &mut DomainConfig, default_ttl: u32) -> Result<()> {
    let declared = dc
        .records
        .iter()
        .any(|rc| rc.rtype() == RecordType::Ns && rc.is_apex());
    if declared || dc.nameservers.is_empty() {
        return Ok(());
    }
    let ttl = match dc.metadata.get(NS_TTL_META) {
        Some(raw) => raw.parse::<u32>().map_err(|e| {
            Error::config(format!("domain {}: {NS_TTL_META}={raw:?}: {e}", dc.name))
        })?,
        None => default_ttl,
    };
    let mut synthesized = Vec::with_capacity(dc.nameservers.len());
    for ns in &dc.nameservers {
        let target = HostnameDot::absolute(&format!("{}.", ns.name))?;
        synthesized.push(RecordConfig::new("@", &dc.name, ttl, RecordData::Ns { target })?);
    }
    debug!(zone = %dc.name, count = synthesized.len(), "synthesized apex NS records");
    dc.records.extend(synthesized);
    Ok(())
}

struct Plan {
    report: ProviderReport,
    corrections: Vec<Correction>,
}

impl Plan {
    fn failed(domain: &str, provider: &str, err: &Error) -> Self {
        let mut report = ProviderReport::new(domain, provider);
        report.error = Some(err.to_string());
        Self {
            report,
            corrections: Vec::new(),
        }
    }

    fn ready(domain: &str, provider: &str, corrections: Vec<Correction>, changes: usize) -> Self {
        let mut report = ProviderReport::new(domain, provider);
        report.corrections = corrections.iter().map(|c| c.msg.clone()).collect();
        report.changes = changes;
        Self {
            report,
            corrections,
        }
    }
}

/// The correction pipeline
///
/// ## Lifecycle
///
/// 1. Create with [`Engine::new()`], which also returns the event receiver
/// 2. Call [`Engine::run()`] once per preview or push
/// 3. Cancel through [`Engine::cancellation_token()`]; remaining corrections
///    are skipped at the next safe point
pub struct Engine {
    registry: Arc<ProviderRegistry>,
    providers: ProviderSet,
    config: EngineConfig,
    notifier: Box<dyn Notifier>,
    /// Zone listings per provider instance, for the life of the engine
    zone_cache: Arc<Mutex<HashMap<String, Vec<String>>>>,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Engine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        registry: Arc<ProviderRegistry>,
        providers: ProviderSet,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let engine = Self {
            registry,
            providers,
            config,
            notifier: Box::new(LogNotifier),
            zone_cache: Arc::new(Mutex::new(HashMap::new())),
            cancel: CancellationToken::new(),
            event_tx: tx,
        };
        Ok((engine, rx))
    }

    /// Replace the notifier used with [`RunOptions::notify`]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Token cancelling the current and future runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Preview or push every zone in `domains`
    ///
    /// Zone failures are recorded in the report, never returned as `Err`.
    pub async fn run(&self, domains: Vec<DomainConfig>, mode: RunMode, opts: RunOptions) -> RunReport {
        let started_at = Utc::now();
        self.emit_event(EngineEvent::Started {
            zones: domains.len(),
            mode,
        });
        info!(zones = domains.len(), %mode, "run started");

        let mut results: Vec<(usize, ZoneReport)> = Vec::with_capacity(domains.len());
        let (parallel, serial): (Vec<_>, Vec<_>) = domains
            .into_iter()
            .enumerate()
            .partition(|(_, dc)| {
                self.config.concurrency == ConcurrencyMode::Concurrent && self.zone_can_concur(dc)
            });

        if !parallel.is_empty() {
            debug!(zones = parallel.len(), "running zones concurrently");
            let done: Vec<(usize, ZoneReport)> = futures::stream::iter(parallel)
                .map(|(i, dc)| async move { (i, self.process_zone(dc, mode, opts).await) })
                .buffer_unordered(self.config.max_parallel_zones)
                .collect()
                .await;
            results.extend(done);
        }
        for (i, dc) in serial {
            results.push((i, self.process_zone(dc, mode, opts).await));
        }
        results.sort_by_key(|(i, _)| *i);

        let zones: Vec<ZoneReport> = results.into_iter().map(|(_, z)| z).collect();
        if mode == RunMode::Push && opts.notify {
            for zone in &zones {
                self.notifier.notify(zone).await;
            }
        }

        let report = RunReport {
            mode,
            started_at,
            finished_at: Utc::now(),
            zones,
        };
        let reason = if self.cancel.is_cancelled() {
            "cancelled"
        } else {
            "completed"
        };
        info!(
            changes = report.total_changes(),
            failed = report.any_failed(),
            "run {reason}"
        );
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
        report
    }

    /// Read the records of `zones` from one provider instance, normalized
    ///
    /// The single zone `"all"` expands to every zone the provider lists.
    pub async fn get_zones(
        &self,
        provider_name: &str,
        zones: &[String],
    ) -> Result<Vec<(String, Vec<RecordConfig>)>> {
        let bound = self.providers.dns_provider(provider_name).ok_or_else(|| {
            Error::config(format!("unknown DNS provider instance {provider_name}"))
        })?;
        let names = if zones.len() == 1 && zones[0] == "all" {
            let mut listed = self
                .guarded("list zones", bound.provider.list_zones())
                .await?;
            listed.sort();
            listed
        } else {
            zones.iter().map(|z| z.to_ascii_lowercase()).collect()
        };

        let mut out = Vec::with_capacity(names.len());
        for zone in names {
            let mut records = self
                .guarded(&zone, bound.provider.get_zone_records(&zone, &BTreeMap::new()))
                .await?;
            normalize::normalize_records(&mut records, &zone, self.config.default_ttl)?;
            records.sort_by_cached_key(|rc| (rc.key(), rc.comparable(&[])));
            out.push((zone, records));
        }
        Ok(out)
    }

    /// Create every zone on every bound provider that can create zones
    ///
    /// Returns one line per zone/provider pair acted upon.
    pub async fn create_domains(&self, domains: &[DomainConfig]) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for dc in domains {
            for pname in dc.dns_providers.keys() {
                let Some(bound) = self.providers.dns_provider(pname) else {
                    continue;
                };
                if !self
                    .registry
                    .provider_has_capability(&bound.type_name, Capability::DocCreateDomains)
                {
                    debug!(zone = %dc.name, provider = %pname, "provider cannot create zones");
                    continue;
                }
                self.guarded(
                    &dc.name,
                    bound.provider.ensure_zone_exists(&dc.name, &dc.metadata),
                )
                .await?;
                info!(zone = %dc.name, provider = %pname, "zone exists");
                lines.push(format!("Ensured zone {} exists in {pname}", dc.name));
            }
        }
        Ok(lines)
    }

    fn zone_can_concur(&self, dc: &DomainConfig) -> bool {
        dc.dns_providers.keys().all(|name| {
            self.providers.dns_provider(name).is_some_and(|b| {
                self.registry
                    .provider_has_capability(&b.type_name, Capability::CanConcur)
            })
        })
    }

    async fn process_zone(&self, dc: DomainConfig, mode: RunMode, opts: RunOptions) -> ZoneReport {
        let domain = dc.name.clone();
        let mut report = ZoneReport::new(&domain);

        let plans = match self.plan_zone(dc, opts).await {
            Ok(plans) => plans,
            Err(e) => {
                error!(zone = %domain, "zone failed: {e}");
                report.error = Some(e.to_string());
                self.emit_event(EngineEvent::ZoneFailed {
                    zone: domain,
                    error: e.to_string(),
                });
                return report;
            }
        };

        if let Some(failed) = plans.iter().find(|p| p.report.failed()) {
            let msg = format!(
                "{}: {}",
                failed.report.provider,
                failed.report.error.as_deref().unwrap_or_default()
            );
            error!(zone = %domain, "zone not applied: {msg}");
            report.error = Some(msg.clone());
            report.providers = plans.into_iter().map(|p| p.report).collect();
            self.emit_event(EngineEvent::ZoneFailed {
                zone: domain,
                error: msg,
            });
            return report;
        }

        let mut aborted = false;
        for plan in plans {
            let Plan {
                report: mut preport,
                corrections,
            } = plan;
            if mode == RunMode::Push && !aborted {
                if let Err(e) = self.execute(&domain, &preport.provider, corrections).await {
                    preport.error = Some(e.to_string());
                    report.error = Some(format!("{}: {e}", preport.provider));
                    aborted = true;
                }
            }
            report.providers.push(preport);
        }

        match &report.error {
            Some(error) => self.emit_event(EngineEvent::ZoneFailed {
                zone: domain,
                error: error.clone(),
            }),
            None => self.emit_event(EngineEvent::ZoneFinished {
                zone: domain,
                changes: report.changes(),
            }),
        }
        report
    }

    /// Compute the corrections of every provider and the registrar
    ///
    /// Zone-level failures are `Err`; provider-level failures are recorded
    /// in the returned plans.
    async fn plan_zone(&self, mut dc: DomainConfig, opts: RunOptions) -> Result<Vec<Plan>> {
        let ignore = prepare_domain(&mut dc, self.config.default_ttl)?;
        self.gather_nameservers(&mut dc).await?;

        let mut plans = Vec::new();
        for pname in dc.dns_providers.keys() {
            let Some(bound) = self.providers.dns_provider(pname) else {
                debug!(zone = %dc.name, provider = %pname, "provider not selected, skipping");
                continue;
            };
            let plan = match self.plan_provider(&dc, bound, &ignore, opts).await {
                Ok((corrections, changes)) => {
                    self.emit_event(EngineEvent::CorrectionsComputed {
                        zone: dc.name.clone(),
                        provider: pname.clone(),
                        corrections: corrections.len(),
                        changes,
                    });
                    Plan::ready(&dc.name, pname, corrections, changes)
                }
                Err(e) => {
                    warn!(zone = %dc.name, provider = %pname, "{e}");
                    Plan::failed(&dc.name, pname, &e)
                }
            };
            let failed = plan.report.failed();
            plans.push(plan);
            if failed {
                return Ok(plans);
            }
        }

        if let Some(rname) = &dc.registrar {
            if let Some(bound) = self.providers.registrar(rname) {
                let plan = match self
                    .guarded(&dc.name, bound.registrar.get_registrar_corrections(&dc))
                    .await
                {
                    Ok(corrections) => {
                        let changes = corrections.iter().filter(|c| !c.is_report()).count();
                        Plan::ready(&dc.name, rname, corrections, changes)
                    }
                    Err(e) => {
                        warn!(zone = %dc.name, registrar = %rname, "{e}");
                        Plan::failed(&dc.name, rname, &e)
                    }
                };
                plans.push(plan);
            }
        }
        Ok(plans)
    }

    /// Append provider-assigned nameservers to `dc.nameservers`
    async fn gather_nameservers(&self, dc: &mut DomainConfig) -> Result<()> {
        let wanted: Vec<(String, i32)> = dc
            .dns_providers
            .iter()
            .filter(|(_, n)| **n != 0)
            .map(|(p, n)| (p.clone(), *n))
            .collect();
        for (pname, count) in wanted {
            let Some(bound) = self.providers.dns_provider(&pname) else {
                continue;
            };
            let found = self
                .guarded(&dc.name, bound.provider.get_nameservers(&dc.name))
                .await
                .map_err(|e| Error::provider(&pname, format!("nameservers of {}: {e}", dc.name)))?;
            let take = if count < 0 { found.len() } else { count as usize };
            for ns in found.into_iter().take(take) {
                dc.add_nameserver(Nameserver::new(ns.name.trim_end_matches('.')));
            }
        }
        debug!(zone = %dc.name, nameservers = dc.nameservers.len(), "gathered nameservers");
        Ok(())
    }

    async fn plan_provider(
        &self,
        dc: &DomainConfig,
        bound: &BoundProvider,
        ignore: &IgnoreMatcher,
        opts: RunOptions,
    ) -> Result<(Vec<Correction>, usize)> {
        let pname = bound.name.as_str();
        let provider = &bound.provider;
        let caps: &ProviderCapabilities = self.registry.capabilities(&bound.type_name).ok_or_else(|| {
            Error::config(format!("{pname}: unknown DNS provider type {}", bound.type_name))
        })?;
        let dual_host = caps.has(Capability::DocDualHost);

        let mut corrections = Vec::new();
        let mut extra_changes = 0;
        let mut zone_missing = false;
        if !opts.no_populate
            && caps.has(Capability::CanGetZones)
            && caps.has(Capability::DocCreateDomains)
            && !self.zone_listed(bound, &dc.name).await?
        {
            zone_missing = true;
            let p = Arc::clone(provider);
            let cache = Arc::clone(&self.zone_cache);
            let instance = bound.name.clone();
            let zone = dc.name.clone();
            let meta = dc.metadata.clone();
            corrections.push(Correction::new(
                format!("Ensuring zone {} exists in {pname}", dc.name),
                async move {
                    p.ensure_zone_exists(&zone, &meta).await?;
                    cache.lock().await.entry(instance).or_default().push(zone);
                    Ok(())
                },
            ));
            extra_changes += 1;
        }

        let mut pdc = dc.clone();
        if dual_host {
            synthesize_apex_ns(&mut pdc, self.config.default_ttl)?;
        } else {
            pdc.records = normalize::remove_apex_ns(pdc.records);
        }
        let manage_apex_ns = pdc
            .records
            .iter()
            .any(|rc| rc.rtype() == RecordType::Ns && rc.is_apex());

        normalize::check_capabilities(&pdc, pname, caps)?;
        provider.post_process_records(&mut pdc.records);

        let violations = provider.auditor().audit(&pdc.records);
        if !violations.is_empty() {
            return Err(Error::AuditRejected {
                zone: dc.name.clone(),
                provider: pname.to_string(),
                violations,
            });
        }

        let mut observed = if zone_missing {
            Vec::new()
        } else {
            self.guarded(&dc.name, provider.get_zone_records(&dc.name, &dc.metadata))
                .await?
        };
        normalize::normalize_records(&mut observed, &dc.name, self.config.default_ttl)?;
        let mut observed = ignore.filter(observed);
        if !manage_apex_ns {
            observed = normalize::remove_apex_ns(observed);
        }
        provider.post_process_records(&mut observed);
        debug!(
            zone = %dc.name,
            provider = %pname,
            desired = pdc.records.len(),
            observed = observed.len(),
            "computing corrections"
        );

        let (mut computed, changes) = self
            .guarded(&dc.name, provider.get_zone_records_corrections(&pdc, observed))
            .await?;
        corrections.append(&mut computed);
        Ok((corrections, changes + extra_changes))
    }

    /// Whether `zone` is in the provider's cached zone listing
    ///
    /// The cache lock is not held while listing, so a slow provider never
    /// stalls zones bound to other providers.
    async fn zone_listed(&self, bound: &BoundProvider, zone: &str) -> Result<bool> {
        if let Some(zones) = self.zone_cache.lock().await.get(&bound.name) {
            return Ok(zones.iter().any(|z| z == zone));
        }
        let listed: Vec<String> = self
            .guarded(zone, bound.provider.list_zones())
            .await?
            .into_iter()
            .map(|z| z.trim_end_matches('.').to_ascii_lowercase())
            .collect();
        let mut cache = self.zone_cache.lock().await;
        // a concurrent listing may have landed first; keep it, it may hold created zones
        let zones = cache.entry(bound.name.clone()).or_insert(listed);
        Ok(zones.iter().any(|z| z == zone))
    }

    /// Run corrections in order; stop at the first failure
    async fn execute(&self, zone: &str, provider: &str, corrections: Vec<Correction>) -> Result<()> {
        let deadline = self.config.correction_timeout();
        for correction in corrections {
            if correction.is_report() {
                continue;
            }
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled(format!(
                    "{zone}: remaining corrections for {provider} skipped"
                )));
            }
            let msg = correction.msg.clone();
            info!(zone = %zone, provider = %provider, "{msg}");
            // a correction is never abandoned mid-flight; past the deadline it is only reported
            let mut task = tokio::spawn(correction.execute());
            let joined = match tokio::time::timeout(deadline, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        zone = %zone,
                        provider = %provider,
                        "correction still running after {}s, waiting for it to finish",
                        deadline.as_secs()
                    );
                    self.emit_event(EngineEvent::CorrectionOverdue {
                        zone: zone.to_string(),
                        provider: provider.to_string(),
                        msg: msg.clone(),
                    });
                    task.await
                }
            };
            let outcome = joined.unwrap_or_else(|e| {
                Err(Error::Other(format!("{zone}: correction task failed: {e}")))
            });
            match outcome {
                Ok(()) => self.emit_event(EngineEvent::CorrectionApplied {
                    zone: zone.to_string(),
                    provider: provider.to_string(),
                    msg,
                }),
                Err(e) => {
                    error!(zone = %zone, provider = %provider, "correction failed: {e}");
                    self.emit_event(EngineEvent::CorrectionFailed {
                        zone: zone.to_string(),
                        provider: provider.to_string(),
                        msg,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Await an adapter call unless the run is cancelled first
    async fn guarded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled(what.to_string())),
            result = fut => result,
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // a full channel drops the event rather than blocking the run
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_clone() {
        let event = EngineEvent::ZoneFinished {
            zone: "example.com".to_string(),
            changes: 2,
        };
        assert_eq!(event.clone(), event);
    }

    #[test]
    fn apex_ns_synthesis_respects_declared_records() {
        let mut dc = DomainConfig::new("example.com");
        dc.nameservers = Nameserver::from_names(&["ns1.host.net", "ns2.host.net"]);
        dc.metadata.insert(NS_TTL_META.into(), "86400".into());
        synthesize_apex_ns(&mut dc, 300).unwrap();
        assert_eq!(dc.records.len(), 2);
        assert!(dc.records.iter().all(|rc| rc.is_apex() && rc.ttl == 86400));
        assert_eq!(dc.records[0].target(), "ns1.host.net.");

        // second call sees the declared records and adds nothing
        synthesize_apex_ns(&mut dc, 300).unwrap();
        assert_eq!(dc.records.len(), 2);
    }

    #[test]
    fn bad_ns_ttl_is_a_config_error() {
        let mut dc = DomainConfig::new("example.com");
        dc.nameservers = Nameserver::from_names(&["ns1.host.net"]);
        dc.metadata.insert(NS_TTL_META.into(), "soon".into());
        assert!(synthesize_apex_ns(&mut dc, 300).unwrap_err().is_config_error());
    }

    #[test]
    fn prepare_domain_normalizes_then_validates() {
        let mut dc = DomainConfig::new("Example.COM");
        dc.records.push(
            RecordConfig::new("WWW", "example.com", 0, RecordData::A {
                address: "1.2.3.4".parse().unwrap(),
            })
            .unwrap(),
        );
        prepare_domain(&mut dc, 300).unwrap();
        assert_eq!(dc.name, "example.com");
        assert_eq!(dc.records[0].name, "www");
        assert_eq!(dc.records[0].ttl, 300);
    }
}
