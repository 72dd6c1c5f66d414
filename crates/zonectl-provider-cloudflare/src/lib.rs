// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 adapter for zonectl.
//
// ## Behaviour
//
// - Reconciles with the by-record diff: one API call per created, changed
//   or deleted record, addressed by the record ID read back from the zone
// - Lists zones and creates them (creation needs the `accountid` credential)
// - Reports the nameservers Cloudflare assigned to a zone
// - Carries the proxy flag of A/AAAA/CNAME records as `cloudflare_proxy`
//   metadata (`"on"` / `"off"`), which takes part in record equality
// - TTL 1 means "automatic" in both directions; it is kept as is and never
//   equals an explicit TTL, so a zone wanting automatic TTLs declares `ttl: 1`
// - Sleeps and retries on HTTP 429, honouring `Retry-After` up to the HTTP
//   timeout
// - Every HTTP call uses the caller-supplied deadline
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List / Create Zones: GET / POST `/zones`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create / Update / Delete: POST / PUT / DELETE `/zones/:zone_id/dns_records[/:record_id]`

mod api;
mod convert;

pub use api::{CLOUDFLARE_API_BASE, CloudflareApi, DnsRecord, Zone};
pub use convert::{AUTO_TTL, is_proxiable, to_api_record, to_record_config};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use zonectl_core::audit::{Rejection, RecordAuditor, rejectif};
use zonectl_core::capabilities::{Capability, DocumentationNote, DocumentationNotes};
use zonectl_core::correction::CorrectionAction;
use zonectl_core::diff::{Change, ChangeType, Differ};
use zonectl_core::models::{Nameserver, Original};
use zonectl_core::registry::{CredsField, ProviderMetadata};
use zonectl_core::{
    Correction, DnsServiceProvider, DnsServiceProviderFactory, DomainConfig, Error,
    ProviderInstanceConfig, ProviderRegistry, RecordConfig, Result,
};

/// Adapter type name
pub const CLOUDFLARE_TYPE: &str = "CLOUDFLAREAPI";

/// Record metadata key holding the proxy flag
pub const PROXY_META: &str = "cloudflare_proxy";

/// Credential: API token with Zone:DNS:Edit permission
pub const API_TOKEN_FIELD: &str = "apitoken";

/// Credential: account that new zones are created in
pub const ACCOUNT_ID_FIELD: &str = "accountid";

/// Instance setting overriding the API base URL
pub const BASE_URL_META: &str = "base_url";

/// TTL bounds accepted by the API (automatic aside)
const MIN_TTL: u32 = 60;
const MAX_TTL: u32 = 86400;

/// Cloudflare's identifier of a record, kept in [`RecordConfig::original`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CloudflareRecordId(pub String);

/// API client plus the zones looked up so far
///
/// Shared with correction actions, which resolve the zone ID only when they
/// run: the zone may be created by an earlier correction of the same run.
struct Account {
    api: CloudflareApi,
    zones: RwLock<HashMap<String, Zone>>,
}

impl Account {
    async fn zone(&self, domain: &str) -> Result<Option<Zone>> {
        if let Some(zone) = self.zones.read().await.get(domain) {
            return Ok(Some(zone.clone()));
        }
        let found = self.api.zone_by_name(domain).await?;
        if let Some(zone) = &found {
            debug!(zone = %domain, id = %zone.id, "found Cloudflare zone");
            self.remember(zone.clone()).await;
        }
        Ok(found)
    }

    async fn require_zone(&self, domain: &str) -> Result<Zone> {
        self.zone(domain)
            .await?
            .ok_or_else(|| Error::not_found(format!("zone {domain}")))
    }

    async fn remember(&self, zone: Zone) {
        self.zones
            .write()
            .await
            .insert(zone.name.to_ascii_lowercase(), zone);
    }

    /// Execute one change of the by-record diff
    async fn apply(&self, domain: &str, change: &Change) -> Result<()> {
        let zone = self.require_zone(domain).await?;
        match change.change_type {
            ChangeType::Report => {}
            ChangeType::Create => {
                for rc in &change.new {
                    let created = self.api.create_record(&zone.id, &to_api_record(rc)).await?;
                    debug!(zone = %domain, id = %created.id, "created record");
                }
            }
            ChangeType::Delete => {
                for rc in &change.old {
                    self.api.delete_record(&zone.id, &record_id(rc)?.0).await?;
                }
            }
            ChangeType::Change => {
                for (old, new) in change.old.iter().zip(&change.new) {
                    let id = record_id(old)?;
                    self.api.update_record(&zone.id, &id.0, &to_api_record(new)).await?;
                }
            }
        }
        Ok(())
    }
}

fn record_id(rc: &RecordConfig) -> Result<CloudflareRecordId> {
    rc.original
        .as_ref()
        .and_then(|o| o.downcast_ref::<CloudflareRecordId>())
        .cloned()
        .ok_or_else(|| Error::provider(CLOUDFLARE_TYPE, format!("{rc}: record has no Cloudflare ID")))
}

/// Cloudflare DNS provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Instance name, used in error messages
    name: String,
    account: Arc<Account>,
    account_id: Option<String>,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("name", &self.name)
            .field("api", &self.account.api)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `name`: instance name from the configuration
    /// - `api_token`: token with Zone:DNS:Edit permissions
    /// - `account_id`: account for zone creation, if zones are to be created
    /// - `timeout`: deadline of every HTTP call
    pub fn new(
        name: impl Into<String>,
        api_token: impl Into<String>,
        account_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config(format!("{name}: Cloudflare API token cannot be empty")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            name,
            account: Arc::new(Account {
                api: CloudflareApi::new(client, CLOUDFLARE_API_BASE, api_token)
                    .with_max_retry_wait(timeout),
                zones: RwLock::new(HashMap::new()),
            }),
            account_id: account_id.filter(|id| !id.is_empty()),
        })
    }

    /// Point the provider at another API endpoint (tests, API gateways)
    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        let rebased = self.account.api.rebased(base_url);
        Self {
            account: Arc::new(Account {
                api: rebased,
                zones: RwLock::new(HashMap::new()),
            }),
            ..self
        }
    }

    fn read_back_error(&self, zone: &str, raw: &DnsRecord, err: Error) -> Error {
        Error::ReadBack {
            zone: zone.to_string(),
            provider: self.name.clone(),
            record: format!("{} {} {}", raw.rtype, raw.name, raw.content),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl DnsServiceProvider for CloudflareProvider {
    fn provider_name(&self) -> &str {
        CLOUDFLARE_TYPE
    }

    async fn get_nameservers(&self, domain: &str) -> Result<Vec<Nameserver>> {
        match self.account.zone(domain).await? {
            Some(zone) => Ok(Nameserver::from_names(zone.name_servers.as_slice())),
            None => {
                debug!(zone = %domain, "zone not in account yet, no nameservers");
                Ok(Vec::new())
            }
        }
    }

    async fn get_zone_records(
        &self,
        domain: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<RecordConfig>> {
        let zone = self.account.require_zone(domain).await?;
        let raw = self.account.api.list_records(&zone.id).await?;
        debug!(zone = %domain, records = raw.len(), "read Cloudflare records");
        raw.iter()
            .map(|r| {
                to_record_config(r, domain)
                    .map(|rc| rc.with_original(Original::new(CloudflareRecordId(r.id.clone()))))
                    .map_err(|e| self.read_back_error(domain, r, e))
            })
            .collect()
    }

    async fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        observed: Vec<RecordConfig>,
    ) -> Result<(Vec<Correction>, usize)> {
        let changes = Differ::new(dc, self.comparable_meta_keys()).by_record(&observed);
        let count = changes.actual_change_count();
        debug!(zone = %dc.name, changes = count, "Cloudflare corrections");
        let corrections = changes.into_corrections(|change| -> CorrectionAction {
            let account = Arc::clone(&self.account);
            let zone = dc.name.clone();
            let change = change.clone();
            Box::pin(async move { account.apply(&zone, &change).await })
        });
        Ok((corrections, count))
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        let zones = self.account.api.list_zones().await?;
        let mut names: Vec<String> = zones.iter().map(|z| z.name.to_ascii_lowercase()).collect();
        for zone in zones {
            self.account.remember(zone).await;
        }
        names.sort();
        Ok(names)
    }

    async fn ensure_zone_exists(&self, domain: &str, _meta: &BTreeMap<String, String>) -> Result<()> {
        if self.account.zone(domain).await?.is_some() {
            return Ok(());
        }
        let account_id = self.account_id.as_deref().ok_or_else(|| {
            Error::config(format!(
                "{}: creating zone {domain} requires the {ACCOUNT_ID_FIELD} credential",
                self.name
            ))
        })?;
        info!(zone = %domain, "creating Cloudflare zone");
        let zone = self.account.api.create_zone(domain, account_id).await?;
        self.account.remember(zone).await;
        Ok(())
    }

    fn post_process_records(&self, records: &mut Vec<RecordConfig>) {
        for rc in records.iter_mut() {
            if is_proxiable(rc.rtype()) {
                rc.metadata
                    .entry(PROXY_META.to_string())
                    .or_insert_with(|| "off".to_string());
            } else {
                rc.metadata.remove(PROXY_META);
            }
            if rc.ttl != AUTO_TTL {
                rc.ttl = rc.ttl.clamp(MIN_TTL, MAX_TTL);
            }
        }
    }

    fn auditor(&self) -> RecordAuditor {
        let mut auditor = RecordAuditor::new();
        auditor
            .add("TXT", rejectif::txt_is_empty)
            .add("MX", rejectif::mx_null)
            .add("SRV", rejectif::srv_has_null_target);
        for rtype in ["A", "AAAA", "CNAME"] {
            auditor.add(rtype, proxy_flag_is_on_or_off);
        }
        auditor
    }

    fn comparable_meta_keys(&self) -> Vec<String> {
        vec![PROXY_META.to_string()]
    }
}

fn proxy_flag_is_on_or_off(rc: &RecordConfig) -> std::result::Result<(), Rejection> {
    match rc.metadata.get(PROXY_META).map(String::as_str) {
        None | Some("on") | Some("off") => Ok(()),
        Some(other) => Err(Rejection::new(format!(
            "{PROXY_META} must be \"on\" or \"off\", got {other:?}"
        ))),
    }
}

/// Factory for creating Cloudflare providers from configuration
pub struct CloudflareFactory;

impl DnsServiceProviderFactory for CloudflareFactory {
    fn metadata(&self) -> ProviderMetadata {
        let mut features = DocumentationNotes::new();
        features.insert(Capability::CanConcur, DocumentationNote::can());
        features.insert(
            Capability::CanAutoDnssec,
            DocumentationNote::unimplemented("DNSSEC is managed in the Cloudflare dashboard"),
        );
        features.insert(
            Capability::DocDualHost,
            DocumentationNote::cannot("Cloudflare does not allow apex NS records to be changed"),
        );
        ProviderMetadata {
            type_name: CLOUDFLARE_TYPE.to_string(),
            maintainer: "zonectl".to_string(),
            record_types: ["A", "AAAA", "CNAME", "MX", "NS", "PTR", "TXT", "SRV", "CAA"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            features,
            lists_zones: true,
            creates_zones: true,
            creds_schema: vec![
                CredsField::secret(API_TOKEN_FIELD),
                CredsField::optional(ACCOUNT_ID_FIELD),
            ],
        }
    }

    fn create(&self, config: &ProviderInstanceConfig) -> Result<Box<dyn DnsServiceProvider>> {
        let api_token = config.require(API_TOKEN_FIELD)?;
        let account_id = config.credential(ACCOUNT_ID_FIELD).map(str::to_string);
        let provider = CloudflareProvider::new(&config.name, api_token, account_id, config.http_timeout)?;
        let provider = match config.meta.get(BASE_URL_META) {
            Some(base_url) => provider.with_base_url(base_url.as_str()),
            None => provider,
        };
        Ok(Box::new(provider))
    }
}

/// Register the Cloudflare provider with the registry
pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    registry.register_dns_provider(Box::new(CloudflareFactory))
}
