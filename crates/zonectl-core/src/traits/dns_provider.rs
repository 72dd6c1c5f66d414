// # DNS Service Provider Trait
//
// Defines the interface a DNS hosting provider adapter implements.
//
// ## Implementations
//
// - Cloudflare: `zonectl-provider-cloudflare` crate
// - In-memory and no-op providers: `zonectl_core::providers`
//
// ## Usage
//
// ```rust,ignore
// use zonectl_core::DnsServiceProvider;
//
// let observed = provider.get_zone_records("example.com", &meta).await?;
// let (corrections, changes) = provider
//     .get_zone_records_corrections(&dc, observed)
//     .await?;
// for c in corrections {
//     println!("{}", c.msg);
// }
// ```

use crate::audit::RecordAuditor;
use crate::config::ProviderInstanceConfig;
use crate::correction::Correction;
use crate::error::{Error, Result};
use crate::models::{DomainConfig, Nameserver, RecordConfig};
use crate::registry::ProviderMetadata;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Trait for DNS service provider implementations
///
/// The engine drives an adapter through a fixed sequence per zone:
/// nameserver discovery, optional zone creation, read of the current
/// records, then computation of corrections from the normalized desired
/// state and the normalized observed records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Adapters declaring `CanConcur`
/// are called for several zones at once and must be safe for that.
///
/// # Responsibilities
///
/// ## Adapter owns
/// - the wire protocol and its authentication
/// - rate-limit sleeps and retries, which the pipeline treats as opaque
/// - picking a supported TTL when the requested one is not offered
/// - honouring the caller-supplied HTTP deadline
///
/// ## Engine owns
/// - normalization, validation, capability checks and auditing
/// - ignore rules and apex NS filtering
/// - ordering, dry-run and partial-failure handling of corrections
///
/// Adapters never decide whether a zone is in scope, and never execute
/// their own corrections.
#[async_trait]
pub trait DnsServiceProvider: Send + Sync {
    /// Adapter type name (e.g. `"CLOUDFLAREAPI"`), for logging
    fn provider_name(&self) -> &str;

    /// Nameservers the provider assigns to `domain`
    async fn get_nameservers(&self, domain: &str) -> Result<Vec<Nameserver>>;

    /// All records currently in `domain`, lifted into the model
    ///
    /// Records the adapter cannot parse must surface as [`Error::ReadBack`]
    /// carrying the raw record.
    async fn get_zone_records(
        &self,
        domain: &str,
        meta: &BTreeMap<String, String>,
    ) -> Result<Vec<RecordConfig>>;

    /// Corrections that make the zone match `dc.records`
    ///
    /// Both `dc` and `observed` are already normalized and filtered. Returns
    /// the corrections in execution order plus the number of record-level
    /// changes (reports excluded).
    async fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        observed: Vec<RecordConfig>,
    ) -> Result<(Vec<Correction>, usize)>;

    /// Zones visible to the credentials
    async fn list_zones(&self) -> Result<Vec<String>> {
        Err(Error::unsupported(format!(
            "{} cannot list zones",
            self.provider_name()
        )))
    }

    /// Create `domain` if it does not exist
    async fn ensure_zone_exists(&self, domain: &str, _meta: &BTreeMap<String, String>) -> Result<()> {
        Err(Error::unsupported(format!(
            "{} cannot create zone {domain}",
            self.provider_name()
        )))
    }

    /// Provider-required munging of desired and observed records
    fn post_process_records(&self, _records: &mut Vec<RecordConfig>) {}

    /// Predicates rejecting records the provider would silently corrupt
    fn auditor(&self) -> RecordAuditor {
        RecordAuditor::new()
    }

    /// Metadata keys that take part in record equality
    fn comparable_meta_keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Helper trait for constructing DNS service providers from configuration
pub trait DnsServiceProviderFactory: Send + Sync {
    /// Registration record: type name, record types, features, credentials
    fn metadata(&self) -> ProviderMetadata;

    /// Create an instance from its configuration
    ///
    /// Credential presence is checked by the registry against
    /// [`ProviderMetadata::creds_schema`] before this is called.
    fn create(&self, config: &ProviderInstanceConfig) -> Result<Box<dyn DnsServiceProvider>>;
}
