//! Configuration types for zonectl
//!
//! Three inputs configure a run:
//! - the zone configuration JSON emitted by the front-end ([`ZoneConfigFile`])
//! - the credentials file, keyed by provider instance name ([`Credentials`])
//! - engine settings ([`EngineConfig`])

use crate::error::{Error, Result};
use crate::models::raw::value_to_string;
use crate::models::{
    AutoDnssec, DomainConfig, IgnoreName, IgnoreTarget, LegacyRecord, Nameserver,
    RawRecordConfig,
};
use crate::registry::types::TypeRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Credentials key naming the adapter type of an instance
pub const CREDS_TYPE_KEY: &str = "TYPE";

/// The zone configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneConfigFile {
    /// Registrar instances
    #[serde(default)]
    pub registrars: Vec<ProviderDecl>,

    /// DNS provider instances
    #[serde(default)]
    pub dns_providers: Vec<ProviderDecl>,

    /// Zones
    #[serde(default)]
    pub domains: Vec<DomainConfigJson>,
}

/// A declared provider or registrar instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDecl {
    /// Instance name, the key into the credentials file
    pub name: String,

    /// Adapter type; empty or `"-"` defers to the credentials' `TYPE`
    #[serde(rename = "type", default)]
    pub type_name: String,

    /// Adapter-specific settings
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

/// A zone as emitted by the front-end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfigJson {
    pub name: String,

    /// Registrar instance name
    #[serde(default)]
    pub registrar: String,

    /// DNS provider instance name → nameserver count (-1 = all)
    #[serde(rename = "dnsProviders", alias = "dns_providers", default)]
    pub dns_providers: BTreeMap<String, i32>,

    #[serde(default)]
    pub meta: BTreeMap<String, Value>,

    /// Pre-typed records in the legacy flat form
    #[serde(default)]
    pub records: Vec<LegacyRecord>,

    /// Records in positional form
    #[serde(default)]
    pub rawrecords: Vec<RawRecordConfig>,

    #[serde(default)]
    pub nameservers: Vec<NameserverJson>,

    #[serde(default)]
    pub keepunknown: bool,

    #[serde(default)]
    pub ignored_names: Vec<IgnoreName>,

    #[serde(default)]
    pub ignored_targets: Vec<IgnoreTarget>,

    #[serde(default)]
    pub auto_dnssec: AutoDnssec,
}

/// A nameserver given either as a bare string or as `{ "name": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameserverJson {
    Bare(String),
    Named { name: String },
}

impl NameserverJson {
    fn name(&self) -> &str {
        match self {
            NameserverJson::Bare(name) | NameserverJson::Named { name } => name,
        }
    }
}

impl ZoneConfigFile {
    /// Parse a configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("malformed configuration: {e}")))
    }

    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Validate the configuration
    ///
    /// Checks unique zone and instance names, resolvable provider
    /// references and nameserver syntax.
    pub fn validate(&self) -> Result<()> {
        let mut instances = BTreeSet::new();
        for decl in self.registrars.iter().chain(&self.dns_providers) {
            if decl.name.is_empty() {
                return Err(Error::config("provider declared without a name"));
            }
        }
        for decl in &self.dns_providers {
            if !instances.insert(decl.name.as_str()) {
                return Err(Error::config(format!(
                    "DNS provider {} declared twice",
                    decl.name
                )));
            }
        }
        let registrars: BTreeSet<&str> = self.registrars.iter().map(|r| r.name.as_str()).collect();
        if registrars.len() != self.registrars.len() {
            return Err(Error::config("registrar declared twice"));
        }

        let mut zones = BTreeSet::new();
        for domain in &self.domains {
            if domain.name.is_empty() {
                return Err(Error::config("domain without a name"));
            }
            if domain.name.ends_with('.') {
                return Err(Error::config(format!(
                    "domain {} must not end with a dot",
                    domain.name
                )));
            }
            if !zones.insert(domain.name.to_ascii_lowercase()) {
                return Err(Error::config(format!(
                    "domain {} is declared twice",
                    domain.name
                )));
            }
            if !domain.registrar.is_empty() && !registrars.contains(domain.registrar.as_str()) {
                return Err(Error::config(format!(
                    "domain {} uses undeclared registrar {}",
                    domain.name, domain.registrar
                )));
            }
            for provider in domain.dns_providers.keys() {
                if !instances.contains(provider.as_str()) {
                    return Err(Error::config(format!(
                        "domain {} uses undeclared DNS provider {provider}",
                        domain.name
                    )));
                }
            }
            for (provider, count) in &domain.dns_providers {
                if *count < -1 {
                    return Err(Error::config(format!(
                        "domain {}: nameserver count {count} for {provider} is invalid",
                        domain.name
                    )));
                }
            }
            for ns in &domain.nameservers {
                let name = ns.name();
                if name.is_empty() {
                    return Err(Error::config(format!("domain {}: empty nameserver", domain.name)));
                }
                if name.ends_with('.') {
                    return Err(Error::config(format!(
                        "domain {}: nameserver {name} must not end with a dot",
                        domain.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Convert every domain into its typed desired state
    pub fn to_domain_configs(&self, types: &TypeRegistry) -> Result<Vec<DomainConfig>> {
        self.validate()?;
        self.domains
            .iter()
            .map(|d| d.to_domain_config(types))
            .collect()
    }

    /// The declared adapter type of a DNS provider instance
    pub fn dns_provider_decl(&self, name: &str) -> Option<&ProviderDecl> {
        self.dns_providers.iter().find(|d| d.name == name)
    }

    /// The declared adapter type of a registrar instance
    pub fn registrar_decl(&self, name: &str) -> Option<&ProviderDecl> {
        self.registrars.iter().find(|d| d.name == name)
    }
}

impl DomainConfigJson {
    /// Lift records and settings into a [`DomainConfig`]
    pub fn to_domain_config(&self, types: &TypeRegistry) -> Result<DomainConfig> {
        let origin = self.name.to_ascii_lowercase();
        let mut dc = DomainConfig::new(origin.clone());
        dc.registrar = (!self.registrar.is_empty()).then(|| self.registrar.clone());
        dc.dns_providers = self.dns_providers.clone();
        dc.metadata = stringify(&self.meta);
        dc.keep_unknown = self.keepunknown;
        dc.ignored_names = self.ignored_names.clone();
        dc.ignored_targets = self.ignored_targets.clone();
        dc.auto_dnssec = self.auto_dnssec;
        for ns in &self.nameservers {
            dc.add_nameserver(Nameserver::new(ns.name()));
        }

        let zone_err = |e: Error| match e {
            Error::Parse { input, reason } => Error::config(format!(
                "domain {origin}: {reason} (input: {input:?})"
            )),
            Error::UnknownRecordType(t) => {
                Error::config(format!("domain {origin}: unknown record type {t}"))
            }
            other => other,
        };

        for legacy in &self.records {
            let rc = types.import_from_legacy(legacy, &origin).map_err(zone_err)?;
            dc.records.push(rc);
        }
        for raw in &self.rawrecords {
            let rc = types.populate_from_raw(raw, &origin).map_err(zone_err)?;
            if raw.ensure_absent {
                dc.ensure_absent.push(rc);
            } else {
                dc.records.push(rc);
            }
        }
        debug!(
            domain = %dc.name,
            records = dc.records.len(),
            ensure_absent = dc.ensure_absent.len(),
            "loaded domain"
        );
        Ok(dc)
    }
}

fn stringify(meta: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    meta.iter()
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect()
}

/// Credentials file: instance name → field → value
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl Credentials {
    /// Parse credentials, resolving `$VAR` values from the process environment
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_env(json, |key| std::env::var(key).ok())
    }

    /// Parse credentials with an explicit environment lookup
    pub fn from_json_with_env(json: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("malformed credentials: {e}")))?;
        let mut entries = BTreeMap::new();
        for (instance, fields) in raw {
            let mut resolved = BTreeMap::new();
            for (key, value) in fields {
                let value = match value {
                    Value::String(s) => match s.strip_prefix('$') {
                        Some(var) if !var.is_empty() => env(var).ok_or_else(|| {
                            Error::config(format!(
                                "credentials for {instance}: environment variable {var} is not set"
                            ))
                        })?,
                        _ => s,
                    },
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(Error::config(format!(
                            "credentials for {instance}: field {key} must be a string or boolean, got {other}"
                        )));
                    }
                };
                resolved.insert(key, value);
            }
            entries.insert(instance, resolved);
        }
        Ok(Self { entries })
    }

    /// Read and parse a credentials file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Fields for one instance (empty if absent)
    pub fn for_instance(&self, name: &str) -> BTreeMap<String, String> {
        self.entries.get(name).cloned().unwrap_or_default()
    }

    /// Instance names present in the file
    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values are secrets
        let keys: BTreeMap<&str, Vec<&str>> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.keys().map(String::as_str).collect()))
            .collect();
        f.debug_struct("Credentials").field("fields", &keys).finish()
    }
}

/// Everything an adapter factory needs to build one instance
#[derive(Clone)]
pub struct ProviderInstanceConfig {
    /// Instance name
    pub name: String,
    /// Adapter type
    pub type_name: String,
    /// Credential fields
    pub credentials: BTreeMap<String, String>,
    /// Adapter settings from the zone configuration
    pub meta: BTreeMap<String, String>,
    /// Deadline for every adapter HTTP call
    pub http_timeout: Duration,
}

impl ProviderInstanceConfig {
    /// Create an instance config with no credentials
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            credentials: BTreeMap::new(),
            meta: BTreeMap::new(),
            http_timeout: Duration::from_secs(default_http_timeout_secs()),
        }
    }

    /// Combine a declaration with its credentials
    ///
    /// The adapter type comes from the declaration, or from the credentials'
    /// `TYPE` when the declaration leaves it empty or `"-"`. When both are
    /// given they must agree.
    pub fn resolve(decl: &ProviderDecl, creds: &Credentials, engine: &EngineConfig) -> Result<Self> {
        let mut credentials = creds.for_instance(&decl.name);
        let creds_type = credentials.remove(CREDS_TYPE_KEY);
        let declared = match decl.type_name.as_str() {
            "" | "-" => None,
            t => Some(t.to_string()),
        };
        let type_name = match (declared, creds_type) {
            (Some(d), Some(c)) if d != c => {
                return Err(Error::config(format!(
                    "{}: type {d} in configuration but {c} in credentials",
                    decl.name
                )));
            }
            (Some(d), _) => d,
            (None, Some(c)) => c,
            (None, None) => {
                return Err(Error::config(format!(
                    "{}: no adapter type in configuration or credentials",
                    decl.name
                )));
            }
        };
        Ok(Self {
            name: decl.name.clone(),
            type_name,
            credentials,
            meta: stringify(&decl.meta),
            http_timeout: engine.http_timeout(),
        })
    }

    /// Add a credential field
    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    /// A credential field, if present
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }

    /// A credential field that must be present and non-empty
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.credential(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::config(format!(
                "{}: missing credential {key}",
                self.name
            ))),
        }
    }

    /// A boolean credential field; absent means `false`
    pub fn credential_bool(&self, key: &str) -> Result<bool> {
        match self.credential(key) {
            None | Some("") | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(Error::config(format!(
                "{}: credential {key} must be true or false, got {other:?}",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for ProviderInstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstanceConfig")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .field("meta", &self.meta)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// How zones are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// One zone at a time
    #[default]
    Serial,
    /// Zones whose providers all declare `CanConcur` run in parallel
    Concurrent,
}

impl std::str::FromStr for ConcurrencyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "serial" => Ok(ConcurrencyMode::Serial),
            "concurrent" => Ok(ConcurrencyMode::Concurrent),
            other => Err(Error::config(format!(
                "concurrency mode must be serial or concurrent, got {other:?}"
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// TTL substituted for 0 during normalization
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Zone scheduling
    #[serde(default)]
    pub concurrency: ConcurrencyMode,

    /// Upper bound on zones in flight in concurrent mode
    #[serde(default = "default_max_parallel_zones")]
    pub max_parallel_zones: usize,

    /// Seconds after which a running correction is reported as overdue
    ///
    /// The correction still runs to completion; only adapter HTTP calls
    /// are cut off, by `http_timeout_secs`.
    #[serde(default = "default_correction_timeout_secs")]
    pub correction_timeout_secs: u64,

    /// Deadline handed to adapters for each HTTP call (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// When a running correction is reported as overdue
    pub fn correction_timeout(&self) -> Duration {
        Duration::from_secs(self.correction_timeout_secs)
    }

    /// Per-HTTP-call deadline
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate the engine settings
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl == 0 {
            return Err(Error::config("default_ttl must be > 0"));
        }
        if self.max_parallel_zones == 0 {
            return Err(Error::config("max_parallel_zones must be > 0"));
        }
        if self.correction_timeout_secs == 0 || self.http_timeout_secs == 0 {
            return Err(Error::config("timeouts must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            concurrency: ConcurrencyMode::default(),
            max_parallel_zones: default_max_parallel_zones(),
            correction_timeout_secs: default_correction_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ttl() -> u32 {
    300
}

fn default_max_parallel_zones() -> usize {
    8
}

fn default_correction_timeout_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> ZoneConfigFile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rejects_duplicate_zones() {
        let cfg = config(json!({
            "domains": [{"name": "example.com"}, {"name": "EXAMPLE.com"}]
        }));
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn rejects_nameserver_with_trailing_dot() {
        let cfg = config(json!({
            "domains": [{"name": "example.com", "nameservers": [{"name": "ns1.example.net."}]}]
        }));
        assert!(cfg.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn rejects_undeclared_provider() {
        let cfg = config(json!({
            "domains": [{"name": "example.com", "dnsProviders": {"ghost": -1}}]
        }));
        assert!(cfg.validate().unwrap_err().to_string().contains("ghost"));
    }

    #[test]
    fn converts_raw_and_ensure_absent_records() {
        let cfg = config(json!({
            "dns_providers": [{"name": "mem", "type": "MEMORY"}],
            "domains": [{
                "name": "example.com",
                "dnsProviders": {"mem": 0},
                "rawrecords": [
                    {"type": "A", "args": ["@", "1.2.3.4"], "ttl": 300},
                    {"type": "TXT", "args": ["old", "gone"], "ensure_absent": true}
                ],
                "records": [
                    {"type": "MX", "name": "@", "target": "mx.example.com.", "mxpreference": 10}
                ],
                "nameservers": ["ns1.example.net"]
            }]
        }));
        let dcs = cfg.to_domain_configs(TypeRegistry::global()).unwrap();
        assert_eq!(dcs.len(), 1);
        let dc = &dcs[0];
        assert_eq!(dc.records.len(), 2);
        assert_eq!(dc.ensure_absent.len(), 1);
        assert_eq!(dc.nameservers, vec![Nameserver::new("ns1.example.net")]);
        assert_eq!(dc.dns_providers["mem"], 0);
    }

    #[test]
    fn unknown_record_type_is_a_config_error() {
        let cfg = config(json!({
            "domains": [{"name": "example.com", "rawrecords": [{"type": "BOGUS", "args": ["@"]}]}]
        }));
        let err = cfg.to_domain_configs(TypeRegistry::global()).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("BOGUS"));
    }

    #[test]
    fn credentials_resolve_env_and_bools() {
        let creds = Credentials::from_json_with_env(
            r#"{"cf": {"TYPE": "CLOUDFLAREAPI", "apitoken": "$CF_TOKEN", "manage_redirects": true}}"#,
            |k| (k == "CF_TOKEN").then(|| "secret".to_string()),
        )
        .unwrap();
        let fields = creds.for_instance("cf");
        assert_eq!(fields["apitoken"], "secret");
        assert_eq!(fields["manage_redirects"], "true");
        assert!(!format!("{creds:?}").contains("secret"));

        let missing = Credentials::from_json_with_env(r#"{"cf": {"t": "$NOPE"}}"#, |_| None);
        assert!(missing.is_err());
    }

    #[test]
    fn instance_type_comes_from_decl_or_creds() {
        let creds = Credentials::from_json_with_env(
            r#"{"cf": {"TYPE": "CLOUDFLAREAPI", "apitoken": "t"}}"#,
            |_| None,
        )
        .unwrap();
        let engine = EngineConfig::default();

        let decl = ProviderDecl {
            name: "cf".into(),
            type_name: "-".into(),
            meta: BTreeMap::new(),
        };
        let resolved = ProviderInstanceConfig::resolve(&decl, &creds, &engine).unwrap();
        assert_eq!(resolved.type_name, "CLOUDFLAREAPI");
        assert!(!resolved.credentials.contains_key(CREDS_TYPE_KEY));
        assert_eq!(resolved.http_timeout, Duration::from_secs(30));
        assert!(!format!("{resolved:?}").contains("\"t\""));

        let conflicting = ProviderDecl {
            type_name: "MEMORY".into(),
            ..decl
        };
        assert!(ProviderInstanceConfig::resolve(&conflicting, &creds, &engine).is_err());
    }

    #[test]
    fn engine_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.default_ttl, 300);
        assert_eq!(cfg.concurrency, ConcurrencyMode::Serial);
        assert_eq!(cfg.max_parallel_zones, 8);
        assert!(cfg.validate().is_ok());
        assert_eq!("concurrent".parse::<ConcurrencyMode>().unwrap(), ConcurrencyMode::Concurrent);
    }
}
