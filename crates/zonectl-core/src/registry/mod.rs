//! Plugin-based provider registry and capability matrix
//!
//! The registry maps adapter type names (e.g. `"CLOUDFLAREAPI"`) to factory
//! objects, avoiding hardcoded if-else chains, and stores the resolved
//! capability set of every registered DNS provider type.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonectl_core::registry::ProviderRegistry;
//!
//! let mut registry = ProviderRegistry::with_builtins();
//! zonectl_provider_cloudflare::register(&mut registry)?;
//!
//! // Freeze: share read-only from here on
//! let registry = std::sync::Arc::new(registry);
//! let provider = registry.create_dns_provider(&instance_config)?;
//! ```
//!
//! ## Registration
//!
//! Adapter crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &mut ProviderRegistry) -> zonectl_core::Result<()> {
//!     registry.register_dns_provider(Box::new(CloudflareFactory))
//! }
//! ```
//!
//! Registration is the only mutation. Afterwards the registry is shared
//! behind an `Arc` and every lookup is a plain map read.

pub mod types;

use crate::capabilities::{
    Capability, DocumentationNote, DocumentationNotes, ProviderCapabilities, parse_type_spec,
};
use crate::config::ProviderInstanceConfig;
use crate::error::{Error, Result};
use crate::models::RecordType;
use crate::traits::{DnsServiceProvider, DnsServiceProviderFactory, Registrar, RegistrarFactory};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Kind of a credentials field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredsKind {
    String,
    Bool,
}

/// One field of a provider's credentials schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredsField {
    pub name: String,
    pub kind: CredsKind,
    pub required: bool,
    /// Never logged
    pub secret: bool,
}

impl CredsField {
    /// A required secret string
    pub fn secret(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CredsKind::String,
            required: true,
            secret: true,
        }
    }

    /// An optional plain string
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CredsKind::String,
            required: false,
            secret: false,
        }
    }

    /// An optional boolean
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CredsKind::Bool,
            required: false,
            secret: false,
        }
    }
}

/// Registration record of a DNS provider type
#[derive(Debug, Clone, Default)]
pub struct ProviderMetadata {
    /// Adapter type name, uppercase by convention
    pub type_name: String,
    /// Who maintains the adapter
    pub maintainer: String,
    /// Record-type spec elements `TYPE[:verb[:note]]`; empty grants every type
    pub record_types: Vec<String>,
    /// Declared features that cannot be derived
    pub features: DocumentationNotes,
    /// The adapter implements zone listing
    pub lists_zones: bool,
    /// The adapter implements zone creation
    pub creates_zones: bool,
    /// Credentials fields
    pub creds_schema: Vec<CredsField>,
}

/// Registration record of a registrar type
#[derive(Debug, Clone, Default)]
pub struct RegistrarMetadata {
    pub type_name: String,
    pub maintainer: String,
    pub creds_schema: Vec<CredsField>,
}

struct DnsEntry {
    factory: Box<dyn DnsServiceProviderFactory>,
    metadata: ProviderMetadata,
    capabilities: ProviderCapabilities,
}

struct RegistrarEntry {
    factory: Box<dyn RegistrarFactory>,
    metadata: RegistrarMetadata,
}

/// Provider registry for plugin-based adapter creation
///
/// Populated with `&mut self` during init, then frozen behind an `Arc`.
#[derive(Default)]
pub struct ProviderRegistry {
    dns_providers: HashMap<String, DnsEntry>,
    registrars: HashMap<String, RegistrarEntry>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `NONE` and `MEMORY` adapters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // built-in metadata never repeats derivable features
        if let Err(e) = crate::providers::register_builtins(&mut registry) {
            panic!("built-in provider registration failed: {e}");
        }
        registry
    }

    /// Register a DNS provider factory
    ///
    /// Fails when the type is already registered, when a record-type spec
    /// element does not parse, or when `features` repeats a capability the
    /// registry derives itself (`CanUse<TYPE>` for listed types,
    /// `CanGetZones`, `DocCreateDomains`).
    pub fn register_dns_provider(&mut self, factory: Box<dyn DnsServiceProviderFactory>) -> Result<()> {
        let metadata = factory.metadata();
        let name = metadata.type_name.clone();
        if self.dns_providers.contains_key(&name) {
            return Err(Error::config(format!(
                "DNS provider type {name} registered twice"
            )));
        }

        let mut notes = DocumentationNotes::new();
        if metadata.record_types.is_empty() {
            for rtype in RecordType::ALL {
                notes.insert(Capability::CanUse(*rtype), DocumentationNote::can());
            }
        } else {
            for spec in &metadata.record_types {
                let (rtype, note) = parse_type_spec(spec).map_err(|e| {
                    Error::config(format!("provider {name}: record type {spec:?}: {e}"))
                })?;
                notes.insert(Capability::CanUse(rtype), note);
            }
        }
        if metadata.lists_zones {
            notes.insert(Capability::CanGetZones, DocumentationNote::can());
        }
        if metadata.creates_zones {
            notes.insert(Capability::DocCreateDomains, DocumentationNote::can());
        }

        for (cap, note) in &metadata.features {
            if notes.contains_key(cap) {
                return Err(Error::config(format!(
                    "provider {name}: feature {cap} is derived automatically and must not be declared"
                )));
            }
            notes.insert(*cap, note.clone());
        }

        let capabilities = ProviderCapabilities::from_notes(notes);
        debug!(
            provider = %name,
            capabilities = capabilities.iter().count(),
            "registered DNS provider"
        );
        self.dns_providers.insert(
            name,
            DnsEntry {
                factory,
                metadata,
                capabilities,
            },
        );
        Ok(())
    }

    /// Register a registrar factory
    pub fn register_registrar(&mut self, factory: Box<dyn RegistrarFactory>) -> Result<()> {
        let metadata = factory.metadata();
        let name = metadata.type_name.clone();
        if self.registrars.contains_key(&name) {
            return Err(Error::config(format!("registrar type {name} registered twice")));
        }
        debug!(registrar = %name, "registered registrar");
        self.registrars
            .insert(name, RegistrarEntry { factory, metadata });
        Ok(())
    }

    /// Whether provider type `type_name` has `cap`
    pub fn provider_has_capability(&self, type_name: &str, cap: Capability) -> bool {
        self.dns_providers
            .get(type_name)
            .is_some_and(|e| e.capabilities.has(cap))
    }

    /// The resolved capability set of a provider type
    pub fn capabilities(&self, type_name: &str) -> Option<&ProviderCapabilities> {
        self.dns_providers.get(type_name).map(|e| &e.capabilities)
    }

    /// The registration record of a provider type
    pub fn dns_provider_metadata(&self, type_name: &str) -> Option<&ProviderMetadata> {
        self.dns_providers.get(type_name).map(|e| &e.metadata)
    }

    /// Credentials schema of a provider or registrar type
    pub fn creds_schema(&self, type_name: &str) -> Option<&[CredsField]> {
        self.dns_providers
            .get(type_name)
            .map(|e| e.metadata.creds_schema.as_slice())
            .or_else(|| {
                self.registrars
                    .get(type_name)
                    .map(|e| e.metadata.creds_schema.as_slice())
            })
    }

    /// Create a DNS provider from configuration
    ///
    /// Required credentials are checked against the type's schema first.
    pub fn create_dns_provider(
        &self,
        config: &ProviderInstanceConfig,
    ) -> Result<Box<dyn DnsServiceProvider>> {
        let entry = self.dns_providers.get(&config.type_name).ok_or_else(|| {
            Error::config(format!(
                "{}: unknown DNS provider type {}",
                config.name, config.type_name
            ))
        })?;
        check_credentials(config, &entry.metadata.creds_schema)?;
        entry.factory.create(config)
    }

    /// Create a registrar from configuration
    pub fn create_registrar(&self, config: &ProviderInstanceConfig) -> Result<Box<dyn Registrar>> {
        let entry = self.registrars.get(&config.type_name).ok_or_else(|| {
            Error::config(format!(
                "{}: unknown registrar type {}",
                config.name, config.type_name
            ))
        })?;
        check_credentials(config, &entry.metadata.creds_schema)?;
        entry.factory.create(config)
    }

    /// Check if a DNS provider type is registered
    pub fn has_dns_provider(&self, type_name: &str) -> bool {
        self.dns_providers.contains_key(type_name)
    }

    /// Check if a registrar type is registered
    pub fn has_registrar(&self, type_name: &str) -> bool {
        self.registrars.contains_key(type_name)
    }

    /// List registered DNS provider types, sorted
    pub fn list_dns_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dns_providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// List registered registrar types, sorted
    pub fn list_registrars(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registrars.keys().cloned().collect();
        names.sort();
        names
    }
}

fn check_credentials(config: &ProviderInstanceConfig, schema: &[CredsField]) -> Result<()> {
    for field in schema {
        match field.kind {
            CredsKind::String if field.required => {
                config.require(&field.name)?;
            }
            CredsKind::Bool => {
                config.credential_bool(&field.name)?;
            }
            CredsKind::String => {}
        }
    }
    Ok(())
}
