// # Registrar Trait
//
// A registrar manages delegation only: the list of nameservers the parent
// zone points at. It never sees records.

use crate::config::ProviderInstanceConfig;
use crate::correction::Correction;
use crate::error::Result;
use crate::models::DomainConfig;
use crate::registry::RegistrarMetadata;
use async_trait::async_trait;

/// Trait for registrar implementations
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Adapter type name, for logging
    fn registrar_name(&self) -> &str;

    /// At most one correction replacing the delegation of `dc.name` with
    /// `dc.nameservers`
    ///
    /// Implementations fetch the current delegation and call
    /// [`delegation_change`] to decide.
    async fn get_registrar_corrections(&self, dc: &DomainConfig) -> Result<Vec<Correction>>;
}

/// Helper trait for constructing registrars from configuration
pub trait RegistrarFactory: Send + Sync {
    /// Registration record
    fn metadata(&self) -> RegistrarMetadata;

    /// Create an instance from its configuration
    fn create(&self, config: &ProviderInstanceConfig) -> Result<Box<dyn Registrar>>;
}

/// A pending delegation update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationChange {
    /// Current nameservers, normalized and sorted
    pub old: Vec<String>,
    /// Desired nameservers, normalized and sorted
    pub new: Vec<String>,
}

impl DelegationChange {
    /// `"old1,old2 → new1,new2"`
    pub fn describe(&self) -> String {
        format!("{} → {}", self.old.join(","), self.new.join(","))
    }
}

/// Lowercase, strip trailing dots, sort, de-duplicate
pub fn normalize_delegation<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut out: Vec<String> = names
        .iter()
        .map(|n| n.as_ref().trim_end_matches('.').to_ascii_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Compare the current delegation with `dc.nameservers`
///
/// Returns `None` when the sorted sets are equal.
pub fn delegation_change<S: AsRef<str>>(current: &[S], dc: &DomainConfig) -> Option<DelegationChange> {
    let old = normalize_delegation(current);
    let desired: Vec<&str> = dc.nameservers.iter().map(|ns| ns.name.as_str()).collect();
    let new = normalize_delegation(&desired);
    if old == new {
        None
    } else {
        Some(DelegationChange { old, new })
    }
}
