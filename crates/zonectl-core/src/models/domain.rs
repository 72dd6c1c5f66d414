//! A zone's desired state

use super::record::RecordConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Delegation intent for DNSSEC
///
/// `Unset` means "leave whatever the provider has"; some adapters treat it
/// like `Off`, others do not touch the zone at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoDnssec {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "on")]
    On,
    #[serde(rename = "off")]
    Off,
}

impl AutoDnssec {
    /// Whether any intent was expressed
    pub fn is_set(self) -> bool {
        self != AutoDnssec::Unset
    }
}

/// An authoritative nameserver, fully qualified, no trailing dot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nameserver {
    /// Hostname
    pub name: String,
}

impl Nameserver {
    /// Create a nameserver entry, lowercasing the name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
        }
    }

    /// Build a list from plain hostnames
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Vec<Self> {
        names.iter().map(|n| Self::new(n.as_ref())).collect()
    }
}

impl fmt::Display for Nameserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An ignore rule on labels
///
/// Accepts either a bare glob or `{pattern, types}` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IgnoreNameJson")]
pub struct IgnoreName {
    /// Glob over the short label (`@` for the apex)
    pub pattern: String,
    /// Comma-separated type list; empty means all types
    #[serde(default)]
    pub types: String,
}

impl IgnoreName {
    /// Ignore every type at labels matching `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            types: String::new(),
        }
    }

    /// The type tokens this rule is restricted to
    pub fn type_list(&self) -> Vec<String> {
        self.types
            .split(',')
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IgnoreNameJson {
    Bare(String),
    Full {
        pattern: String,
        #[serde(default)]
        types: String,
    },
}

impl From<IgnoreNameJson> for IgnoreName {
    fn from(value: IgnoreNameJson) -> Self {
        match value {
            IgnoreNameJson::Bare(pattern) => IgnoreName::new(pattern),
            IgnoreNameJson::Full { pattern, types } => IgnoreName { pattern, types },
        }
    }
}

/// An ignore rule on targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IgnoreTargetJson")]
pub struct IgnoreTarget {
    /// Glob over the record's target
    pub pattern: String,
    /// Restrict to one type; empty means all types
    #[serde(default, rename = "type")]
    pub rtype: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IgnoreTargetJson {
    Bare(String),
    Full {
        pattern: String,
        #[serde(default, rename = "type")]
        rtype: String,
    },
}

impl From<IgnoreTargetJson> for IgnoreTarget {
    fn from(value: IgnoreTargetJson) -> Self {
        match value {
            IgnoreTargetJson::Bare(pattern) => IgnoreTarget {
                pattern,
                rtype: String::new(),
            },
            IgnoreTargetJson::Full { pattern, rtype } => IgnoreTarget { pattern, rtype },
        }
    }
}

/// A zone's desired state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Zone name, lowercase, no trailing dot
    pub name: String,
    /// Registrar instance name
    #[serde(default)]
    pub registrar: Option<String>,
    /// DNS provider instance name → number of nameservers to advertise (-1 = all)
    #[serde(default)]
    pub dns_providers: BTreeMap<String, i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Desired records
    #[serde(default)]
    pub records: Vec<RecordConfig>,
    /// Records that must not exist
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ensure_absent: Vec<RecordConfig>,
    /// Desired delegation
    #[serde(default)]
    pub nameservers: Vec<Nameserver>,
    /// Never delete records that are not desired
    #[serde(default)]
    pub keep_unknown: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_names: Vec<IgnoreName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_targets: Vec<IgnoreTarget>,
    #[serde(default)]
    pub auto_dnssec: AutoDnssec,
}

impl DomainConfig {
    /// An empty zone with no providers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrar: None,
            dns_providers: BTreeMap::new(),
            metadata: BTreeMap::new(),
            records: Vec::new(),
            ensure_absent: Vec::new(),
            nameservers: Vec::new(),
            keep_unknown: false,
            ignored_names: Vec::new(),
            ignored_targets: Vec::new(),
            auto_dnssec: AutoDnssec::Unset,
        }
    }

    /// Append a nameserver unless already present
    pub fn add_nameserver(&mut self, ns: Nameserver) -> bool {
        if self.nameservers.contains(&ns) {
            return false;
        }
        self.nameservers.push(ns);
        true
    }
}
