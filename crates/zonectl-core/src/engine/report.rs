//! Run reports
//!
//! A [`RunReport`] is what a preview or push returns: one [`ZoneReport`] per
//! zone, each with one [`ProviderReport`] per DNS provider plus one for the
//! registrar. Serialized with `--report` as a flat JSON array.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Whether corrections are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Compute and print; no side effects
    Preview,
    /// Compute and apply
    Push,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Preview => "preview",
            RunMode::Push => "push",
        })
    }
}

/// Outcome for one (zone, provider) pair
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub domain: String,
    pub provider: String,
    /// Correction messages in execution order
    pub corrections: Vec<String>,
    /// Record-level changes (reports excluded)
    #[serde(skip)]
    pub changes: usize,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProviderReport {
    pub fn new(domain: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            provider: provider.into(),
            corrections: Vec::new(),
            changes: 0,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome for one zone
#[derive(Debug, Clone, Serialize)]
pub struct ZoneReport {
    pub domain: String,
    pub providers: Vec<ProviderReport>,
    /// First error that stopped the zone
    pub error: Option<String>,
}

impl ZoneReport {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            providers: Vec::new(),
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some() || self.providers.iter().any(ProviderReport::failed)
    }

    pub fn changes(&self) -> usize {
        self.providers.iter().map(|p| p.changes).sum()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub zones: Vec<ZoneReport>,
}

impl RunReport {
    pub fn any_failed(&self) -> bool {
        self.zones.iter().any(ZoneReport::failed)
    }

    pub fn total_changes(&self) -> usize {
        self.zones.iter().map(ZoneReport::changes).sum()
    }

    /// Flat `{domain, provider, corrections, error, timestamp}` entries
    pub fn entries(&self) -> impl Iterator<Item = &ProviderReport> {
        self.zones.iter().flat_map(|z| z.providers.iter())
    }

    /// The `--report` document
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<&ProviderReport> = self.entries().collect();
        serde_json::to_string_pretty(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_and_change_rollups() {
        let mut ok = ProviderReport::new("example.com", "mem");
        ok.changes = 2;
        let mut bad = ProviderReport::new("example.com", "cf");
        bad.error = Some("boom".into());

        let mut zone = ZoneReport::new("example.com");
        zone.providers = vec![ok, bad];
        let report = RunReport {
            mode: RunMode::Push,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            zones: vec![zone],
        };
        assert!(report.any_failed());
        assert_eq!(report.total_changes(), 2);
    }

    #[test]
    fn json_is_a_flat_array() {
        let mut zone = ZoneReport::new("example.com");
        let mut p = ProviderReport::new("example.com", "mem");
        p.corrections.push("+ CREATE A @ → 1.2.3.4 ttl=300".into());
        zone.providers.push(p);
        let report = RunReport {
            mode: RunMode::Preview,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            zones: vec![zone],
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["domain"], "example.com");
        assert_eq!(entries[0]["provider"], "mem");
        assert!(entries[0]["error"].is_null());
        assert!(entries[0]["timestamp"].is_string());
    }
}
