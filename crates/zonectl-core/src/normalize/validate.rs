//! Desired-state validation
//!
//! Record-level checks run on the normalized desired state before any
//! provider is contacted; capability checks run per provider.

use super::ignore::IgnoreMatcher;
use crate::capabilities::{Capability, ProviderCapabilities};
use crate::error::{Error, Result};
use crate::models::{AutoDnssec, DomainConfig, RecordConfig, RecordData, RecordType};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

/// Largest TTL allowed by RFC 2181
pub const MAX_TTL: u32 = (1 << 31) - 1;

/// Record-level configuration checks
///
/// Every problem is reported, not just the first.
pub fn check_records(dc: &DomainConfig, ignore: &IgnoreMatcher) -> Result<()> {
    let mut problems = Vec::new();
    let mut types_at: BTreeMap<&str, BTreeSet<RecordType>> = BTreeMap::new();
    let mut seen = BTreeSet::new();
    let mut ttls: BTreeMap<(String, String), BTreeSet<u32>> = BTreeMap::new();

    for rc in &dc.records {
        let rtype = rc.rtype();
        types_at.entry(rc.name_fqdn.as_str()).or_default().insert(rtype);

        if rtype == RecordType::Cname && rc.is_apex() {
            problems.push(format!("CNAME at the apex of {} is not allowed", dc.name));
        }
        if rc.ttl > MAX_TTL {
            problems.push(format!("{rc}: ttl {} is larger than {MAX_TTL}", rc.ttl));
        }
        if rtype == RecordType::Srv && !is_service_label(&rc.name_fqdn) {
            problems.push(format!("{rc}: SRV label must be _service._proto"));
        }
        if let Some(target) = hostname_target_text(&rc.data) {
            if target.parse::<IpAddr>().is_ok() {
                problems.push(format!("{rc}: target must be a hostname, not an IP address"));
            }
        }
        if ignore.matches(rc) {
            problems.push(format!(
                "{rc}: record is desired but matches an ignore rule and would never converge"
            ));
        }

        let key = rc.key();
        if !seen.insert((key.clone(), rc.comparable(&[]))) {
            problems.push(format!("{rc}: duplicate record"));
        }
        ttls.entry((key.name_fqdn, key.rtype))
            .or_default()
            .insert(rc.ttl);
    }

    for (name, types) in &types_at {
        if types.contains(&RecordType::Cname) && types.len() > 1 {
            let others: Vec<&str> = types
                .iter()
                .filter(|t| **t != RecordType::Cname)
                .map(|t| t.as_str())
                .collect();
            problems.push(format!(
                "{name}: CNAME cannot coexist with {}",
                others.join(", ")
            ));
        }
    }

    for ((name, rtype), set) in &ttls {
        if set.len() > 1 {
            let list: Vec<String> = set.iter().map(u32::to_string).collect();
            problems.push(format!(
                "{rtype} {name}: records of one set must share a TTL, found {}",
                list.join(", ")
            ));
        }
    }

    let desired: BTreeSet<_> = dc
        .records
        .iter()
        .map(|rc| (rc.key(), rc.comparable(&[])))
        .collect();
    for rc in &dc.ensure_absent {
        if desired.contains(&(rc.key(), rc.comparable(&[]))) {
            problems.push(format!("{rc}: listed both as desired and as ensure-absent"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "domain {}: {}",
            dc.name,
            problems.join("; ")
        )))
    }
}

fn is_service_label(fqdn: &str) -> bool {
    let mut labels = fqdn.split('.');
    matches!(
        (labels.next(), labels.next()),
        (Some(svc), Some(proto)) if svc.len() > 1 && svc.starts_with('_')
            && proto.len() > 1 && proto.starts_with('_')
    )
}

fn hostname_target_text(data: &RecordData) -> Option<&str> {
    data.hostname_target().map(|h| h.without_dot())
}

/// Provider capability gate for one (zone, provider) pair
///
/// Violations are aggregated into one error naming every offending record.
pub fn check_capabilities(
    dc: &DomainConfig,
    provider: &str,
    caps: &ProviderCapabilities,
) -> Result<()> {
    let mut problems = Vec::new();
    for rc in &dc.records {
        let rtype = rc.rtype();
        let allowed = match rtype {
            RecordType::Ds => {
                caps.can_use(RecordType::Ds)
                    || (!rc.is_apex() && caps.has(Capability::CanUseDsForChildren))
            }
            other => caps.can_use(other),
        };
        if !allowed {
            problems.push(format!("{rc} requires {}", Capability::CanUse(rtype)));
        }
    }
    if dc.auto_dnssec == AutoDnssec::On && !caps.has(Capability::CanAutoDnssec) {
        problems.push(format!("auto_dnssec=on requires {}", Capability::CanAutoDnssec));
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::capability(&dc.name, provider, problems.join("; ")))
    }
}
