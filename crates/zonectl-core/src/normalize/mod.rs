//! Normalizer
//!
//! Applied once between parse and diff, to desired and observed records
//! alike:
//! - names are lowercased and IDN labels punycoded; apex names become `"@"`
//! - hostname targets of hostname-valued types get the same treatment
//! - a TTL of 0 becomes the configured default
//!
//! Normalization is idempotent.

pub mod ignore;
pub mod validate;

pub use ignore::IgnoreMatcher;
pub use validate::{check_capabilities, check_records};

use crate::error::{Error, Result};
use crate::models::label::shorten_fqdn;
use crate::models::{RecordConfig, RecordData, RecordType};
use tracing::trace;

/// Convert a name to its lowercase ASCII (punycode) form
///
/// A trailing dot is preserved. `"@"` and `"."` pass through unchanged.
pub fn to_ascii_name(name: &str) -> Result<String> {
    if name == "@" || name == "." {
        return Ok(name.to_string());
    }
    if name.is_ascii() {
        return Ok(name.to_ascii_lowercase());
    }
    let (body, dot) = match name.strip_suffix('.') {
        Some(body) => (body, "."),
        None => (name, ""),
    };
    let ascii = idna::domain_to_ascii(body)
        .map_err(|e| Error::parse(name, format!("invalid internationalized name: {e}")))?;
    Ok(format!("{ascii}{dot}"))
}

/// Normalize records in place
///
/// `origin` is the zone (lowercase, no trailing dot).
pub fn normalize_records(records: &mut [RecordConfig], origin: &str, default_ttl: u32) -> Result<()> {
    for rc in records.iter_mut() {
        normalize_record(rc, origin, default_ttl)?;
    }
    Ok(())
}

fn normalize_record(rc: &mut RecordConfig, origin: &str, default_ttl: u32) -> Result<()> {
    let fqdn = to_ascii_name(&rc.name_fqdn)?;
    assert!(
        !fqdn.ends_with('.'),
        "record name {fqdn:?} reached the normalizer with a trailing dot"
    );
    rc.name = shorten_fqdn(&fqdn, origin);
    rc.name_fqdn = fqdn;

    if rc.rtype().is_hostname_valued() {
        let target = rc.data.target();
        let normalized = to_ascii_name(&target)?;
        if normalized != target {
            trace!(from = %target, to = %normalized, "normalized target");
            rc.data.map_hostname_target(|t| {
                to_ascii_name(t).unwrap_or_else(|_| t.to_ascii_lowercase())
            });
        }
    }

    if let RecordData::Caa { tag, .. } = &mut rc.data {
        tag.make_ascii_lowercase();
    }

    if rc.ttl == 0 {
        rc.ttl = default_ttl;
    }
    Ok(())
}

/// Drop NS records at the apex
pub fn remove_apex_ns(records: Vec<RecordConfig>) -> Vec<RecordConfig> {
    records
        .into_iter()
        .filter(|rc| !(rc.rtype() == RecordType::Ns && rc.is_apex()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HostnameDot;

    fn cname(short: &str, target: &str) -> RecordConfig {
        RecordConfig::new(short, "example.com", 0, RecordData::Cname {
            target: HostnameDot::parse(target, "example.com").unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn lowercases_names_targets_and_applies_ttl() {
        let mut records = vec![cname("WWW", "Host.Example.NET.")];
        records[0].name_fqdn = "WWW.example.com".into();
        normalize_records(&mut records, "example.com", 300).unwrap();
        assert_eq!(records[0].name, "www");
        assert_eq!(records[0].name_fqdn, "www.example.com");
        assert_eq!(records[0].target(), "host.example.net.");
        assert_eq!(records[0].ttl, 300);
    }

    #[test]
    fn punycodes_idn_labels() {
        let mut records = vec![cname("bücher", "straße.example.net.")];
        normalize_records(&mut records, "example.com", 300).unwrap();
        assert_eq!(records[0].name, "xn--bcher-kva");
        assert_eq!(records[0].name_fqdn, "xn--bcher-kva.example.com");
        assert!(records[0].target().is_ascii());
        assert!(records[0].target().ends_with(".example.net."));
    }

    #[test]
    fn is_idempotent() {
        let mut once = vec![cname("Bücher", "Target.Example.net.")];
        normalize_records(&mut once, "example.com", 300).unwrap();
        let mut twice = once.clone();
        normalize_records(&mut twice, "example.com", 300).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_explicit_ttl_and_txt_case() {
        let mut records = vec![
            RecordConfig::new("@", "example.com", 60, RecordData::Txt {
                txt: "MiXeD".into(),
            })
            .unwrap(),
        ];
        normalize_records(&mut records, "example.com", 300).unwrap();
        assert_eq!(records[0].ttl, 60);
        assert_eq!(records[0].target(), "MiXeD");
    }

    #[test]
    fn apex_ns_removal() {
        let ns = |short: &str| {
            RecordConfig::new(short, "example.com", 300, RecordData::Ns {
                target: HostnameDot::parse("ns1.example.net.", "example.com").unwrap(),
            })
            .unwrap()
        };
        let kept = remove_apex_ns(vec![ns("@"), ns("sub")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "sub");
    }
}
