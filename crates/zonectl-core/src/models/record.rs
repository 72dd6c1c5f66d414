//! The canonical record entity

use super::label::{parse_label3, shorten_fqdn};
use super::rdata::{RecordData, RecordType, quote, segment_txt};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque handle to a provider's native record object
///
/// The core never looks inside; only the adapter that created it downcasts
/// it back to its own type (typically to recover a record ID).
#[derive(Clone)]
pub struct Original(Arc<dyn Any + Send + Sync>);

impl Original {
    /// Wrap an adapter-native value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Recover the adapter-native value
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Original {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Original(..)")
    }
}

/// A single DNS record, desired or observed
///
/// Invariants after construction:
/// - `name_fqdn` has no trailing dot
/// - `name == "@"` iff `name_fqdn` is the zone origin
/// - `data` holds exactly the payload of the record's type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Short label relative to the zone, `"@"` for the apex
    pub name: String,
    /// Fully qualified name without trailing dot
    pub name_fqdn: String,
    /// 0 means "provider default" until normalized
    pub ttl: u32,
    /// Typed payload
    pub data: RecordData,
    /// Free-form per-provider hints
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Provider-native object this record was read from
    #[serde(skip)]
    pub original: Option<Original>,
}

impl PartialEq for RecordConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.name_fqdn == other.name_fqdn
            && self.ttl == other.ttl
            && self.data == other.data
            && self.metadata == other.metadata
    }
}

impl RecordConfig {
    /// Create a record at `short` (relative to `origin`)
    pub fn new(short: &str, origin: &str, ttl: u32, data: RecordData) -> Result<Self> {
        let (name, name_fqdn) = parse_label3(short, "", origin)?;
        Ok(Self {
            name,
            name_fqdn,
            ttl,
            data,
            metadata: BTreeMap::new(),
            original: None,
        })
    }

    /// Create a record from a fully qualified owner name, as read from a provider
    pub fn from_fqdn(fqdn: &str, origin: &str, ttl: u32, data: RecordData) -> Result<Self> {
        let fqdn = fqdn.trim_end_matches('.').to_ascii_lowercase();
        let short = shorten_fqdn(&fqdn, origin);
        if short == fqdn {
            return Err(Error::parse(fqdn, format!("name is not within zone {origin}")));
        }
        Ok(Self {
            name: short,
            name_fqdn: fqdn,
            ttl,
            data,
            metadata: BTreeMap::new(),
            original: None,
        })
    }

    /// Attach provider metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach the provider-native object
    pub fn with_original(mut self, original: Original) -> Self {
        self.original = Some(original);
        self
    }

    /// The record's type
    pub fn rtype(&self) -> RecordType {
        self.data.record_type()
    }

    /// Whether the record sits at the zone apex
    pub fn is_apex(&self) -> bool {
        self.name == "@"
    }

    /// Index key `(name_fqdn, type)`
    pub fn key(&self) -> RecordKey {
        let rtype = match &self.data {
            RecordData::R53Alias { alias_type, .. } => format!("R53_ALIAS_{alias_type}"),
            data => data.record_type().as_str().to_string(),
        };
        RecordKey {
            name_fqdn: self.name_fqdn.clone(),
            rtype,
        }
    }

    /// Legacy target view
    pub fn target(&self) -> String {
        self.data.target()
    }

    /// Presentation-format rdata
    pub fn rdata(&self) -> String {
        self.data.rdata()
    }

    /// Canonical equality form, excluding TTL
    ///
    /// `extras` names metadata keys that take part in equality for the
    /// provider at hand.
    pub fn comparable(&self, extras: &[String]) -> String {
        let mut out = self.data.rdata();
        for key in extras {
            if let Some(value) = self.metadata.get(key) {
                out.push(' ');
                out.push_str(key);
                out.push('=');
                out.push_str(value);
            }
        }
        out
    }

    /// Canonical equality form including TTL
    pub fn comparable_with_ttl(&self, extras: &[String]) -> String {
        format!("{} ttl={}", self.comparable(extras), self.ttl)
    }

    /// Replace the TXT value
    ///
    /// # Panics
    ///
    /// On a non-TXT record.
    pub fn set_target_txt(&mut self, txt: impl Into<String>) {
        match &mut self.data {
            RecordData::Txt { txt: current } => *current = txt.into(),
            other => panic!("set_target_txt on a {} record", other.record_type()),
        }
    }

    /// The TXT value as one string (other types: the legacy target)
    pub fn target_txt_joined(&self) -> String {
        match &self.data {
            RecordData::Txt { txt } => txt.clone(),
            other => other.target(),
        }
    }

    /// The TXT value split into ≤255-octet segments
    pub fn target_txt_segmented(&self) -> Vec<String> {
        segment_txt(&self.target_txt_joined())
    }

    /// Segmented TXT rendered as quoted, escaped character-strings
    pub fn txt_quoted(&self) -> String {
        self.target_txt_segmented()
            .iter()
            .map(|s| quote(s))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A tab-separated zone-file line: `fqdn. ttl IN type rdata`
    pub fn to_zone_line(&self) -> String {
        format!(
            "{}.\t{}\tIN\t{}\t{}",
            self.name_fqdn,
            self.ttl,
            self.rtype(),
            self.rdata()
        )
    }
}

impl fmt::Display for RecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ttl={}", self.rtype(), self.name, self.rdata(), self.ttl)
    }
}

/// `(name_fqdn, type)` index key; `R53_ALIAS` is widened by the aliased type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Owner name, no trailing dot
    pub name_fqdn: String,
    /// Type token, possibly widened
    pub rtype: String,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name_fqdn, self.rtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn a(short: &str, ip: [u8; 4]) -> RecordConfig {
        RecordConfig::new(short, "example.com", 300, RecordData::A {
            address: Ipv4Addr::from(ip),
        })
        .unwrap()
    }

    fn txt(value: &str) -> RecordConfig {
        RecordConfig::new("@", "example.com", 300, RecordData::Txt {
            txt: value.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn apex_invariant_holds() {
        let apex = a("@", [1, 2, 3, 4]);
        assert_eq!(apex.name_fqdn, "example.com");
        assert!(apex.is_apex());

        let www = a("www", [1, 2, 3, 4]);
        assert_eq!(www.name_fqdn, "www.example.com");
        assert!(!www.is_apex());
    }

    #[test]
    fn from_fqdn_shortens() {
        let rc = RecordConfig::from_fqdn("WWW.example.com.", "example.com", 60, RecordData::A {
            address: Ipv4Addr::new(1, 1, 1, 1),
        })
        .unwrap();
        assert_eq!(rc.name, "www");
        assert_eq!(rc.name_fqdn, "www.example.com");

        assert!(
            RecordConfig::from_fqdn("www.other.org", "example.com", 60, RecordData::A {
                address: Ipv4Addr::new(1, 1, 1, 1),
            })
            .is_err()
        );
    }

    #[test]
    fn comparable_ignores_ttl_but_not_extras() {
        let mut x = a("www", [1, 1, 1, 1]);
        let mut y = a("www", [1, 1, 1, 1]);
        y.ttl = 3600;
        assert_eq!(x.comparable(&[]), y.comparable(&[]));
        assert_ne!(x.comparable_with_ttl(&[]), y.comparable_with_ttl(&[]));

        let extras = vec!["cloudflare_proxy".to_string()];
        x.metadata.insert("cloudflare_proxy".into(), "on".into());
        assert_ne!(x.comparable(&extras), y.comparable(&extras));
        assert_eq!(x.comparable(&[]), y.comparable(&[]));
    }

    #[test]
    fn txt_accessors() {
        let mut rc = txt("old");
        rc.set_target_txt("x");
        assert_eq!(rc.target_txt_joined(), "x");

        rc.set_target_txt("a".repeat(600));
        let lens: Vec<usize> = rc.target_txt_segmented().iter().map(String::len).collect();
        assert_eq!(lens, vec![255, 255, 90]);

        rc.set_target_txt(r#"say "hi" \o/"#);
        assert_eq!(rc.txt_quoted(), r#""say \"hi\" \\o/""#);
    }

    #[test]
    #[should_panic(expected = "set_target_txt on a A record")]
    fn set_target_txt_on_wrong_type_panics() {
        a("www", [1, 1, 1, 1]).set_target_txt("x");
    }

    #[test]
    fn r53_alias_key_is_widened() {
        let rc = RecordConfig::new("@", "example.com", 300, RecordData::R53Alias {
            alias_type: "AAAA".into(),
            target: "d1.cloudfront.net".into(),
            zone_id: None,
        })
        .unwrap();
        assert_eq!(rc.key().rtype, "R53_ALIAS_AAAA");
    }

    #[test]
    fn original_is_opaque_but_recoverable() {
        let rc = a("www", [1, 1, 1, 1]).with_original(Original::new("rec-42".to_string()));
        let id = rc.original.as_ref().and_then(|o| o.downcast_ref::<String>());
        assert_eq!(id.map(String::as_str), Some("rec-42"));
        assert!(format!("{rc:?}").contains("Original(..)"));
    }
}
