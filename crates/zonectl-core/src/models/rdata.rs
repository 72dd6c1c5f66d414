//! Record types and their typed payloads
//!
//! [`RecordType`] is the closed set of type tokens zonectl understands.
//! [`RecordData`] carries exactly one typed payload per record; the legacy
//! untyped views (`target`, rendered rdata) are derived from it on demand.

use super::fields::{Args, HostnameDot};
use super::loc::Loc;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

macro_rules! record_types {
    ($( $variant:ident => $token:literal ),* $(,)?) => {
        /// A record type token
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum RecordType {
            $(
                #[doc = concat!("`", $token, "`")]
                $variant,
            )*
        }

        impl RecordType {
            /// Every type, in declaration order
            pub const ALL: &'static [RecordType] = &[$(RecordType::$variant),*];

            /// The uppercase token
            pub fn as_str(self) -> &'static str {
                match self {
                    $(RecordType::$variant => $token,)*
                }
            }
        }

        impl FromStr for RecordType {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($token => Ok(RecordType::$variant),)*
                    other => Err(Error::UnknownRecordType(other.to_string())),
                }
            }
        }
    };
}

record_types! {
    A => "A",
    Aaaa => "AAAA",
    Cname => "CNAME",
    Mx => "MX",
    Ns => "NS",
    Ptr => "PTR",
    Txt => "TXT",
    Srv => "SRV",
    Caa => "CAA",
    Tlsa => "TLSA",
    Sshfp => "SSHFP",
    Ds => "DS",
    Dnskey => "DNSKEY",
    Naptr => "NAPTR",
    Loc => "LOC",
    Https => "HTTPS",
    Svcb => "SVCB",
    Alias => "ALIAS",
    Soa => "SOA",
    R53Alias => "R53_ALIAS",
    AzureAlias => "AZURE_ALIAS",
    CfSingleRedirect => "CF_SINGLE_REDIRECT",
    AkamaiCdn => "AKAMAICDN",
    AkamaiTlc => "AKAMAITLC",
    PageRule => "PAGE_RULE",
    Url => "URL",
    Url301 => "URL301",
    Frame => "FRAME",
    Nameserver => "NAMESERVER",
    ImportTransform => "IMPORT_TRANSFORM",
}

impl RecordType {
    /// Types whose target is a hostname that is lowercased and punycoded
    pub fn is_hostname_valued(self) -> bool {
        matches!(
            self,
            RecordType::Cname
                | RecordType::Ns
                | RecordType::Mx
                | RecordType::Ptr
                | RecordType::Alias
                | RecordType::R53Alias
                | RecordType::AzureAlias
        )
    }

    /// Provider-specific types with no DNS wire representation
    pub fn is_pseudo(self) -> bool {
        matches!(
            self,
            RecordType::R53Alias
                | RecordType::AzureAlias
                | RecordType::CfSingleRedirect
                | RecordType::AkamaiCdn
                | RecordType::AkamaiTlc
                | RecordType::PageRule
                | RecordType::Url
                | RecordType::Url301
                | RecordType::Frame
                | RecordType::Nameserver
                | RecordType::ImportTransform
        )
    }

    /// Positional field names, in argument order
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            RecordType::A | RecordType::Aaaa => &["address"],
            RecordType::Cname
            | RecordType::Ns
            | RecordType::Ptr
            | RecordType::Alias
            | RecordType::Nameserver => &["target"],
            RecordType::Mx => &["preference", "mx"],
            RecordType::Txt => &["txt"],
            RecordType::Srv => &["priority", "weight", "port", "target"],
            RecordType::Caa => &["flag", "tag", "value"],
            RecordType::Tlsa => &["usage", "selector", "matching_type", "certificate"],
            RecordType::Sshfp => &["algorithm", "fingerprint_type", "fingerprint"],
            RecordType::Ds => &["key_tag", "algorithm", "digest_type", "digest"],
            RecordType::Dnskey => &["flags", "protocol", "algorithm", "public_key"],
            RecordType::Naptr => &[
                "order",
                "preference",
                "flags",
                "service",
                "regexp",
                "replacement",
            ],
            RecordType::Loc => &["location"],
            RecordType::Https | RecordType::Svcb => &["priority", "target", "params"],
            RecordType::Soa => &["ns", "mbox", "serial", "refresh", "retry", "expire", "minttl"],
            RecordType::R53Alias => &["alias_type", "target", "zone_id"],
            RecordType::AzureAlias => &["alias_type", "target"],
            RecordType::CfSingleRedirect => &["rule_name", "code", "when", "then"],
            RecordType::AkamaiCdn | RecordType::Url | RecordType::Url301 | RecordType::Frame => {
                &["target"]
            }
            RecordType::AkamaiTlc => &["answer_type", "dns_name"],
            RecordType::PageRule => &["from", "to", "priority", "code"],
            RecordType::ImportTransform => &["zone", "transform"],
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

/// SVCB and HTTPS payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvcbData {
    /// 0 means alias mode
    pub priority: u16,
    /// Target name; `"."` means the owner name
    pub target: HostnameDot,
    /// Space-separated `key=value` parameters, presentation form
    pub params: String,
}

/// The typed payload of a record, one variant per record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "fields")]
pub enum RecordData {
    #[serde(rename = "A")]
    A { address: Ipv4Addr },
    #[serde(rename = "AAAA")]
    Aaaa { address: Ipv6Addr },
    #[serde(rename = "CNAME")]
    Cname { target: HostnameDot },
    #[serde(rename = "MX")]
    Mx { preference: u16, mx: HostnameDot },
    #[serde(rename = "NS")]
    Ns { target: HostnameDot },
    #[serde(rename = "PTR")]
    Ptr { target: HostnameDot },
    /// One logical string; segmentation happens when rendering
    #[serde(rename = "TXT")]
    Txt { txt: String },
    #[serde(rename = "SRV")]
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: HostnameDot,
    },
    #[serde(rename = "CAA")]
    Caa { flag: u8, tag: String, value: String },
    #[serde(rename = "TLSA")]
    Tlsa {
        usage: u8,
        selector: u8,
        matching_type: u8,
        certificate: String,
    },
    #[serde(rename = "SSHFP")]
    Sshfp {
        algorithm: u8,
        fingerprint_type: u8,
        fingerprint: String,
    },
    #[serde(rename = "DS")]
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: String,
    },
    #[serde(rename = "DNSKEY")]
    Dnskey {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: String,
    },
    #[serde(rename = "NAPTR")]
    Naptr {
        order: u16,
        preference: u16,
        flags: String,
        service: String,
        regexp: String,
        replacement: HostnameDot,
    },
    #[serde(rename = "LOC")]
    Loc(Loc),
    #[serde(rename = "HTTPS")]
    Https(SvcbData),
    #[serde(rename = "SVCB")]
    Svcb(SvcbData),
    #[serde(rename = "ALIAS")]
    Alias { target: HostnameDot },
    #[serde(rename = "SOA")]
    Soa {
        ns: HostnameDot,
        mbox: HostnameDot,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minttl: u32,
    },
    #[serde(rename = "R53_ALIAS")]
    R53Alias {
        /// The aliased record type (`A`, `AAAA`, `CNAME`, ...)
        alias_type: String,
        target: String,
        zone_id: Option<String>,
    },
    #[serde(rename = "AZURE_ALIAS")]
    AzureAlias { alias_type: String, target: String },
    #[serde(rename = "CF_SINGLE_REDIRECT")]
    CfSingleRedirect {
        rule_name: String,
        code: u16,
        when: String,
        then: String,
    },
    #[serde(rename = "AKAMAICDN")]
    AkamaiCdn { target: String },
    #[serde(rename = "AKAMAITLC")]
    AkamaiTlc { answer_type: String, dns_name: String },
    #[serde(rename = "PAGE_RULE")]
    PageRule {
        from: String,
        to: String,
        priority: u32,
        code: u16,
    },
    #[serde(rename = "URL")]
    Url { target: String },
    #[serde(rename = "URL301")]
    Url301 { target: String },
    #[serde(rename = "FRAME")]
    Frame { target: String },
    #[serde(rename = "NAMESERVER")]
    Nameserver { target: HostnameDot },
    #[serde(rename = "IMPORT_TRANSFORM")]
    ImportTransform { zone: String, transform: String },
}

impl RecordData {
    /// Build a payload from positional arguments (the label excluded)
    ///
    /// Hostnames are resolved against `origin`. Argument count is checked
    /// strictly except where a type takes a free-form tail (TXT, SVCB params).
    pub fn from_args(rtype: RecordType, args: &[String], origin: &str) -> Result<Self> {
        let token = rtype.as_str();
        let mut a = Args::new(token, args, origin);
        let data = match rtype {
            RecordType::A => RecordData::A {
                address: a.next("address")?,
            },
            RecordType::Aaaa => RecordData::Aaaa {
                address: a.next("address")?,
            },
            RecordType::Cname => RecordData::Cname {
                target: a.next("target")?,
            },
            RecordType::Ns => RecordData::Ns {
                target: a.next("target")?,
            },
            RecordType::Ptr => RecordData::Ptr {
                target: a.next("target")?,
            },
            RecordType::Alias => RecordData::Alias {
                target: a.next("target")?,
            },
            RecordType::Nameserver => RecordData::Nameserver {
                target: a.next("target")?,
            },
            RecordType::Mx => RecordData::Mx {
                preference: a.next("preference")?,
                mx: a.next("mx")?,
            },
            RecordType::Txt => {
                if args.is_empty() {
                    return Err(Error::parse("", "TXT record is missing field txt"));
                }
                // multiple strings are one logical value
                return Ok(RecordData::Txt { txt: args.concat() });
            }
            RecordType::Srv => RecordData::Srv {
                priority: a.next("priority")?,
                weight: a.next("weight")?,
                port: a.next("port")?,
                target: a.next("target")?,
            },
            RecordType::Caa => {
                let flag = a.next("flag")?;
                let tag: String = a.next("tag")?;
                if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return Err(Error::parse(tag, "CAA tag must be alphanumeric"));
                }
                RecordData::Caa {
                    flag,
                    tag: tag.to_ascii_lowercase(),
                    value: a.next("value")?,
                }
            }
            RecordType::Tlsa => RecordData::Tlsa {
                usage: a.next("usage")?,
                selector: a.next("selector")?,
                matching_type: a.next("matching_type")?,
                certificate: a.next("certificate")?,
            },
            RecordType::Sshfp => RecordData::Sshfp {
                algorithm: a.next("algorithm")?,
                fingerprint_type: a.next("fingerprint_type")?,
                fingerprint: a.next("fingerprint")?,
            },
            RecordType::Ds => RecordData::Ds {
                key_tag: a.next("key_tag")?,
                algorithm: a.next("algorithm")?,
                digest_type: a.next("digest_type")?,
                digest: a.next("digest")?,
            },
            RecordType::Dnskey => RecordData::Dnskey {
                flags: a.next("flags")?,
                protocol: a.next("protocol")?,
                algorithm: a.next("algorithm")?,
                public_key: a.next("public_key")?,
            },
            RecordType::Naptr => RecordData::Naptr {
                order: a.next("order")?,
                preference: a.next("preference")?,
                flags: a.next("flags")?,
                service: a.next("service")?,
                regexp: a.next("regexp")?,
                replacement: a.next("replacement")?,
            },
            RecordType::Loc => {
                if args.is_empty() {
                    return Err(Error::parse("", "LOC record is missing its location"));
                }
                return Ok(RecordData::Loc(Loc::parse(&args.join(" "))?));
            }
            RecordType::Https | RecordType::Svcb => {
                let priority = a.next("priority")?;
                let target = a.next("target")?;
                let rest = args[args.len() - a.remaining()..].join(" ");
                let svcb = SvcbData {
                    priority,
                    target,
                    params: rest.trim().to_string(),
                };
                return Ok(if rtype == RecordType::Https {
                    RecordData::Https(svcb)
                } else {
                    RecordData::Svcb(svcb)
                });
            }
            RecordType::Soa => RecordData::Soa {
                ns: a.next("ns")?,
                mbox: a.next("mbox")?,
                serial: a.next("serial")?,
                refresh: a.next("refresh")?,
                retry: a.next("retry")?,
                expire: a.next("expire")?,
                minttl: a.next("minttl")?,
            },
            RecordType::R53Alias => RecordData::R53Alias {
                alias_type: a.next::<String>("alias_type")?.to_ascii_uppercase(),
                target: a.next("target")?,
                zone_id: a.next_opt("zone_id")?.filter(|z: &String| !z.is_empty()),
            },
            RecordType::AzureAlias => RecordData::AzureAlias {
                alias_type: a.next::<String>("alias_type")?.to_ascii_uppercase(),
                target: a.next("target")?,
            },
            RecordType::CfSingleRedirect => RecordData::CfSingleRedirect {
                rule_name: a.next("rule_name")?,
                code: a.next("code")?,
                when: a.next("when")?,
                then: a.next("then")?,
            },
            RecordType::AkamaiCdn => RecordData::AkamaiCdn {
                target: a.next("target")?,
            },
            RecordType::AkamaiTlc => RecordData::AkamaiTlc {
                answer_type: a.next("answer_type")?,
                dns_name: a.next("dns_name")?,
            },
            RecordType::PageRule => RecordData::PageRule {
                from: a.next("from")?,
                to: a.next("to")?,
                priority: a.next("priority")?,
                code: a.next("code")?,
            },
            RecordType::Url => RecordData::Url {
                target: a.next("target")?,
            },
            RecordType::Url301 => RecordData::Url301 {
                target: a.next("target")?,
            },
            RecordType::Frame => RecordData::Frame {
                target: a.next("target")?,
            },
            RecordType::ImportTransform => RecordData::ImportTransform {
                zone: a.next("zone")?,
                transform: a.next("transform")?,
            },
        };
        a.finish()?;
        Ok(data)
    }

    /// The record type of this payload
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A { .. } => RecordType::A,
            RecordData::Aaaa { .. } => RecordType::Aaaa,
            RecordData::Cname { .. } => RecordType::Cname,
            RecordData::Mx { .. } => RecordType::Mx,
            RecordData::Ns { .. } => RecordType::Ns,
            RecordData::Ptr { .. } => RecordType::Ptr,
            RecordData::Txt { .. } => RecordType::Txt,
            RecordData::Srv { .. } => RecordType::Srv,
            RecordData::Caa { .. } => RecordType::Caa,
            RecordData::Tlsa { .. } => RecordType::Tlsa,
            RecordData::Sshfp { .. } => RecordType::Sshfp,
            RecordData::Ds { .. } => RecordType::Ds,
            RecordData::Dnskey { .. } => RecordType::Dnskey,
            RecordData::Naptr { .. } => RecordType::Naptr,
            RecordData::Loc(_) => RecordType::Loc,
            RecordData::Https(_) => RecordType::Https,
            RecordData::Svcb(_) => RecordType::Svcb,
            RecordData::Alias { .. } => RecordType::Alias,
            RecordData::Soa { .. } => RecordType::Soa,
            RecordData::R53Alias { .. } => RecordType::R53Alias,
            RecordData::AzureAlias { .. } => RecordType::AzureAlias,
            RecordData::CfSingleRedirect { .. } => RecordType::CfSingleRedirect,
            RecordData::AkamaiCdn { .. } => RecordType::AkamaiCdn,
            RecordData::AkamaiTlc { .. } => RecordType::AkamaiTlc,
            RecordData::PageRule { .. } => RecordType::PageRule,
            RecordData::Url { .. } => RecordType::Url,
            RecordData::Url301 { .. } => RecordType::Url301,
            RecordData::Frame { .. } => RecordType::Frame,
            RecordData::Nameserver { .. } => RecordType::Nameserver,
            RecordData::ImportTransform { .. } => RecordType::ImportTransform,
        }
    }

    /// Legacy single-string view of the payload's principal value
    pub fn target(&self) -> String {
        match self {
            RecordData::A { address } => address.to_string(),
            RecordData::Aaaa { address } => address.to_string(),
            RecordData::Cname { target }
            | RecordData::Ns { target }
            | RecordData::Ptr { target }
            | RecordData::Alias { target }
            | RecordData::Nameserver { target } => target.to_string(),
            RecordData::Mx { mx, .. } => mx.to_string(),
            RecordData::Txt { txt } => txt.clone(),
            RecordData::Srv { target, .. } => target.to_string(),
            RecordData::Caa { value, .. } => value.clone(),
            RecordData::Tlsa { certificate, .. } => certificate.clone(),
            RecordData::Sshfp { fingerprint, .. } => fingerprint.clone(),
            RecordData::Ds { digest, .. } => digest.clone(),
            RecordData::Dnskey { public_key, .. } => public_key.clone(),
            RecordData::Naptr { replacement, .. } => replacement.to_string(),
            RecordData::Loc(loc) => loc.to_string(),
            RecordData::Https(svcb) | RecordData::Svcb(svcb) => svcb.target.to_string(),
            RecordData::Soa { ns, .. } => ns.to_string(),
            RecordData::R53Alias { target, .. } | RecordData::AzureAlias { target, .. } => {
                target.clone()
            }
            RecordData::CfSingleRedirect { then, .. } => then.clone(),
            RecordData::AkamaiCdn { target }
            | RecordData::Url { target }
            | RecordData::Url301 { target }
            | RecordData::Frame { target } => target.clone(),
            RecordData::AkamaiTlc { dns_name, .. } => dns_name.clone(),
            RecordData::PageRule { to, .. } => to.clone(),
            RecordData::ImportTransform { zone, .. } => zone.clone(),
        }
    }

    /// Presentation-format rdata (everything after the type in a zone file line)
    pub fn rdata(&self) -> String {
        match self {
            RecordData::Mx { preference, mx } => format!("{preference} {mx}"),
            RecordData::Txt { txt } => quote_segments(txt),
            RecordData::Srv {
                priority,
                weight,
                port,
                target,
            } => format!("{priority} {weight} {port} {target}"),
            RecordData::Caa { flag, tag, value } => format!("{flag} {tag} {}", quote(value)),
            RecordData::Tlsa {
                usage,
                selector,
                matching_type,
                certificate,
            } => format!("{usage} {selector} {matching_type} {certificate}"),
            RecordData::Sshfp {
                algorithm,
                fingerprint_type,
                fingerprint,
            } => format!("{algorithm} {fingerprint_type} {fingerprint}"),
            RecordData::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => format!("{key_tag} {algorithm} {digest_type} {digest}"),
            RecordData::Dnskey {
                flags,
                protocol,
                algorithm,
                public_key,
            } => format!("{flags} {protocol} {algorithm} {public_key}"),
            RecordData::Naptr {
                order,
                preference,
                flags,
                service,
                regexp,
                replacement,
            } => format!(
                "{order} {preference} {} {} {} {replacement}",
                quote(flags),
                quote(service),
                quote(regexp)
            ),
            RecordData::Https(svcb) | RecordData::Svcb(svcb) => {
                if svcb.params.is_empty() {
                    format!("{} {}", svcb.priority, svcb.target)
                } else {
                    format!("{} {} {}", svcb.priority, svcb.target, svcb.params)
                }
            }
            RecordData::Soa {
                ns,
                mbox,
                serial,
                refresh,
                retry,
                expire,
                minttl,
            } => format!("{ns} {mbox} {serial} {refresh} {retry} {expire} {minttl}"),
            RecordData::R53Alias {
                alias_type,
                target,
                zone_id,
            } => match zone_id {
                Some(zone_id) => format!("{alias_type} {target} {zone_id}"),
                None => format!("{alias_type} {target}"),
            },
            RecordData::AzureAlias { alias_type, target } => format!("{alias_type} {target}"),
            RecordData::CfSingleRedirect {
                rule_name,
                code,
                when,
                then,
            } => format!("{} {code} {} {}", quote(rule_name), quote(when), quote(then)),
            RecordData::AkamaiTlc {
                answer_type,
                dns_name,
            } => format!("{answer_type} {dns_name}"),
            RecordData::PageRule {
                from,
                to,
                priority,
                code,
            } => format!("{from} {to} {priority} {code}"),
            RecordData::ImportTransform { zone, transform } => format!("{zone} {}", quote(transform)),
            other => other.target(),
        }
    }

    /// The hostname a hostname-valued payload points at
    pub fn hostname_target(&self) -> Option<&HostnameDot> {
        match self {
            RecordData::Cname { target }
            | RecordData::Ns { target }
            | RecordData::Ptr { target }
            | RecordData::Alias { target }
            | RecordData::Nameserver { target } => Some(target),
            RecordData::Mx { mx, .. } => Some(mx),
            RecordData::Srv { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Rewrite the target of hostname-valued types (normalizer use only)
    pub(crate) fn map_hostname_target(&mut self, f: impl Fn(&str) -> String) {
        match self {
            RecordData::Cname { target }
            | RecordData::Ns { target }
            | RecordData::Ptr { target }
            | RecordData::Alias { target } => target.map(|t| f(t)),
            RecordData::Mx { mx, .. } => mx.map(|t| f(t)),
            RecordData::R53Alias { target, .. } | RecordData::AzureAlias { target, .. } => {
                *target = f(target);
            }
            _ => {}
        }
    }
}

/// Quote a character-string, escaping `"` and `\`
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Maximum octets in one DNS character-string
pub const TXT_SEGMENT_MAX: usize = 255;

/// Split a logical TXT value into segments of at most 255 octets
///
/// Splits never fall inside a multi-byte character. The empty string yields
/// one empty segment.
pub fn segment_txt(txt: &str) -> Vec<String> {
    if txt.is_empty() {
        return vec![String::new()];
    }
    let mut segments = Vec::new();
    let mut rest = txt;
    while !rest.is_empty() {
        let mut cut = rest.len().min(TXT_SEGMENT_MAX);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        segments.push(head.to_string());
        rest = tail;
    }
    segments
}

fn quote_segments(txt: &str) -> String {
    segment_txt(txt)
        .iter()
        .map(|s| quote(s))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokens_round_trip() {
        for t in RecordType::ALL {
            assert_eq!(t.as_str().parse::<RecordType>().unwrap(), *t);
        }
        assert!(matches!(
            "BOGUS".parse::<RecordType>(),
            Err(Error::UnknownRecordType(_))
        ));
    }

    #[test]
    fn mx_and_srv_from_args() {
        let mx = RecordData::from_args(RecordType::Mx, &args(&["10", "mail"]), "example.com").unwrap();
        assert_eq!(mx.rdata(), "10 mail.example.com.");
        assert_eq!(mx.target(), "mail.example.com.");

        let srv = RecordData::from_args(
            RecordType::Srv,
            &args(&["1", "2", "5060", "sip.example.net."]),
            "example.com",
        )
        .unwrap();
        assert_eq!(srv.rdata(), "1 2 5060 sip.example.net.");
        assert!(RecordData::from_args(RecordType::Srv, &args(&["1", "2"]), "example.com").is_err());
    }

    #[test]
    fn arity_is_strict() {
        assert!(RecordData::from_args(RecordType::A, &args(&["1.2.3.4", "x"]), "example.com").is_err());
        assert!(RecordData::from_args(RecordType::A, &args(&[]), "example.com").is_err());
    }

    #[test]
    fn txt_joins_segments_into_one_value() {
        let txt = RecordData::from_args(RecordType::Txt, &args(&["abc", "def"]), "example.com").unwrap();
        assert_eq!(txt.target(), "abcdef");
        assert_eq!(txt.rdata(), "\"abcdef\"");
    }

    #[test]
    fn caa_renders_quoted_value() {
        let caa = RecordData::from_args(
            RecordType::Caa,
            &args(&["0", "ISSUE", "letsencrypt.org"]),
            "example.com",
        )
        .unwrap();
        assert_eq!(caa.rdata(), "0 issue \"letsencrypt.org\"");
    }

    #[test]
    fn svcb_keeps_param_tail() {
        let https = RecordData::from_args(
            RecordType::Https,
            &args(&["1", ".", "alpn=h2,h3", "port=443"]),
            "example.com",
        )
        .unwrap();
        assert_eq!(https.rdata(), "1 . alpn=h2,h3 port=443");
    }

    #[test]
    fn segmentation_respects_char_boundaries() {
        let segs = segment_txt(&"a".repeat(600));
        assert_eq!(segs.iter().map(String::len).collect::<Vec<_>>(), vec![255, 255, 90]);

        let wide = "é".repeat(200);
        for seg in segment_txt(&wide) {
            assert!(seg.len() <= TXT_SEGMENT_MAX);
        }
        assert_eq!(segment_txt(&wide).concat(), wide);
    }

    #[test]
    fn payload_json_is_tagged() {
        let a = RecordData::from_args(RecordType::A, &args(&["1.2.3.4"]), "example.com").unwrap();
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "A");
        assert_eq!(json["fields"]["address"], "1.2.3.4");
        let back: RecordData = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }
}
