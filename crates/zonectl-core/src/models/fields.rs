//! Typed scalar fields and their parsers
//!
//! Every field of a record payload is parsed through [`FieldParse`]. Parsers
//! are strict and total: they return a validated value or an
//! [`Error::Parse`] tagged with the offending input.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Maximum length of a presentation-format domain name including the root dot
const MAX_NAME_LEN: usize = 254;

/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

/// Parse a raw string into a typed field, resolving relative names against `origin`
pub trait FieldParse: Sized {
    /// Parse `raw`; `origin` is the zone (no trailing dot) for relative hostnames
    fn parse_field(raw: &str, origin: &str) -> Result<Self>;
}

fn parse_unsigned<T: FromStr>(raw: &str, kind: &str) -> Result<T> {
    if raw.is_empty() {
        return Err(Error::parse(raw, format!("empty {kind}")));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::parse(raw, format!("{kind} must be decimal digits only")));
    }
    raw.parse::<T>()
        .map_err(|_| Error::parse(raw, format!("{kind} out of range")))
}

impl FieldParse for u8 {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        parse_unsigned(raw, "uint8")
    }
}

impl FieldParse for u16 {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        parse_unsigned(raw, "uint16")
    }
}

impl FieldParse for u32 {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        parse_unsigned(raw, "uint32")
    }
}

impl FieldParse for String {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

impl FieldParse for bool {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        match raw {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" | "" => Ok(false),
            _ => Err(Error::parse(raw, "expected a boolean")),
        }
    }
}

/// IPv4 accepts dotted-quad and a bare 32-bit integer
impl FieldParse for Ipv4Addr {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        if let Ok(ip) = raw.parse::<Ipv4Addr>() {
            return Ok(ip);
        }
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw
                .parse::<u32>()
                .map(Ipv4Addr::from)
                .map_err(|_| Error::parse(raw, "integer IPv4 address out of range"));
        }
        Err(Error::parse(raw, "invalid IPv4 address"))
    }
}

impl FieldParse for Ipv6Addr {
    fn parse_field(raw: &str, _origin: &str) -> Result<Self> {
        raw.parse::<Ipv6Addr>()
            .map_err(|_| Error::parse(raw, "invalid IPv6 address"))
    }
}

/// A hostname in absolute form, always ending with `"."`
///
/// The single-dot name `"."` is legal (null MX, null SRV target); auditors
/// decide whether a provider accepts it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostnameDot(String);

impl HostnameDot {
    /// Parse a hostname relative to `origin`
    ///
    /// - `"@"` becomes `origin.`
    /// - a name ending with `"."` is taken as absolute
    /// - anything else is relative: `name.origin.`
    pub fn parse(raw: &str, origin: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::parse(raw, "empty hostname"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(Error::parse(raw, "hostname contains whitespace"));
        }
        let origin = origin.trim_end_matches('.');
        let absolute = if raw == "." {
            ".".to_string()
        } else if raw == "@" {
            if origin.is_empty() {
                return Err(Error::parse(raw, "\"@\" used without an origin"));
            }
            format!("{origin}.")
        } else if raw.ends_with('.') {
            raw.to_string()
        } else if origin.is_empty() {
            format!("{raw}.")
        } else {
            format!("{raw}.{origin}.")
        };
        Self::validate(&absolute).map_err(|reason| Error::parse(raw, reason))?;
        Ok(Self(absolute))
    }

    /// Wrap an already-absolute name (used when reading from providers)
    pub fn absolute(raw: &str) -> Result<Self> {
        if raw.ends_with('.') {
            Self::parse(raw, "")
        } else {
            Self::parse(&format!("{raw}."), "")
        }
    }

    fn validate(name: &str) -> std::result::Result<(), String> {
        if name == "." {
            return Ok(());
        }
        if name.len() > MAX_NAME_LEN {
            return Err(format!("hostname longer than {MAX_NAME_LEN} octets"));
        }
        let body = name.trim_end_matches('.');
        for label in body.split('.') {
            if label.is_empty() {
                return Err("hostname has an empty label".to_string());
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(format!("label {label:?} longer than {MAX_LABEL_LEN} octets"));
            }
        }
        Ok(())
    }

    /// The absolute form, with trailing dot
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its trailing dot
    pub fn without_dot(&self) -> &str {
        if self.0 == "." {
            "."
        } else {
            self.0.trim_end_matches('.')
        }
    }

    /// Whether this is the null name `"."`
    pub fn is_null(&self) -> bool {
        self.0 == "."
    }

    /// Rewrite the name in place (normalizer use only)
    pub(crate) fn map(&mut self, f: impl FnOnce(&str) -> String) {
        let mapped = f(&self.0);
        self.0 = mapped;
    }
}

impl FieldParse for HostnameDot {
    fn parse_field(raw: &str, origin: &str) -> Result<Self> {
        HostnameDot::parse(raw, origin)
    }
}

impl fmt::Display for HostnameDot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HostnameDot {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        HostnameDot::absolute(&value)
    }
}

impl From<HostnameDot> for String {
    fn from(value: HostnameDot) -> Self {
        value.0
    }
}

/// Positional argument cursor used by the payload parsers
pub(crate) struct Args<'a> {
    args: &'a [String],
    origin: &'a str,
    pos: usize,
    rtype: &'a str,
}

impl<'a> Args<'a> {
    pub(crate) fn new(rtype: &'a str, args: &'a [String], origin: &'a str) -> Self {
        Self {
            args,
            origin,
            pos: 0,
            rtype,
        }
    }

    /// Parse the next positional argument as `T`
    pub(crate) fn next<T: FieldParse>(&mut self, field: &str) -> Result<T> {
        let raw = self.args.get(self.pos).ok_or_else(|| {
            Error::parse(
                self.args.join(" "),
                format!("{} record is missing field {field}", self.rtype),
            )
        })?;
        self.pos += 1;
        T::parse_field(raw, self.origin).map_err(|e| match e {
            Error::Parse { input, reason } => Error::Parse {
                input,
                reason: format!("{} field {field}: {reason}", self.rtype),
            },
            other => other,
        })
    }

    /// Parse the next argument if present
    pub(crate) fn next_opt<T: FieldParse>(&mut self, field: &str) -> Result<Option<T>> {
        if self.pos >= self.args.len() {
            return Ok(None);
        }
        self.next(field).map(Some)
    }

    /// Number of arguments not yet consumed
    pub(crate) fn remaining(&self) -> usize {
        self.args.len().saturating_sub(self.pos)
    }

    /// Fail if unconsumed arguments remain
    pub(crate) fn finish(self) -> Result<()> {
        if self.pos < self.args.len() {
            return Err(Error::parse(
                self.args.join(" "),
                format!(
                    "{} record takes {} field(s), got {}",
                    self.rtype,
                    self.pos,
                    self.args.len()
                ),
            ));
        }
        Ok(())
    }
}
