//! Label algebra: short labels, subdomains and FQDNs
//!
//! Inside zonectl a record's short name is relative to its zone (`"@"` for
//! the apex) and its FQDN never carries a trailing dot.

use crate::error::{Error, Result};

/// Suffixes whose labels are always treated as fully qualified
const REVERSE_SUFFIXES: [&str; 2] = [".in-addr.arpa", ".ip6.arpa"];

/// Resolve a short label within an optional subdomain of `origin`
///
/// Returns `(short, fqdn)`. `origin` must be non-empty, lowercase and have no
/// trailing dot.
///
/// # Rules
///
/// - `"."` is rejected
/// - a label ending in `"."` must be `origin.` (becomes `"@"`) or end in
///   `.origin.` (the origin is stripped)
/// - with a subdomain, `"@"` or `""` becomes the subdomain, anything else
///   becomes `short.subdomain`
/// - reverse-DNS names (`*.in-addr.arpa`, `*.ip6.arpa`) are FQDNs even
///   without a trailing dot
pub fn parse_label3(short: &str, subdomain: &str, origin: &str) -> Result<(String, String)> {
    if origin.is_empty() {
        return Err(Error::parse(short, "origin must not be empty"));
    }
    if origin.ends_with('.') {
        return Err(Error::parse(origin, "origin must not end with a dot"));
    }
    if origin.chars().any(|c| c.is_uppercase()) {
        return Err(Error::parse(origin, "origin must be lowercase"));
    }
    if short == "." {
        return Err(Error::parse(short, "label \".\" is not valid"));
    }

    let mut short = short.to_string();
    let is_reverse = REVERSE_SUFFIXES
        .iter()
        .any(|suffix| short.to_ascii_lowercase().ends_with(suffix));
    if is_reverse && !short.ends_with('.') {
        short.push('.');
    }

    if short.ends_with('.') {
        let lower = short.to_ascii_lowercase();
        let apex = format!("{origin}.");
        let suffix = format!(".{origin}.");
        if lower == apex {
            return Ok(("@".to_string(), origin.to_string()));
        }
        if lower.ends_with(&suffix) {
            let rel = &short[..short.len() - suffix.len()];
            return Ok((rel.to_string(), format!("{rel}.{origin}")));
        }
        return Err(Error::parse(
            short,
            format!("fully qualified label is not within zone {origin}"),
        ));
    }

    if !subdomain.is_empty() {
        short = if short.is_empty() || short == "@" {
            subdomain.to_string()
        } else {
            format!("{short}.{subdomain}")
        };
    }

    if short.is_empty() || short == "@" {
        return Ok(("@".to_string(), origin.to_string()));
    }
    let fqdn = format!("{short}.{origin}");
    Ok((short, fqdn))
}

/// Build the FQDN (no trailing dot) of a short label
pub fn make_fqdn(short: &str, origin: &str) -> String {
    if short == "@" || short.is_empty() {
        origin.to_string()
    } else {
        format!("{short}.{origin}")
    }
}

/// Shorten an FQDN (with or without trailing dot) relative to `origin`
///
/// Names outside the zone are returned unchanged, without trailing dot.
pub fn shorten_fqdn(fqdn: &str, origin: &str) -> String {
    let fqdn = fqdn.trim_end_matches('.');
    if fqdn.eq_ignore_ascii_case(origin) {
        return "@".to_string();
    }
    let suffix = format!(".{origin}");
    if fqdn.len() > suffix.len() && fqdn.to_ascii_lowercase().ends_with(&suffix) {
        return fqdn[..fqdn.len() - suffix.len()].to_string();
    }
    fqdn.to_string()
}
