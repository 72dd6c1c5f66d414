//! Contract Test: Record Model
//!
//! Constraints verified:
//! - Every registered type can be populated from positional arguments
//! - FQDNs never carry a trailing dot and the apex is always `"@"`
//! - Normalization is idempotent
//! - TXT values round-trip and segment at 255 octets
//!
//! If this test fails, configuration records will not reach the diff
//! engine in canonical form.

mod common;

use common::*;
use serde_json::{Value, json};
use zonectl_core::audit::{RecordAuditor, rejectif};
use zonectl_core::models::RawRecordConfig;
use zonectl_core::normalize::normalize_records;
use zonectl_core::{RecordType, TypeRegistry};

/// Label and fields accepted for each type
fn sample_args(rtype: RecordType) -> Vec<&'static str> {
    match rtype {
        RecordType::A => vec!["@", "192.0.2.1"],
        RecordType::Aaaa => vec!["@", "2001:db8::1"],
        RecordType::Cname => vec!["www", "web.example.net."],
        RecordType::Mx => vec!["@", "10", "mail"],
        RecordType::Ns => vec!["sub", "ns1.example.net."],
        RecordType::Ptr => vec!["1", "host.example.net."],
        RecordType::Txt => vec!["@", "v=spf1 -all"],
        RecordType::Srv => vec!["_sip._tcp", "10", "20", "5060", "sip.example.net."],
        RecordType::Caa => vec!["@", "0", "issue", "letsencrypt.org"],
        RecordType::Tlsa => vec!["_443._tcp", "3", "1", "1", "abcdef0123"],
        RecordType::Sshfp => vec!["host", "1", "2", "abcdef0123"],
        RecordType::Ds => vec!["child", "12345", "13", "2", "ABCDEF0123"],
        RecordType::Dnskey => vec!["@", "257", "3", "13", "AwEAAb=="],
        RecordType::Naptr => vec!["@", "100", "10", "U", "E2U+sip", "!^.*$!sip:info@example.com!", "."],
        RecordType::Loc => vec!["office", "51 30 12.748 N 0 7 39.611 W 0.00m"],
        RecordType::Https => vec!["@", "1", ".", "alpn=h2"],
        RecordType::Svcb => vec!["_svc", "1", "svc.example.net.", "port=8443"],
        RecordType::Alias => vec!["@", "lb.example.net."],
        RecordType::Soa => vec![
            "@",
            "ns1.example.net.",
            "hostmaster.example.net.",
            "2024010101",
            "7200",
            "3600",
            "1209600",
            "300",
        ],
        RecordType::R53Alias => vec!["@", "A", "lb-123.elb.amazonaws.com", "Z2ABC"],
        RecordType::AzureAlias => vec!["@", "A", "/subscriptions/s/resourceGroups/g/ip/p"],
        RecordType::CfSingleRedirect => vec!["@", "to-www", "301", "http.host eq \"example.com\"", "concat(\"https://www\", http.request.uri.path)"],
        RecordType::AkamaiCdn => vec!["@", "edge.example.net"],
        RecordType::AkamaiTlc => vec!["@", "DUAL", "edge.example.net"],
        RecordType::PageRule => vec!["@", "example.com/*", "https://www.example.com/$1", "1", "301"],
        RecordType::Url | RecordType::Url301 | RecordType::Frame => vec!["go", "https://example.net/"],
        RecordType::Nameserver => vec!["@", "ns1.example.net."],
        RecordType::ImportTransform => vec!["@", "other.com", "0.0.0.0 ~ 1.1.1.1 ~ 2.2.2.2"],
    }
}

fn raw(rtype: RecordType, args: &[&str]) -> RawRecordConfig {
    RawRecordConfig {
        rtype: rtype.as_str().to_string(),
        args: args.iter().map(|a| Value::String(a.to_string())).collect(),
        ttl: 300,
        ..RawRecordConfig::default()
    }
}

#[test]
fn every_registered_type_populates_from_raw() {
    let registry = TypeRegistry::global();
    let registered: Vec<RecordType> = registry.types().collect();
    assert_eq!(registered.len(), RecordType::ALL.len());

    for rtype in registered {
        let rc = registry
            .populate_from_raw(&raw(rtype, &sample_args(rtype)), ZONE)
            .unwrap_or_else(|e| panic!("{rtype}: {e}"));
        assert_eq!(rc.rtype(), rtype);
        assert!(!rc.rdata().is_empty(), "{rtype} renders empty rdata");
    }
}

#[test]
fn missing_and_surplus_fields_are_rejected() {
    let registry = TypeRegistry::global();
    assert!(registry.populate_from_raw(&raw(RecordType::Mx, &["@", "10"]), ZONE).is_err());
    assert!(
        registry
            .populate_from_raw(&raw(RecordType::A, &["@", "192.0.2.1", "extra"]), ZONE)
            .is_err()
    );
    assert!(registry.populate_from_raw(&raw(RecordType::Mx, &["@", "-1", "mail"]), ZONE).is_err());
}

#[test]
fn numeric_json_arguments_are_accepted() {
    let rc: RawRecordConfig = serde_json::from_value(json!({
        "type": "MX",
        "args": ["@", 20, "mail.example.com."],
        "ttl": 600,
    }))
    .unwrap();
    let rc = TypeRegistry::global().populate_from_raw(&rc, ZONE).unwrap();
    assert_eq!(rc.rdata(), "20 mail.example.com.");
    assert_eq!(rc.ttl, 600);
}

#[test]
fn names_never_carry_a_trailing_dot() {
    let registry = TypeRegistry::global();
    for label in ["@", "", "www", "a.b", "example.com.", "deep.example.com.", "WWW"] {
        let rc = registry
            .populate_from_raw(&raw(RecordType::A, &[label, "192.0.2.1"]), ZONE)
            .unwrap();
        assert!(!rc.name_fqdn.ends_with('.'), "{label:?}");
        assert_eq!(rc.name == "@", rc.name_fqdn == ZONE, "{label:?}");
    }
}

#[test]
fn labels_outside_the_zone_are_rejected() {
    let err = TypeRegistry::global()
        .populate_from_raw(&raw(RecordType::A, &["www.example.net.", "192.0.2.1"]), ZONE)
        .unwrap_err();
    assert!(err.to_string().contains("not within zone"));
}

#[test]
fn normalization_is_idempotent() {
    let mut records = vec![
        a("WWW", "1.2.3.4", 0),
        cname("Shop", "Store.Example.NET.", 60),
        mx("@", 10, "MAIL.example.com.", 300),
        txt("_dmarc", "v=DMARC1; p=none", 0),
    ];
    records[0].name_fqdn = "WWW.example.com".to_string();

    normalize_records(&mut records, ZONE, 300).unwrap();
    let once: Vec<String> = records.iter().map(|r| format!("{} {}", r.name_fqdn, r)).collect();
    normalize_records(&mut records, ZONE, 300).unwrap();
    let twice: Vec<String> = records.iter().map(|r| format!("{} {}", r.name_fqdn, r)).collect();

    assert_eq!(once, twice);
    assert_eq!(records[0].name, "www");
    assert_eq!(records[0].ttl, 300);
    assert_eq!(records[1].target(), "store.example.net.");
}

#[test]
fn txt_round_trip_and_segmentation() {
    let mut rc = txt("@", "placeholder", 300);
    rc.set_target_txt("x");
    assert_eq!(rc.target_txt_joined(), "x");

    rc.set_target_txt("y".repeat(600));
    let lengths: Vec<usize> = rc.target_txt_segmented().iter().map(String::len).collect();
    assert_eq!(lengths, vec![255, 255, 90]);
    assert_eq!(rc.target_txt_joined().len(), 600);
}

#[test]
fn multiple_txt_strings_form_one_logical_value() {
    let rc = TypeRegistry::global()
        .populate_from_raw(&raw(RecordType::Txt, &["@", "part one ", "part two"]), ZONE)
        .unwrap();
    assert_eq!(rc.target_txt_joined(), "part one part two");
}

#[test]
fn txt_longer_than_rejects_oversized_values() {
    let mut auditor = RecordAuditor::new();
    auditor.add("TXT", rejectif::txt_longer_than(512));

    let ok = txt("@", &"A".repeat(512), 300);
    let too_long = txt("big", &"A".repeat(513), 300);
    assert!(auditor.audit(&[ok]).is_empty());
    let violations = auditor.audit(&[too_long]);
    assert_eq!(violations.len(), 1);
}

#[test]
fn auditor_only_checks_its_record_type() {
    let mut auditor = RecordAuditor::new();
    auditor.add("TXT", rejectif::txt_has_backticks);
    assert!(auditor.audit(&[a("www", "1.2.3.4", 300)]).is_empty());
    assert_eq!(auditor.audit(&[txt("@", "`cmd`", 300)]).len(), 1);
}
