//! Contract Test: Correction Pipeline
//!
//! Drives the engine against recording doubles and checks what was
//! executed, not only what was reported.
//!
//! Constraints verified:
//! - Preview never mutates anything
//! - Ignored records are neither created nor deleted
//! - Audit and capability failures stop the zone before any mutation
//! - A failing correction aborts its zone; other zones proceed
//! - Missing zones are created before records are written
//! - Delegation follows the nameservers gathered from providers
//! - Cancellation skips outstanding work
//! - Zones on providers without `CanConcur` run one at a time
//! - A correction past its deadline is reported, never dropped
//! - A slow zone listing does not hold up other providers
//!
//! If this test fails, a push may change more (or less) than its preview.

mod common;

use common::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zonectl_core::capabilities::{Capability, DocumentationNote, DocumentationNotes};
use zonectl_core::config::ConcurrencyMode;
use zonectl_core::engine::{Notifier, ZoneReport};
use zonectl_core::models::{DomainConfig, IgnoreName, IgnoreTarget, Nameserver, RecordConfig, RecordData};
use zonectl_core::registry::ProviderMetadata;
use zonectl_core::{EngineConfig, EngineEvent, RunMode, RunOptions};

fn a_in(zone: &str, short: &str, ip: &str) -> RecordConfig {
    RecordConfig::new(short, zone, 300, RecordData::A {
        address: ip.parse().unwrap(),
    })
    .unwrap()
}

fn bound_zone_named(zone: &str, records: Vec<RecordConfig>) -> DomainConfig {
    let mut dc = DomainConfig::new(zone);
    dc.records = records;
    dc.dns_providers.insert("mock".to_string(), 0);
    dc
}

#[tokio::test]
async fn preview_executes_nothing() {
    let provider = RecordingProvider::new().with_zone(ZONE, vec![a("old", "9.9.9.9", 300)]);
    let (engine, _rx) = engine(provider.clone());

    let report = engine
        .run(
            vec![bound_zone(vec![a("www", "1.2.3.4", 300)])],
            RunMode::Preview,
            RunOptions::default(),
        )
        .await;

    assert!(!report.any_failed());
    assert_eq!(report.total_changes(), 2);
    let corrections = &report.zones[0].providers[0].corrections;
    assert_eq!(corrections.len(), 2);
    assert!(corrections[0].starts_with("- DELETE A old"));
    assert!(corrections[1].starts_with("+ CREATE A www"));
    assert!(provider.applied().is_empty());
}

#[tokio::test]
async fn push_executes_deletes_before_creates() {
    let provider = RecordingProvider::new().with_zone(ZONE, vec![cname("www", "example.net.", 300)]);
    let (engine, _rx) = engine(provider.clone());

    let report = engine
        .run(
            vec![bound_zone(vec![a("www", "1.2.3.4", 300)])],
            RunMode::Push,
            RunOptions::default(),
        )
        .await;

    assert!(!report.any_failed());
    let applied = provider.applied();
    assert_eq!(applied.len(), 2);
    assert!(applied[0].starts_with("- DELETE CNAME www"));
    assert!(applied[1].starts_with("+ CREATE A www"));
}

#[tokio::test]
async fn ignored_records_survive_every_grouping() {
    for grouping in Grouping::ALL {
        let provider = RecordingProvider::new()
            .with_grouping(grouping)
            .with_zone(ZONE, vec![
                a("www", "1.2.3.4", 300),
                txt("_acme-challenge", "token", 300),
                cname("cdn", "edge.cdn-provider.net.", 300),
            ]);
        let (engine, _rx) = engine(provider.clone());

        let mut dc = bound_zone(vec![a("www", "1.2.3.4", 300)]);
        dc.ignored_names = vec![IgnoreName::new("_acme-challenge")];
        dc.ignored_targets = vec![IgnoreTarget {
            pattern: "*.cdn-provider.net".to_string(),
            rtype: "CNAME".to_string(),
        }];

        let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;
        assert!(!report.any_failed(), "{grouping:?}");
        assert_eq!(report.total_changes(), 0, "{grouping:?}");
        assert!(provider.applied().is_empty(), "{grouping:?}");
    }
}

#[tokio::test]
async fn desired_record_matching_an_ignore_rule_fails_the_zone() {
    let provider = RecordingProvider::new().with_zone(ZONE, vec![]);
    let (engine, _rx) = engine(provider.clone());

    let mut dc = bound_zone(vec![txt("_acme-challenge", "token", 300)]);
    dc.ignored_names = vec![IgnoreName::new("_acme-*")];

    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;
    assert!(report.any_failed());
    assert!(report.zones[0].error.as_deref().unwrap().contains("never converge"));
    assert_eq!(provider.read_calls(), 0);
}

#[tokio::test]
async fn apex_ns_of_single_host_provider_is_left_alone() {
    let provider = RecordingProvider::new().with_zone(ZONE, vec![
        ns("@", "ns1.registrar-dns.net.", 86400),
        ns("@", "ns2.registrar-dns.net.", 86400),
        a("www", "1.2.3.4", 300),
    ]);
    let (engine, _rx) = engine(provider.clone());

    let mut dc = bound_zone(vec![a("www", "1.2.3.4", 300)]);
    dc.nameservers = Nameserver::from_names(&["ns1.other.net"]);

    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;
    assert!(!report.any_failed());
    assert_eq!(report.total_changes(), 0);
    assert!(provider.applied().is_empty());
}

#[tokio::test]
async fn dual_host_provider_gets_apex_ns_for_every_nameserver() {
    let mut metadata = mock_metadata();
    metadata
        .features
        .insert(Capability::DocDualHost, DocumentationNote::can());
    let provider = RecordingProvider::new().with_zone(ZONE, vec![]);
    let (engine, _rx) = engine_with(provider.clone(), metadata, None, EngineConfig::default());

    let mut dc = bound_zone(vec![]);
    dc.nameservers = Nameserver::from_names(&["ns1.host.net", "ns2.other.net"]);

    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;
    assert!(!report.any_failed());
    let applied = provider.applied();
    assert_eq!(applied.len(), 2);
    assert!(applied.iter().all(|m| m.starts_with("+ CREATE NS @")));
    assert!(applied.iter().any(|m| m.contains("ns2.other.net.")));
}

#[tokio::test]
async fn audit_rejection_stops_the_zone_before_reading() {
    let provider = RecordingProvider::new()
        .with_strict_txt()
        .with_zone(ZONE, vec![a("old", "9.9.9.9", 300)]);
    let (engine, mut rx) = engine(provider.clone());

    let dc = bound_zone(vec![
        a("www", "1.2.3.4", 300),
        txt("@", "has a `backtick`", 300),
        txt("long", &"x".repeat(300), 300),
    ]);
    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;

    assert!(report.any_failed());
    let error = report.zones[0].error.as_deref().unwrap();
    assert!(error.contains("Audit rejected 2 record(s)"), "{error}");
    assert!(provider.applied().is_empty());
    assert_eq!(provider.read_calls(), 0);
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e, EngineEvent::ZoneFailed { .. }))
    );
}

#[tokio::test]
async fn capability_violation_names_the_missing_capability() {
    let metadata = ProviderMetadata {
        record_types: vec!["A".to_string(), "TXT".to_string()],
        ..mock_metadata()
    };
    let provider = RecordingProvider::new().with_zone(ZONE, vec![]);
    let (engine, _rx) = engine_with(provider.clone(), metadata, None, EngineConfig::default());

    let dc = bound_zone(vec![
        a("@", "1.2.3.4", 300),
        mx("@", 10, "mail.example.com.", 300),
    ]);
    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;

    assert!(report.any_failed());
    let error = report.zones[0].error.as_deref().unwrap();
    assert!(error.contains("CanUseMX"), "{error}");
    assert!(provider.applied().is_empty());
}

#[tokio::test]
async fn failing_correction_aborts_only_its_zone() {
    let provider = RecordingProvider::new()
        .failing_on("9.9.9.9")
        .with_zone(ZONE, vec![a("old", "9.9.9.9", 300)])
        .with_zone("example.org", vec![]);
    let (engine, mut rx) = engine(provider.clone());

    let zones = vec![
        bound_zone(vec![a("new", "1.1.1.1", 300)]),
        bound_zone_named("example.org", vec![a_in("example.org", "@", "5.5.5.5")]),
    ];
    let report = engine.run(zones, RunMode::Push, RunOptions::default()).await;

    assert!(report.any_failed());
    assert!(report.zones[0].failed());
    assert!(!report.zones[1].failed());
    assert_eq!(provider.applied(), vec!["+ CREATE A @ → 5.5.5.5 ttl=300".to_string()]);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::CorrectionFailed { zone, .. } if zone == ZONE
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::ZoneFinished { zone, changes: 1 } if zone == "example.org"
    )));
}

#[tokio::test]
async fn missing_zone_is_created_on_push_only() {
    let metadata = ProviderMetadata {
        lists_zones: true,
        creates_zones: true,
        ..mock_metadata()
    };

    let provider = RecordingProvider::new();
    let (engine, _rx) = engine_with(provider.clone(), metadata.clone(), None, EngineConfig::default());
    let report = engine
        .run(
            vec![bound_zone(vec![a("@", "1.2.3.4", 300)])],
            RunMode::Preview,
            RunOptions::default(),
        )
        .await;
    assert!(!report.any_failed());
    let corrections = &report.zones[0].providers[0].corrections;
    assert_eq!(corrections[0], "Ensuring zone example.com exists in mock");
    assert!(corrections[1].starts_with("+ CREATE A @"));
    assert!(provider.created_zones().is_empty());
    assert_eq!(provider.read_calls(), 0);

    let provider = RecordingProvider::new();
    let (engine, _rx) = engine_with(provider.clone(), metadata, None, EngineConfig::default());
    let report = engine
        .run(
            vec![bound_zone(vec![a("@", "1.2.3.4", 300)])],
            RunMode::Push,
            RunOptions::default(),
        )
        .await;
    assert!(!report.any_failed());
    assert_eq!(provider.created_zones(), vec![ZONE.to_string()]);
    assert_eq!(provider.applied().len(), 1);
}

#[tokio::test]
async fn no_populate_reads_the_missing_zone_and_fails() {
    let metadata = ProviderMetadata {
        lists_zones: true,
        creates_zones: true,
        ..mock_metadata()
    };
    let provider = RecordingProvider::new();
    let (engine, _rx) = engine_with(provider.clone(), metadata, None, EngineConfig::default());

    let opts = RunOptions {
        no_populate: true,
        ..RunOptions::default()
    };
    let report = engine
        .run(vec![bound_zone(vec![a("@", "1.2.3.4", 300)])], RunMode::Push, opts)
        .await;
    assert!(report.any_failed());
    assert!(provider.created_zones().is_empty());
    assert!(report.zones[0].error.as_deref().unwrap().contains("Not found"));
}

#[tokio::test]
async fn registrar_receives_gathered_nameservers() {
    let provider = RecordingProvider::new()
        .with_nameservers(&["ns2.host.net.", "ns1.host.net."])
        .with_zone(ZONE, vec![]);
    let registrar = MockRegistrar::new(&["ns1.old-registrar.net"]);
    let (engine, _rx) = engine_with(
        provider.clone(),
        mock_metadata(),
        Some(registrar.clone()),
        EngineConfig::default(),
    );

    let mut dc = bound_zone(vec![]);
    dc.dns_providers.insert("mock".to_string(), -1);
    dc.registrar = Some("reg".to_string());

    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;
    assert!(!report.any_failed());
    let reg_report = report.zones[0]
        .providers
        .iter()
        .find(|p| p.provider == "reg")
        .unwrap();
    assert_eq!(
        reg_report.corrections,
        vec!["ns1.old-registrar.net → ns1.host.net,ns2.host.net".to_string()]
    );
    assert_eq!(
        registrar.applied(),
        vec![vec!["ns1.host.net".to_string(), "ns2.host.net".to_string()]]
    );
}

#[tokio::test]
async fn nameserver_count_limits_gathered_nameservers() {
    let provider = RecordingProvider::new()
        .with_nameservers(&["ns1.host.net", "ns2.host.net", "ns3.host.net"])
        .with_zone(ZONE, vec![]);
    let registrar = MockRegistrar::new(&["ns1.host.net"]);
    let (engine, _rx) = engine_with(
        provider,
        mock_metadata(),
        Some(registrar.clone()),
        EngineConfig::default(),
    );

    let mut dc = bound_zone(vec![]);
    dc.dns_providers.insert("mock".to_string(), 1);
    dc.registrar = Some("reg".to_string());

    let report = engine.run(vec![dc], RunMode::Push, RunOptions::default()).await;
    assert!(!report.any_failed());
    assert_eq!(report.total_changes(), 0);
    assert!(registrar.applied().is_empty());
}

#[tokio::test]
async fn concurrent_runs_report_in_input_order() {
    let zones = ["example.com", "example.net", "example.org", "example.dev"];
    let mut provider = RecordingProvider::new();
    for z in zones {
        provider = provider.with_zone(z, vec![]);
    }
    let config = EngineConfig {
        concurrency: ConcurrencyMode::Concurrent,
        max_parallel_zones: 2,
        ..EngineConfig::default()
    };
    let (engine, _rx) = engine_with(provider.clone(), mock_metadata(), None, config);

    let domains = zones
        .iter()
        .map(|z| bound_zone_named(z, vec![a_in(z, "@", "1.2.3.4")]))
        .collect();
    let report = engine.run(domains, RunMode::Push, RunOptions::default()).await;

    assert!(!report.any_failed());
    let order: Vec<&str> = report.zones.iter().map(|z| z.domain.as_str()).collect();
    assert_eq!(order, zones);
    assert_eq!(provider.applied().len(), 4);
}

#[tokio::test]
async fn cancelled_run_skips_everything() {
    let provider = RecordingProvider::new().with_zone(ZONE, vec![]);
    let (engine, mut rx) = engine(provider.clone());
    engine.cancellation_token().cancel();

    let report = engine
        .run(
            vec![bound_zone(vec![a("@", "1.2.3.4", 300)])],
            RunMode::Push,
            RunOptions::default(),
        )
        .await;

    assert!(report.any_failed());
    assert!(report.zones[0].error.as_deref().unwrap().contains("Cancelled"));
    assert!(provider.applied().is_empty());
    assert_eq!(
        drain(&mut rx).last(),
        Some(&EngineEvent::Stopped {
            reason: "cancelled".to_string()
        })
    );
}

#[tokio::test]
async fn events_follow_the_run() {
    let provider = RecordingProvider::new().with_zone(ZONE, vec![]);
    let (engine, mut rx) = engine(provider);

    engine
        .run(
            vec![bound_zone(vec![a("@", "1.2.3.4", 300)])],
            RunMode::Push,
            RunOptions::default(),
        )
        .await;

    let events = drain(&mut rx);
    assert_eq!(
        events.first(),
        Some(&EngineEvent::Started {
            zones: 1,
            mode: RunMode::Push
        })
    );
    assert!(events.contains(&EngineEvent::CorrectionsComputed {
        zone: ZONE.to_string(),
        provider: "mock".to_string(),
        corrections: 1,
        changes: 1,
    }));
    assert!(events.contains(&EngineEvent::CorrectionApplied {
        zone: ZONE.to_string(),
        provider: "mock".to_string(),
        msg: "+ CREATE A @ → 1.2.3.4 ttl=300".to_string(),
    }));
    assert_eq!(
        events.last(),
        Some(&EngineEvent::Stopped {
            reason: "completed".to_string()
        })
    );
}

struct CountingNotifier(Arc<AtomicUsize>);

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _zone: &ZoneReport) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn notifier_runs_after_push_only() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RecordingProvider::new().with_zone(ZONE, vec![]);
    let (engine, _rx) = engine(provider);
    let engine = engine.with_notifier(Box::new(CountingNotifier(Arc::clone(&count))));
    let opts = RunOptions {
        notify: true,
        ..RunOptions::default()
    };

    engine
        .run(vec![bound_zone(vec![a("@", "1.2.3.4", 300)])], RunMode::Preview, opts)
        .await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    engine
        .run(vec![bound_zone(vec![a("@", "1.2.3.4", 300)])], RunMode::Push, opts)
        .await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_zones_lists_every_zone_for_all() {
    let provider = RecordingProvider::new()
        .with_zone("example.org", vec![a_in("example.org", "www", "2.2.2.2")])
        .with_zone(ZONE, vec![a("www", "1.1.1.1", 0)]);
    let (engine, _rx) = engine(provider);

    let zones = engine.get_zones("mock", &["all".to_string()]).await.unwrap();
    let names: Vec<&str> = zones.iter().map(|(z, _)| z.as_str()).collect();
    assert_eq!(names, vec!["example.com", "example.org"]);
    // TTL 0 is normalized to the default
    assert_eq!(zones[0].1[0].ttl, 300);

    let err = engine.get_zones("ghost", &["all".to_string()]).await.unwrap_err();
    assert!(err.is_config_error());
}

#[tokio::test]
async fn create_domains_only_touches_capable_providers() {
    let provider = RecordingProvider::new();
    let (engine, _rx) = engine(provider.clone());
    let lines = engine.create_domains(&[bound_zone(vec![])]).await.unwrap();
    assert!(lines.is_empty());
    assert!(provider.created_zones().is_empty());

    let metadata = ProviderMetadata {
        creates_zones: true,
        ..mock_metadata()
    };
    let provider = RecordingProvider::new();
    let (engine, _rx) = engine_with(provider.clone(), metadata, None, EngineConfig::default());
    let lines = engine.create_domains(&[bound_zone(vec![])]).await.unwrap();
    assert_eq!(lines, vec!["Ensured zone example.com exists in mock".to_string()]);
    assert_eq!(provider.created_zones(), vec![ZONE.to_string()]);
}

/// Push one A record into each of two zones, concurrently if allowed
async fn push_two_zones(metadata: ProviderMetadata) -> RecordingProvider {
    let provider = RecordingProvider::new()
        .with_zone("example.com", vec![])
        .with_zone("example.net", vec![])
        .with_action_delay(Duration::from_millis(300));
    let config = EngineConfig {
        concurrency: ConcurrencyMode::Concurrent,
        max_parallel_zones: 4,
        ..EngineConfig::default()
    };
    let (engine, _rx) = engine_with(provider.clone(), metadata, None, config);
    let domains = ["example.com", "example.net"]
        .iter()
        .map(|z| bound_zone_named(z, vec![a_in(z, "@", "1.2.3.4")]))
        .collect();

    let report = engine.run(domains, RunMode::Push, RunOptions::default()).await;
    assert!(!report.any_failed());
    assert_eq!(provider.applied().len(), 2);
    provider
}

#[tokio::test]
async fn zones_without_can_concur_run_serially() {
    let serial = ProviderMetadata {
        features: DocumentationNotes::new(),
        ..mock_metadata()
    };
    let provider = push_two_zones(serial).await;
    assert_eq!(provider.max_running(), 1);

    let provider = push_two_zones(mock_metadata()).await;
    assert_eq!(provider.max_running(), 2);
}

#[tokio::test]
async fn overdue_correction_runs_to_completion() {
    let provider = RecordingProvider::new()
        .with_zone(ZONE, vec![])
        .with_action_delay(Duration::from_millis(1500));
    let config = EngineConfig {
        correction_timeout_secs: 1,
        ..EngineConfig::default()
    };
    let (engine, mut rx) = engine_with(provider.clone(), mock_metadata(), None, config);

    let report = engine
        .run(
            vec![bound_zone(vec![a("www", "1.2.3.4", 300)])],
            RunMode::Push,
            RunOptions::default(),
        )
        .await;

    assert!(!report.any_failed(), "{:?}", report.zones[0].error);
    assert_eq!(provider.applied().len(), 1);
    assert!(provider.applied()[0].starts_with("+ CREATE A www"));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::CorrectionOverdue { zone, msg, .. }
            if zone == ZONE && msg.starts_with("+ CREATE A www")
    )));
    assert!(events.iter().any(|e| matches!(e, EngineEvent::CorrectionApplied { .. })));
}

#[tokio::test]
async fn slow_zone_listing_does_not_block_other_providers() {
    let listing = |type_name: &str| ProviderMetadata {
        type_name: type_name.to_string(),
        lists_zones: true,
        creates_zones: true,
        ..mock_metadata()
    };
    let slow = RecordingProvider::new()
        .with_zone("example.com", vec![])
        .with_list_delay(Duration::from_secs(2));
    let fast = RecordingProvider::new().with_zone("example.net", vec![]);

    let mut registry = zonectl_core::ProviderRegistry::with_builtins();
    for (provider, metadata) in [(&slow, listing("MOCKSLOW")), (&fast, listing(MOCK_TYPE))] {
        registry
            .register_dns_provider(Box::new(RecordingFactory {
                provider: provider.clone(),
                metadata,
            }))
            .unwrap();
    }
    let mut set = zonectl_core::ProviderSet::new();
    set.add_dns_provider("slow", "MOCKSLOW", Arc::new(slow.clone()));
    set.add_dns_provider("fast", MOCK_TYPE, Arc::new(fast.clone()));
    let config = EngineConfig {
        concurrency: ConcurrencyMode::Concurrent,
        ..EngineConfig::default()
    };
    let (engine, _rx) = zonectl_core::Engine::new(Arc::new(registry), set, config).unwrap();

    let mut slow_zone = DomainConfig::new("example.com");
    slow_zone.records = vec![a_in("example.com", "@", "1.2.3.4")];
    slow_zone.dns_providers.insert("slow".to_string(), 0);
    let mut fast_zone = DomainConfig::new("example.net");
    fast_zone.records = vec![a_in("example.net", "@", "1.2.3.4")];
    fast_zone.dns_providers.insert("fast".to_string(), 0);

    let run = engine.run(vec![slow_zone, fast_zone], RunMode::Push, RunOptions::default());
    let early = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (fast.applied().len(), slow.applied().len())
    };
    let (report, (fast_early, slow_early)) = tokio::join!(run, early);

    assert_eq!(fast_early, 1, "fast provider waited for the slow listing");
    assert_eq!(slow_early, 0);
    assert!(!report.any_failed());
    assert_eq!(slow.applied().len(), 1);
}
