//! Subcommand implementations
//!
//! Every command loads the zone configuration, filters it with `--domains`
//! and hands it to the core. Corrections and records go to stdout; progress
//! goes through `tracing`.

use crate::{Command, ConfigArgs, Format, GetZonesArgs, ProviderArgs, RunArgs, ZonectlExitCode};
use anyhow::{Context, Result};
use glob::Pattern;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zonectl_core::engine::{ZoneReport, prepare_domain};
use zonectl_core::{
    Credentials, DomainConfig, Engine, EngineConfig, EngineEvent, ProviderRegistry, ProviderSet,
    RecordConfig, RunMode, RunOptions, RunReport, TypeRegistry, ZoneConfigFile,
};

pub async fn run(command: Command) -> Result<ZonectlExitCode> {
    match command {
        Command::Preview(args) => reconcile(args, RunMode::Preview).await,
        Command::Push(args) => reconcile(args, RunMode::Push).await,
        Command::GetZones(args) => get_zones(args).await,
        Command::CreateDomains { config, providers } => create_domains(config, providers).await,
        Command::Check { config } => check(config),
        Command::PrintIr { config } => print_ir(config),
    }
}

async fn reconcile(args: RunArgs, mode: RunMode) -> Result<ZonectlExitCode> {
    let mut engine_config = load_engine_config(&args.config)?;
    if let Some(cmode) = args.cmode {
        engine_config.concurrency = cmode;
    }
    let (file, domains) = load_domains(&args.config)?;
    let engine = build_engine(&file, &args.providers, engine_config, None)?;

    let opts = RunOptions {
        no_populate: args.no_populate,
        notify: args.notify,
    };
    let report = engine.run(domains, mode, opts).await;

    print!("{}", render_report(&report));
    if let Some(path) = &args.report {
        let json = report.to_json().context("serializing report")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(exit_code(mode, report.any_failed(), report.total_changes()))
}

async fn get_zones(args: GetZonesArgs) -> Result<ZonectlExitCode> {
    let engine_config = load_engine_config(&args.config)?;
    let file = ZoneConfigFile::load(&args.config.config)?;
    let only = vec![args.provider.clone()];
    let engine = build_engine(&file, &args.providers, engine_config, Some(&only))?;

    let zones = engine.get_zones(&args.provider, &args.zones).await?;
    match args.format {
        Format::Json => {
            let records: Vec<&RecordConfig> = zones.iter().flat_map(|(_, rs)| rs).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Format::Tsv => print!("{}", render_tsv(&zones)),
    }
    Ok(ZonectlExitCode::Success)
}

async fn create_domains(config: ConfigArgs, providers: ProviderArgs) -> Result<ZonectlExitCode> {
    let engine_config = load_engine_config(&config)?;
    let (file, domains) = load_domains(&config)?;
    let engine = build_engine(&file, &providers, engine_config, None)?;

    for line in engine.create_domains(&domains).await? {
        println!("{line}");
    }
    Ok(ZonectlExitCode::Success)
}

fn check(config: ConfigArgs) -> Result<ZonectlExitCode> {
    let engine_config = load_engine_config(&config)?;
    let (_, domains) = load_domains(&config)?;
    let prepared = prepare_all(domains, engine_config.default_ttl)?;
    println!("configuration is valid: {} zone(s)", prepared.len());
    Ok(ZonectlExitCode::Success)
}

fn print_ir(config: ConfigArgs) -> Result<ZonectlExitCode> {
    let engine_config = load_engine_config(&config)?;
    let (_, domains) = load_domains(&config)?;
    let prepared = prepare_all(domains, engine_config.default_ttl)?;
    println!("{}", serde_json::to_string_pretty(&prepared)?);
    Ok(ZonectlExitCode::Success)
}

fn prepare_all(mut domains: Vec<DomainConfig>, default_ttl: u32) -> Result<Vec<DomainConfig>> {
    for dc in &mut domains {
        prepare_domain(dc, default_ttl).with_context(|| format!("zone {}", dc.name))?;
    }
    Ok(domains)
}

fn load_engine_config(args: &ConfigArgs) -> Result<EngineConfig> {
    let config = match &args.engine_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_domains(args: &ConfigArgs) -> Result<(ZoneConfigFile, Vec<DomainConfig>)> {
    let file = ZoneConfigFile::load(&args.config)?;
    let domains = file.to_domain_configs(TypeRegistry::global())?;
    let domains = filter_domains(domains, args.domains.as_deref())?;
    debug!(zones = domains.len(), "configuration loaded");
    Ok((file, domains))
}

/// Keep the zones whose name matches `pattern`
fn filter_domains(domains: Vec<DomainConfig>, pattern: Option<&str>) -> Result<Vec<DomainConfig>> {
    let Some(raw) = pattern else {
        return Ok(domains);
    };
    let pattern = Pattern::new(&raw.to_ascii_lowercase())
        .with_context(|| format!("--domains {raw:?} is not a valid glob"))?;
    let kept: Vec<DomainConfig> = domains
        .into_iter()
        .filter(|dc| pattern.matches(&dc.name.to_ascii_lowercase()))
        .collect();
    if kept.is_empty() {
        warn!(pattern = %raw, "no zone matches --domains");
    }
    Ok(kept)
}

fn build_registry() -> Result<ProviderRegistry> {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::with_builtins();

    #[cfg(feature = "cloudflare")]
    zonectl_provider_cloudflare::register(&mut registry)?;

    Ok(registry)
}

fn build_engine(
    file: &ZoneConfigFile,
    providers: &ProviderArgs,
    engine_config: EngineConfig,
    only: Option<&[String]>,
) -> Result<Engine> {
    let registry = build_registry()?;
    let creds = if providers.creds.exists() {
        Credentials::load(&providers.creds)?
    } else {
        debug!(path = %providers.creds.display(), "no credentials file");
        Credentials::default()
    };
    let only = only.or(providers.providers.as_deref());
    let set = ProviderSet::from_config(&registry, file, &creds, &engine_config, only)?;
    let (engine, mut events) = Engine::new(Arc::new(registry), set, engine_config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, skipping remaining corrections");
            token.cancel();
        }
    });

    Ok(engine)
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::CorrectionFailed {
            zone,
            provider,
            msg,
            error,
        } => warn!(%zone, %provider, %msg, %error, "correction failed"),
        EngineEvent::CorrectionOverdue { zone, provider, msg } => {
            warn!(%zone, %provider, %msg, "correction overdue, still waiting")
        }
        EngineEvent::ZoneFailed { zone, error } => warn!(%zone, %error, "zone failed"),
        other => debug!(event = ?other, "engine event"),
    }
}

fn exit_code(mode: RunMode, failed: bool, changes: usize) -> ZonectlExitCode {
    match mode {
        _ if failed => ZonectlExitCode::Failure,
        RunMode::Preview if changes > 0 => ZonectlExitCode::ChangesPending,
        _ => ZonectlExitCode::Success,
    }
}

fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    for zone in &report.zones {
        out.push_str(&render_zone(zone));
    }
    let verb = match report.mode {
        RunMode::Preview => "pending",
        RunMode::Push => "applied",
    };
    let _ = writeln!(
        out,
        "{} zone(s), {} change(s) {verb}",
        report.zones.len(),
        report.total_changes()
    );
    out
}

fn render_zone(zone: &ZoneReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "zone {}", zone.domain);
    for provider in &zone.providers {
        let _ = writeln!(
            out,
            "  {}: {} correction(s)",
            provider.provider,
            provider.corrections.len()
        );
        for (i, msg) in provider.corrections.iter().enumerate() {
            for (j, line) in msg.lines().enumerate() {
                if j == 0 {
                    let _ = writeln!(out, "    #{}: {line}", i + 1);
                } else {
                    let _ = writeln!(out, "        {line}");
                }
            }
        }
        if let Some(error) = &provider.error {
            let _ = writeln!(out, "    FAILED: {error}");
        }
    }
    if let Some(error) = &zone.error {
        let _ = writeln!(out, "  FAILED: {error}");
    }
    out
}

fn render_tsv(zones: &[(String, Vec<RecordConfig>)]) -> String {
    let mut out = String::new();
    for (_, records) in zones {
        for rc in records {
            out.push_str(&rc.to_zone_line());
            out.push('\n');
        }
    }
    out
}
