// # zonectl - DNS-as-code command line
//
// A thin shell over zonectl-core: it parses flags, loads the configuration
// and credentials files, registers the provider adapters and hands the
// zones to the engine. No DNS logic lives here.
//
// ## Commands
//
// - `preview`: compute and print corrections; exit 0 if nothing changes,
//   2 if changes are pending, 1 if any zone failed
// - `push`: compute and apply corrections; exit 0 on success, 1 if any
//   zone failed
// - `get-zones <provider> <zone...>`: print the records a provider serves
// - `create-domains`: create every zone on providers that can create zones
// - `check`: validate the configuration without contacting any provider
// - `print-ir`: print the normalized desired state as JSON
//
// ## Logging
//
// Logs go to stderr; command output goes to stdout. The level comes from
// `--log-level`, then `ZONECTL_LOG_LEVEL`, then `info`.
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// zonectl preview --config zones.json --creds creds.json --domains 'example.*'
// zonectl push --config zones.json --creds creds.json --report report.json
// ```

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;
use zonectl_core::config::ConcurrencyMode;

/// Exit codes
///
/// - 0: success, or a preview with nothing to change
/// - 1: configuration error or a failed zone
/// - 2: a preview with pending changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonectlExitCode {
    Success = 0,
    Failure = 1,
    ChangesPending = 2,
}

impl From<ZonectlExitCode> for ExitCode {
    fn from(code: ZonectlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "zonectl", version, about = "Reconcile DNS zones with their declared state")]
struct Cli {
    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, env = "ZONECTL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute and print corrections without applying them
    Preview(RunArgs),
    /// Compute and apply corrections
    Push(RunArgs),
    /// Print the records a provider currently serves
    GetZones(GetZonesArgs),
    /// Create every zone on the providers that can create zones
    CreateDomains {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        providers: ProviderArgs,
    },
    /// Validate the configuration without contacting any provider
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the normalized desired state as JSON
    PrintIr {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Where the desired state comes from
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Zone configuration JSON
    #[arg(long, default_value = "zones.json")]
    config: PathBuf,

    /// Engine settings JSON; defaults apply when omitted
    #[arg(long)]
    engine_config: Option<PathBuf>,

    /// Only zones whose name matches this glob
    #[arg(long)]
    domains: Option<String>,
}

/// Which providers to build
#[derive(Args, Debug, Clone)]
struct ProviderArgs {
    /// Credentials JSON, keyed by provider instance
    #[arg(long, default_value = "creds.json")]
    creds: PathBuf,

    /// Comma-separated provider instances to use; others are skipped
    #[arg(long, value_delimiter = ',')]
    providers: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    providers: ProviderArgs,

    /// Zone scheduling: serial or concurrent
    #[arg(long)]
    cmode: Option<ConcurrencyMode>,

    /// Never create missing zones
    #[arg(long)]
    no_populate: bool,

    /// Send a per-zone summary to the notifier after a push
    #[arg(long)]
    notify: bool,

    /// Write a JSON report of every (zone, provider) outcome
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct GetZonesArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    providers: ProviderArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Provider instance to read from
    provider: String,

    /// Zones to read; `all` lists every zone of the provider
    #[arg(required = true)]
    zones: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Tsv,
}

fn parse_level(raw: &str) -> anyhow::Result<Level> {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!(
            "log level '{other}' is not valid. Valid levels: trace, debug, info, warn, error"
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match parse_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ZonectlExitCode::Failure.into();
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ZonectlExitCode::Failure.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ZonectlExitCode::Failure.into();
        }
    };

    let result = rt.block_on(commands::run(cli.command));
    match result {
        Ok(code) => code.into(),
        Err(e) => {
            error!("{e:#}");
            ZonectlExitCode::Failure.into()
        }
    }
}
