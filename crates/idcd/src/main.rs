// # idcd - IDC Lookup Daemon
//
// The idcd daemon is a thin shell over idc-core. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and logging
// 3. Loading segment tables and keeping them refreshed
// 4. Answering lookups for addresses given on the command line or stdin
//
// All resolution logic lives in idc-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Segment Files
// - `IDC_SEGMENT_AGENT_V4`: Agent-maintained IPv4 segment file
// - `IDC_SEGMENT_LOCAL_V4`: Locally maintained IPv4 segment file
// - `IDC_SEGMENT_AGENT_V6`: Agent-maintained IPv6 segment file
// - `IDC_SEGMENT_LOCAL_V6`: Locally maintained IPv6 segment file
// - `IDC_SEGMENT_OVERRIDE_V4`: Read only this file for IPv4 (optional)
// - `IDC_SEGMENT_OVERRIDE_V6`: Read only this file for IPv6 (optional)
//
// ### Regions
// - `IDC_REGION_FILE`: Region catalogue JSON; empty disables regions
//
// ### Runtime
// - `IDC_REFRESH_SECS`: Refresh interval in seconds (10..=86400)
// - `IDC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Usage
//
// ```bash
// # one-shot
// idcd 10.8.1.1 2001:db8::1
//
// # long-running: one address per stdin line
// tail -F access.ips | idcd
// ```
//
// Each answer is printed as `<ip> <idc> <region>`, with `-` for unknowns.

use anyhow::Result;
use idc_core::{
    AddressFamily, Datacenter, FileSegmentSource, IdcResolver, ResolverConfig, ResolverEvent, SegmentFiles,
    SourcesConfig, UNKNOWN_REGION, config,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{LinesStream, ReceiverStream};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IdcExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IdcExitCode> for ExitCode {
    fn from(code: IdcExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    agent_v4: PathBuf,
    local_v4: PathBuf,
    agent_v6: PathBuf,
    local_v6: PathBuf,
    override_v4: Option<PathBuf>,
    override_v6: Option<PathBuf>,
    region_file: Option<PathBuf>,
    refresh_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            agent_v4: path_var("IDC_SEGMENT_AGENT_V4", config::AGENT_FILE_V4),
            local_v4: path_var("IDC_SEGMENT_LOCAL_V4", config::LOCAL_FILE_V4),
            agent_v6: path_var("IDC_SEGMENT_AGENT_V6", config::AGENT_FILE_V6),
            local_v6: path_var("IDC_SEGMENT_LOCAL_V6", config::LOCAL_FILE_V6),
            override_v4: env::var("IDC_SEGMENT_OVERRIDE_V4").ok().map(PathBuf::from),
            override_v6: env::var("IDC_SEGMENT_OVERRIDE_V6").ok().map(PathBuf::from),
            region_file: match env::var("IDC_REGION_FILE") {
                Ok(path) if path.is_empty() => None,
                Ok(path) => Some(PathBuf::from(path)),
                Err(_) => Some(PathBuf::from(config::REGION_FILE)),
            },
            refresh_secs: match env::var("IDC_REFRESH_SECS") {
                Ok(s) => Some(s.trim().parse().map_err(|e| {
                    anyhow::anyhow!("IDC_REFRESH_SECS must be a number of seconds. Got '{}': {}", s, e)
                })?),
                Err(_) => None,
            },
            log_level: env::var("IDC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("IDC_SEGMENT_AGENT_V4", &self.agent_v4),
            ("IDC_SEGMENT_LOCAL_V4", &self.local_v4),
            ("IDC_SEGMENT_AGENT_V6", &self.agent_v6),
            ("IDC_SEGMENT_LOCAL_V6", &self.local_v6),
        ] {
            if path.as_os_str().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        for (name, path) in [
            ("IDC_SEGMENT_OVERRIDE_V4", &self.override_v4),
            ("IDC_SEGMENT_OVERRIDE_V6", &self.override_v6),
        ] {
            if let Some(path) = path
                && !path.is_file()
            {
                anyhow::bail!(
                    "{} does not point to a readable file: {}",
                    name,
                    path.display()
                );
            }
        }

        if let Some(secs) = self.refresh_secs
            && !(10..=86400).contains(&secs)
        {
            anyhow::bail!(
                "IDC_REFRESH_SECS must be between 10 and 86400 seconds. Got: {}",
                secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IDC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Library configuration for the resolver
    fn resolver_config(&self) -> ResolverConfig {
        let mut resolver_config = ResolverConfig::new().with_region_file(self.region_file.clone());
        resolver_config.sources = SourcesConfig {
            v4: SegmentFiles::new(&self.agent_v4, &self.local_v4),
            v6: SegmentFiles::new(&self.agent_v6, &self.local_v6),
        };
        if let Some(secs) = self.refresh_secs {
            resolver_config = resolver_config.with_refresh_interval_secs(secs);
        }
        if let Some(path) = &self.override_v4 {
            resolver_config = resolver_config.with_override(AddressFamily::V4, path);
        }
        if let Some(path) = &self.override_v6 {
            resolver_config = resolver_config.with_override(AddressFamily::V6, path);
        }
        resolver_config
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IdcExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IdcExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries answers, logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IdcExitCode::ConfigError.into();
    }

    info!("Starting idcd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IdcExitCode::RuntimeError.into();
        }
    };

    let queries: Vec<String> = env::args().skip(1).collect();

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, queries).await {
            error!("Daemon error: {}", e);
            IdcExitCode::RuntimeError
        } else {
            IdcExitCode::CleanShutdown
        }
    });

    // a pending stdin read would otherwise hold the runtime open
    rt.shutdown_timeout(Duration::from_secs(1));

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config, queries: Vec<String>) -> Result<()> {
    let resolver_config = config.resolver_config();
    let source = FileSegmentSource::new(resolver_config.sources.clone());
    let (resolver, events) = IdcResolver::new(Box::new(source), resolver_config)?;

    tokio::spawn(log_events(events));

    if let Err(e) = resolver.refresh().await {
        warn!("Initial load incomplete: {}", e);
    }
    let stats = resolver.stats();
    info!(
        "Loaded {} IPv4 and {} IPv6 segment(s), {} catalogued IDC(s)",
        stats.v4_segments, stats.v6_segments, stats.datacenters
    );

    // one-shot mode
    if !queries.is_empty() {
        for query in &queries {
            println!("{}", answer(&resolver, query));
        }
        return Ok(());
    }

    let resolver = std::sync::Arc::new(resolver);
    let refresh_task = resolver.spawn_refresh();

    info!("Ready, reading addresses from stdin");

    let served = tokio::select! {
        result = serve_stdin(&resolver) => result,
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
            Ok(())
        }
    };

    info!("Shutting down daemon");
    refresh_task.shutdown().await?;

    served
}

/// Answer one address per stdin line until EOF
async fn serve_stdin(resolver: &IdcResolver) -> Result<()> {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    while let Some(line) = lines.next().await {
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        println!("{}", answer(resolver, query));
    }

    debug!("stdin closed");
    Ok(())
}

/// Format `<ip> <idc> <region>` for one query
fn answer(resolver: &IdcResolver, query: &str) -> String {
    // one table lookup; the region comes from that same answer
    let idc = resolver.lookup_str(query);
    let regions = resolver.regions();
    let region = match &idc {
        Datacenter::Known(label) => regions.region_or_unknown(label),
        Datacenter::Unknown => UNKNOWN_REGION,
    };
    format!("{} {} {}", query, idc, region)
}

/// Forward resolver events to the log
async fn log_events(events: mpsc::Receiver<ResolverEvent>) {
    let mut events = ReceiverStream::new(events);

    while let Some(event) = events.next().await {
        match event {
            ResolverEvent::RefreshFailed { family, error } => {
                warn!("{} refresh failed: {}", family, error);
            }
            ResolverEvent::RegionRefreshFailed { error } => {
                warn!("Region refresh failed: {}", error);
            }
            other => debug!("Resolver event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
