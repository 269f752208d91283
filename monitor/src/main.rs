//! AFK Monitor - Elite Dangerous journal watcher.
//!
//! Prints notable journal events to the terminal and optionally forwards
//! them to a Discord webhook.
//!
//! # Configuration
//!
//! See [`afk_monitor::config`] for the file format and environment variables.

use std::io::{self, IsTerminal, Stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use afk_monitor::classifier::Classifier;
use afk_monitor::config::{Config, VerbosityPolicy, DEFAULT_CONFIG_FILE};
use afk_monitor::format::banner;
use afk_monitor::monitor::Monitor;
use afk_monitor::router::Router;
use afk_monitor::tailer::{latest_journal, Tailer};
use afk_monitor::webhook::WebhookSender;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// AFK Monitor - live event monitoring for Elite Dangerous AFK sessions.
#[derive(Parser, Debug)]
#[command(name = "afk-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    AFK_MONITOR_JOURNAL_DIR    Journal folder
    AFK_MONITOR_WEBHOOK_URL    Discord webhook URL
    AFK_MONITOR_USER_ID        Discord user ID to mention on urgent events
    AFK_MONITOR_USE_UTC        Stamp output in UTC (true/false)
    AFK_MONITOR_FUEL_TANK      Main fuel tank capacity in tonnes
    RUST_LOG                   Diagnostic log filter (default: warn)

EXAMPLES:
    # Watch the latest journal in the default folder
    afk-monitor

    # Watch a different folder with UTC timestamps
    afk-monitor -j D:/Journals --utc
")]
struct Cli {
    /// Override the journal folder.
    #[arg(short = 'j', long = "journal-folder", value_name = "DIR")]
    journal_folder: Option<PathBuf>,

    /// Follow this journal file instead of the latest one.
    #[arg(short = 'f', long = "journal-file", value_name = "FILE")]
    journal_file: Option<PathBuf>,

    /// Configuration file.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Stamp output in UTC instead of local time.
    #[arg(long)]
    utc: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            pause_if_interactive();
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run_monitor(cli))
}

async fn run_monitor(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config).with_context(|| {
        format!("Failed to load configuration from {}", cli.config.display())
    })?;
    config.apply_cli(cli.journal_folder, cli.journal_file, cli.utc);
    report_verbosity(&config.verbosity);

    let journal_dir = config
        .journal_dir()
        .context("Failed to determine journal folder")?;
    let journal = match &config.journal_file {
        Some(file) => resolve_journal_file(&journal_dir, file),
        None => latest_journal(&journal_dir)
            .await
            .context("Failed to locate a journal")?,
    };
    let journal_name = journal.file_name().map_or_else(
        || journal.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );

    info!(
        journal_dir = %journal_dir.display(),
        journal = %journal_name,
        remote = config.webhook_url.is_some(),
        "Configuration loaded"
    );

    for line in banner(VERSION, &journal_dir.display().to_string(), &journal_name) {
        println!("{line}");
    }

    let mut tailer = Tailer::open(&journal)
        .await
        .context("Failed to open journal")?
        .with_poll_interval(config.poll_interval);

    let mut router: Router<Stdout, WebhookSender> = Router::new(io::stdout(), config.time_mode);
    match &config.webhook_url {
        Some(url) => {
            let sender = WebhookSender::new(url).context("Invalid webhook configuration")?;
            router = router.with_remote(sender, config.user_id.clone());
        }
        None => info!("No webhook configured, terminal output only"),
    }

    let classifier = Classifier::new(config.verbosity.clone(), config.fuel_tank);
    let mut monitor = Monitor::new(
        classifier,
        router,
        config.on_malformed,
        config.duplicate_cap,
    );

    let reason = monitor
        .run_session(VERSION, &journal_name, &mut tailer, wait_for_shutdown())
        .await
        .context("Monitoring stopped")?;
    info!(?reason, "Monitor exited");
    Ok(())
}

/// A relative journal file is looked up in the journal folder unless it
/// exists as given.
fn resolve_journal_file(journal_dir: &Path, file: &Path) -> PathBuf {
    if file.is_relative() && !file.exists() {
        journal_dir.join(file)
    } else {
        file.to_path_buf()
    }
}

/// Warns once about verbosity keys that fall back to defaults.
fn report_verbosity(policy: &VerbosityPolicy) {
    let defaulted = policy.defaulted_keys();
    if !defaulted.is_empty() {
        let keys: Vec<&str> = defaulted.iter().map(|key| key.as_str()).collect();
        warn!(
            keys = %keys.join(", "),
            "No log level configured, using defaults"
        );
    }

    for key in policy.unknown_keys() {
        warn!(key = %key, "Ignoring unknown log level key");
    }
}

/// Initializes the logging subsystem. Diagnostics go to stderr so they never
/// interleave with notification lines on stdout.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Keeps a console window open long enough to read a fatal error.
fn pause_if_interactive() {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Press ENTER to exit...");
        let mut line = String::new();
        let _ = stdin.read_line(&mut line);
    }
}
