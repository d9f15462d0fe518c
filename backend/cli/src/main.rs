use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use chatbridge_config::{default_config_path, load_config, redacted_snapshot, ConfigStore};
use chatbridge_logging::{init_logger, LogVerbosity};
use chatbridge_supervisor::{DiscordServices, RestartCoordinator};

#[derive(Parser, Debug)]
#[command(name = "chatbridge")]
#[command(about = "Discord bot that answers commands through OpenAI chat completions")]
#[command(version)]
struct Cli {
    /// Log level: info, error or debug
    level: Option<String>,

    /// Path to the JSON config file [default: $CHATBRIDGE_CONFIG, else config.json next to the binary]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Validate the config, print it with secrets redacted, and exit
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = LogVerbosity::from_arg(cli.level.as_deref());
    init_logger(&cli.log_dir, verbosity);

    let path = cli.config_path();
    if cli.check {
        return check_config(path).await;
    }
    run(path, verbosity).await
}

async fn check_config(path: PathBuf) -> Result<()> {
    let config = load_config(&path)
        .await
        .with_context(|| format!("config check failed for {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&redacted_snapshot(&config))?);
    Ok(())
}

async fn run(path: PathBuf, verbosity: LogVerbosity) -> Result<()> {
    info!(config = %path.display(), %verbosity, "Starting chatbridge");

    let store = Arc::new(ConfigStore::new(path));
    let coordinator = Arc::new(RestartCoordinator::new(
        Arc::clone(&store),
        Arc::new(DiscordServices),
    ));

    // Watch first so edits made while the first connect is in flight are seen.
    let watcher = coordinator
        .watch_config()
        .context("failed to watch the config file")?;

    // The process keeps running on a bad config; the next edit retries.
    if let Err(e) = coordinator.start().await {
        error!("Initial start failed, waiting for a config change: {}", e);
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    drop(watcher);
    coordinator.shutdown().await;
    if coordinator.is_restarting() {
        warn!("Exiting while a restart was in progress");
    }
    let stats = coordinator.stats();
    info!(
        restarts = stats.started,
        completed = stats.completed,
        failed = stats.failed,
        dropped = stats.skipped,
        "Stopped"
    );
    Ok(())
}
