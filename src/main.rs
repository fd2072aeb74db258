use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use openclaw_dashboard::activity::{Snapshot, SourceOrchestrator, TaskStatus};
use openclaw_dashboard::app::Config;

/// OpenClaw Dashboard - activity snapshot of an OpenClaw gateway
#[derive(Parser)]
#[command(name = "openclaw-dashboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Config file (default: ~/.config/openclaw-dashboard/config.toml)
    #[arg(short, long, global = true, env = "OPENCLAW_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect once and print the snapshot as JSON (default)
    Snapshot {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Probe every source and print the health report as JSON
    Health,
    /// Collect repeatedly and print a plain-text summary
    Watch {
        /// Seconds between passes (default: refresh_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // ログ初期化
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    let orchestrator = SourceOrchestrator::from_config(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Some(Commands::Snapshot { pretty }) => runtime.block_on(print_snapshot(&orchestrator, pretty)),
        None => runtime.block_on(print_snapshot(&orchestrator, false)),
        Some(Commands::Health) => runtime.block_on(async {
            let report = orchestrator.health_report().await;
            println!("{}", serde_json::to_string(&report)?);
            Ok::<(), anyhow::Error>(())
        }),
        Some(Commands::Watch { interval }) => {
            let interval = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.refresh_interval());
            runtime.block_on(watch(&orchestrator, interval))
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("OpenClaw Dashboard starting");
}

async fn print_snapshot(orchestrator: &SourceOrchestrator, pretty: bool) -> Result<()> {
    let snapshot = orchestrator.collect().await;
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    }
    .context("Failed to serialize snapshot")?;
    println!("{}", json);
    Ok(())
}

async fn watch(orchestrator: &SourceOrchestrator, interval: Duration) -> Result<()> {
    info!("Watching every {}s", interval.as_secs());
    loop {
        let snapshot = orchestrator.collect().await;
        print!("{}", render_summary(&snapshot));

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}

fn render_summary(snapshot: &Snapshot) -> String {
    let stats = &snapshot.stats;
    let mut out = format!(
        "[{}] tasks {} (todo {}, pending {}, completed {}, failed {})  cron {}  logs {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        snapshot.tasks.len(),
        stats.get(TaskStatus::Todo),
        stats.get(TaskStatus::Pending),
        stats.get(TaskStatus::Completed),
        stats.get(TaskStatus::Failed),
        snapshot.cron_jobs.len(),
        snapshot.logs.len(),
    );

    if let Some(warning) = &snapshot.warning {
        out.push_str(&format!("  ! {}\n", warning));
    }
    for task in snapshot.tasks.iter().take(10) {
        out.push_str(&format!("  {:<9} {}  ({})\n", task.status.as_str(), task.name, task.summary));
    }
    for entry in &snapshot.logs[snapshot.logs.len().saturating_sub(5)..] {
        out.push_str(&format!("  {} {}\n", entry.timestamp, entry.message));
    }
    out
}
