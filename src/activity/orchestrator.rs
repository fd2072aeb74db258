//! Fan-out over every source, merged into one [`Snapshot`]

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::cron::CronCollector;
use super::schema::{HealthReport, LogEntry, SourceHealth, Snapshot, Stats};
use super::sessions::{SessionCollection, SessionCollector};
use super::tailer::LogTailer;
use super::usage::UsageCollector;
use crate::app::Config;
use crate::source::{Clock, CommandRunner, SystemClock, TokioCommandRunner};

/// Sources that must be up for the health report to say `ok`
pub const REQUIRED_SOURCES: [&str; 2] = ["cli", "sessions"];

/// Runs all collectors concurrently, each under its own deadline
pub struct SourceOrchestrator<R = TokioCommandRunner, C = SystemClock> {
    runner: R,
    clock: C,
    program: String,
    limit: Duration,
    tailer: LogTailer,
    sessions: SessionCollector,
    cron: CronCollector,
    usage: UsageCollector,
}

impl SourceOrchestrator {
    /// Orchestrator over real processes and the system clock
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config, TokioCommandRunner, SystemClock)
    }
}

impl<R, C> SourceOrchestrator<R, C>
where
    R: CommandRunner,
    C: Clock,
{
    pub fn new(config: &Config, runner: R, clock: C) -> Result<Self> {
        let program = config.cli_program.clone();
        Ok(Self {
            runner,
            clock,
            limit: config.source_timeout(),
            tailer: LogTailer::new(config.logs.clone()),
            sessions: SessionCollector::new(config.sessions.clone(), program.clone())?,
            cron: CronCollector::new(config.cron.clone(), program.clone()),
            usage: UsageCollector::new(config.usage.clone(), program.clone()),
            program,
        })
    }

    /// One collection pass; never fails
    pub async fn collect(&self) -> Snapshot {
        let runner = &self.runner;
        let limit = self.limit;

        let logs = self.tail_logs();
        let sessions = bounded("sessions", limit, self.sessions.collect(runner, &self.clock, limit));
        let cron_jobs = bounded("cron", limit, self.cron.collect(runner, limit));
        let usage = bounded("usage", limit, self.usage.collect(runner, limit));

        let (logs, sessions, cron_jobs, usage) = tokio::join!(logs, sessions, cron_jobs, usage);

        let SessionCollection {
            tasks,
            warning,
            unrecognized,
        } = sessions.unwrap_or_else(|| {
            SessionCollection::failed(format!(
                "sessions query timed out after {}s",
                limit.as_secs()
            ))
        });

        let snapshot = Snapshot {
            logs,
            stats: Stats::tally(&tasks, unrecognized),
            tasks,
            cron_jobs: cron_jobs.unwrap_or_default(),
            warning,
            usage: usage.flatten(),
        };

        debug!(
            "Collected {} log entries, {} tasks, {} cron jobs",
            snapshot.logs.len(),
            snapshot.tasks.len(),
            snapshot.cron_jobs.len()
        );
        snapshot
    }

    async fn tail_logs(&self) -> Vec<LogEntry> {
        let tailer = self.tailer.clone();
        match timeout(self.limit, tokio::task::spawn_blocking(move || tailer.tail())).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(e)) => {
                warn!("Log tail task failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("Log tail exceeded {}s", self.limit.as_secs());
                Vec::new()
            }
        }
    }

    /// Probe every source independently of `collect`
    pub async fn health(&self) -> Vec<SourceHealth> {
        let runner = &self.runner;
        let limit = self.limit;
        let version_args = ["--version".to_string()];

        let cli = bounded("cli", limit, async {
            runner
                .run(&self.program, &version_args, limit)
                .await
                .map(|o| o.success())
                .unwrap_or(false)
        });
        let sessions = bounded("sessions", limit, self.sessions.probe(runner, limit));
        let cron = bounded("cron", limit, self.cron.probe(runner, limit));
        let tailer = self.tailer.clone();
        let logs = async move {
            timeout(limit, tokio::task::spawn_blocking(move || tailer.is_available()))
                .await
                .ok()
                .and_then(|joined| joined.ok())
        };

        let (cli, sessions, cron, logs) = tokio::join!(cli, sessions, cron, logs);

        vec![
            SourceHealth::new("cli", cli.unwrap_or(false)),
            SourceHealth::new("sessions", sessions.unwrap_or(false)),
            SourceHealth::new("cron", cron.unwrap_or(false)),
            SourceHealth::new("logs", logs.unwrap_or(false)),
        ]
    }

    pub async fn health_report(&self) -> HealthReport {
        HealthReport::from_sources(&self.health().await, &REQUIRED_SOURCES)
    }
}

/// Await `fut` for at most `limit`; `None` on timeout
async fn bounded<T>(source: &str, limit: Duration, fut: impl Future<Output = T>) -> Option<T> {
    match timeout(limit, fut).await {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Source {} exceeded {}s", source, limit.as_secs());
            None
        }
    }
}
