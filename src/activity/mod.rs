//! Activity aggregation for the OpenClaw gateway
//!
//! Each collector turns one external source into plain values:
//! - [`tailer`]: newest gateway log file, summarized by [`summarizer`]
//! - [`sessions`]: session records, classified into tasks by [`classifier`]
//! - [`cron`]: scheduled jobs
//! - [`usage`]: optional quota and token figures
//!
//! [`orchestrator::SourceOrchestrator`] runs them together and merges the
//! results into a [`Snapshot`].

pub mod classifier;
pub mod cron;
pub mod orchestrator;
pub mod schema;
pub mod sessions;
pub mod summarizer;
pub mod tailer;
pub mod text;
pub mod usage;

pub use classifier::{classify, AgeClassifier};
pub use cron::{CronCollector, CronConfig};
pub use orchestrator::SourceOrchestrator;
pub use schema::{
    CronJob, HealthReport, HealthStatus, LogEntry, Snapshot, SourceHealth, Stats, Task, TaskStatus,
};
pub use sessions::{SessionBackend, SessionCollection, SessionCollector, SessionsConfig};
pub use summarizer::summarize;
pub use tailer::{LogTailer, TailerConfig};
pub use usage::{UsageCollector, UsageConfig, UsageSnapshot};
