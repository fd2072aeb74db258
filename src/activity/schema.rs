//! Snapshot data model shared by the collectors and the presentation layer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::usage::UsageSnapshot;

/// Lifecycle status of a unit of delegated work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Freshly delegated, not yet picked up
    Todo,
    /// In flight
    Pending,
    /// Presumed finished
    Completed,
    /// Aborted or errored
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::Pending,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Map an upstream status word onto the four known states
    ///
    /// Returns `None` for vocabulary this dashboard does not understand.
    pub fn from_vocabulary(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "todo" | "queued" | "new" | "created" => Some(TaskStatus::Todo),
            "pending" | "running" | "in_progress" | "in-progress" | "active" | "working" => {
                Some(TaskStatus::Pending)
            }
            "completed" | "complete" | "done" | "succeeded" | "success" | "finished" => {
                Some(TaskStatus::Completed)
            }
            "failed" | "failure" | "error" | "errored" | "aborted" | "cancelled" | "canceled" => {
                Some(TaskStatus::Failed)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One kept log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Source-formatted timestamp, never reparsed (empty when unknown)
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }
}

/// A session rendered as a task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub summary: String,
    pub status: TaskStatus,
    /// Only meaningful for ordering within one collection
    pub updated_at_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJob {
    pub name: String,
    pub schedule: String,
}

/// Status counters for the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub todo: usize,
    /// Records whose upstream status word was not understood and were
    /// classified by age instead
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unrecognized: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Stats {
    pub fn tally(tasks: &[Task], unrecognized: usize) -> Self {
        let mut stats = Stats {
            unrecognized,
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Todo => stats.todo += 1,
            }
        }
        stats
    }

    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
            TaskStatus::Todo => self.todo,
        }
    }
}

/// Result of one collection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Oldest first
    pub logs: Vec<LogEntry>,
    /// Most recent first
    pub tasks: Vec<Task>,
    pub cron_jobs: Vec<CronJob>,
    pub stats: Stats,
    /// Session source failure, the one failure surfaced to operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

/// Bare availability of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHealth {
    pub name: String,
    pub available: bool,
}

impl SourceHealth {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Health endpoint payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub sources: BTreeMap<String, bool>,
}

impl HealthReport {
    /// `ok` requires every `required` source to be present and available
    pub fn from_sources(sources: &[SourceHealth], required: &[&str]) -> Self {
        let sources: BTreeMap<String, bool> = sources
            .iter()
            .map(|s| (s.name.clone(), s.available))
            .collect();

        let all_required = required
            .iter()
            .all(|name| sources.get(*name).copied().unwrap_or(false));

        Self {
            status: if all_required {
                HealthStatus::Ok
            } else {
                HealthStatus::Degraded
            },
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> Task {
        Task {
            name: "t".to_string(),
            summary: String::new(),
            status,
            updated_at_millis: 0,
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let parsed: TaskStatus = serde_json::from_str("\"todo\"").unwrap();
        assert_eq!(parsed, TaskStatus::Todo);
    }

    #[test]
    fn test_vocabulary_lookup() {
        assert_eq!(TaskStatus::from_vocabulary("Running"), Some(TaskStatus::Pending));
        assert_eq!(TaskStatus::from_vocabulary(" done "), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::from_vocabulary("aborted"), Some(TaskStatus::Failed));
        assert_eq!(TaskStatus::from_vocabulary("queued"), Some(TaskStatus::Todo));
        assert_eq!(TaskStatus::from_vocabulary("sleeping"), None);
    }

    #[test]
    fn test_stats_tally() {
        let tasks = vec![
            task(TaskStatus::Pending),
            task(TaskStatus::Pending),
            task(TaskStatus::Failed),
            task(TaskStatus::Todo),
        ];
        let stats = Stats::tally(&tasks, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.todo, 1);
        assert_eq!(stats.unrecognized, 1);
        assert_eq!(
            TaskStatus::ALL.iter().map(|s| stats.get(*s)).sum::<usize>(),
            tasks.len()
        );
    }

    #[test]
    fn test_snapshot_omits_absent_fields() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("logs"));
        assert!(obj.contains_key("cron_jobs"));
        assert!(!obj.contains_key("warning"));
        assert!(!obj.contains_key("usage"));
        assert!(!obj["stats"].as_object().unwrap().contains_key("unrecognized"));
    }

    #[test]
    fn test_health_report_degraded_when_required_missing() {
        let sources = vec![
            SourceHealth::new("cli", false),
            SourceHealth::new("sessions", true),
            SourceHealth::new("cron", true),
        ];
        let report = HealthReport::from_sources(&sources, &["cli", "sessions"]);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.sources.get("cron"), Some(&true));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"degraded\""));
    }

    #[test]
    fn test_health_report_ok() {
        let sources = vec![SourceHealth::new("cli", true), SourceHealth::new("sessions", true)];
        let report = HealthReport::from_sources(&sources, &["cli", "sessions"]);
        assert_eq!(report.status, HealthStatus::Ok);
    }
}
