//! Session records mapped to task rows
//!
//! Session data comes from exactly one backend chosen at startup:
//! - `command`: JSON printed by `<cli> sessions --json`
//! - `file`: the gateway's JSON session store on disk
//! - `subagents`: the plain-text `<cli> subagents list` table
//!
//! Age semantics differ per backend and are fixed here: the `command` and
//! `file` backends classify on time since the record's `updatedAt` (last
//! activity). The `subagents` table has no timestamps, so its rows are
//! classified by the status word printed on each row.

use anyhow::{Context, Result};
use chrono::DateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::classifier::AgeClassifier;
use super::schema::{Task, TaskStatus};
use super::text::{clean_label, truncate_chars};
use crate::source::{Clock, CommandError, CommandRunner};

/// Name shown for sessions without a label
pub const DEFAULT_LABEL: &str = "Untitled session";

/// Longest diagnostic carried in a warning
const MAX_DIAGNOSTIC_CHARS: usize = 160;

/// Which backend supplies session records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Command,
    File,
    Subagents,
}

/// Configuration for session collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub backend: SessionBackend,
    /// Session store read by the `file` backend
    pub store_path: PathBuf,
    /// Arguments for the `command` backend
    pub args: Vec<String>,
    /// Arguments for the `subagents` backend
    pub subagents_args: Vec<String>,
    /// Keys matching this regex are not shown (empty disables)
    pub exclude_key_pattern: String,
    pub max_tasks: usize,
    pub name_max_chars: usize,
    pub summary_max_chars: usize,
    pub todo_below_mins: u64,
    pub pending_below_mins: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        let store_path = directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".openclaw/agents/main/sessions/sessions.json");

        Self {
            backend: SessionBackend::Command,
            store_path,
            args: vec!["sessions".to_string(), "--json".to_string()],
            subagents_args: vec!["subagents".to_string(), "list".to_string()],
            exclude_key_pattern: r"(^|:)slash(:|$)".to_string(),
            max_tasks: 100,
            name_max_chars: 70,
            summary_max_chars: 120,
            todo_below_mins: 20,
            pending_below_mins: 120,
        }
    }
}

/// Instant as either epoch milliseconds or an RFC 3339 string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl RawInstant {
    fn to_millis(&self) -> Option<i64> {
        match self {
            RawInstant::Millis(ms) => Some(*ms),
            RawInstant::Fractional(ms) => Some(*ms as i64),
            RawInstant::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|t| t.timestamp_millis())
                .or_else(|| text.trim().parse().ok()),
        }
    }
}

/// One session record as the backends report it
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSession {
    #[serde(default, alias = "sessionKey")]
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    updated_at: Option<RawInstant>,
    #[serde(default, rename = "abortedLastRun", alias = "aborted")]
    pub aborted: bool,
    #[serde(default, rename = "spawnedBy", alias = "parentKey")]
    pub parent: Option<String>,
    /// Upstream status word, when the backend reports one
    #[serde(default)]
    pub status: Option<String>,
}

impl RawSession {
    pub fn updated_at_millis(&self) -> Option<i64> {
        self.updated_at.as_ref().and_then(RawInstant::to_millis)
    }

    /// Label, falling back to the display name
    pub fn title(&self) -> Option<&str> {
        [self.label.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
    }

    pub fn with_updated_at(mut self, millis: i64) -> Self {
        self.updated_at = Some(RawInstant::Millis(millis));
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionList {
    List(Vec<RawSession>),
    Map(BTreeMap<String, RawSession>),
}

impl SessionList {
    fn into_records(self) -> Vec<RawSession> {
        match self {
            SessionList::List(records) => records,
            SessionList::Map(map) => map
                .into_iter()
                .map(|(key, mut record)| {
                    if record.key.is_empty() {
                        record.key = key;
                    }
                    record
                })
                .collect(),
        }
    }
}

/// Accepted payload shapes: a bare list, `{"sessions": ...}`, or a keyed map
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionsPayload {
    Wrapped { sessions: SessionList },
    Bare(SessionList),
}

/// Parse a JSON sessions payload
pub fn parse_sessions_payload(payload: &str) -> Result<Vec<RawSession>> {
    let payload: SessionsPayload =
        serde_json::from_str(payload.trim()).context("Failed to parse sessions JSON")?;
    Ok(match payload {
        SessionsPayload::Wrapped { sessions } => sessions.into_records(),
        SessionsPayload::Bare(list) => list.into_records(),
    })
}

/// Parse the plain-text subagent table
///
/// Header and separator lines are skipped; a row is kept only when it
/// mentions a status word, checked in the order completed, failed, todo,
/// running/pending.
pub fn parse_subagent_table(output: &str) -> Vec<RawSession> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Session") && !line.starts_with('-'))
        // A row needs at least a name and a status column
        .filter(|line| line.split_whitespace().count() >= 2)
        .filter_map(|line| {
            let lower = line.to_lowercase();
            let status = ["completed", "failed", "todo", "running", "pending"]
                .into_iter()
                .find(|word| lower.contains(word))?;
            Some(RawSession {
                label: Some(line.to_string()),
                status: Some(status.to_string()),
                ..Default::default()
            })
        })
        .collect()
}

/// Why a session fetch produced nothing
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sessions backend not found: {0}")]
    Missing(String),
    #[error("sessions query timed out after {0}s")]
    TimedOut(u64),
    #[error("sessions query failed: {0}")]
    Failed(String),
    #[error("sessions payload malformed: {0}")]
    Malformed(String),
    #[error("sessions store unreadable: {0}")]
    Unreadable(String),
}

impl From<CommandError> for FetchError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(program) => FetchError::Missing(program),
            CommandError::TimedOut { secs, .. } => FetchError::TimedOut(secs),
            CommandError::Io { .. } => FetchError::Failed(err.to_string()),
        }
    }
}

fn diagnostic(err: &anyhow::Error) -> String {
    truncate_chars(&format!("{:#}", err), MAX_DIAGNOSTIC_CHARS)
}

/// Tasks from one collection, plus the warning to surface when it failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCollection {
    pub tasks: Vec<Task>,
    pub warning: Option<String>,
    /// Kept tasks whose upstream status word was not understood
    pub unrecognized: usize,
}

impl SessionCollection {
    pub fn failed(warning: impl Into<String>) -> Self {
        Self {
            warning: Some(warning.into()),
            ..Default::default()
        }
    }
}

/// Collects session records and maps them to tasks
pub struct SessionCollector {
    config: SessionsConfig,
    program: String,
    classifier: AgeClassifier,
    exclude: Option<Regex>,
}

impl SessionCollector {
    pub fn new(config: SessionsConfig, program: impl Into<String>) -> Result<Self> {
        let exclude = if config.exclude_key_pattern.is_empty() {
            None
        } else {
            Some(Regex::new(&config.exclude_key_pattern).with_context(|| {
                format!("Invalid exclude_key_pattern {:?}", config.exclude_key_pattern)
            })?)
        };

        Ok(Self {
            classifier: AgeClassifier::from_minutes(
                config.todo_below_mins,
                config.pending_below_mins,
            ),
            config,
            program: program.into(),
            exclude,
        })
    }

    pub fn backend(&self) -> SessionBackend {
        self.config.backend
    }

    /// Fetch and map sessions; failures become an empty list plus a warning
    pub async fn collect<R: CommandRunner, C: Clock>(
        &self,
        runner: &R,
        clock: &C,
        limit: Duration,
    ) -> SessionCollection {
        match self.fetch(runner, limit).await {
            Ok(records) => self.map_records(records, clock.now_millis()),
            Err(e) => {
                warn!("Session collection ({:?} backend) failed: {}", self.backend(), e);
                SessionCollection::failed(e.to_string())
            }
        }
    }

    /// Raw records from the configured backend
    pub async fn fetch<R: CommandRunner>(
        &self,
        runner: &R,
        limit: Duration,
    ) -> Result<Vec<RawSession>, FetchError> {
        match self.config.backend {
            SessionBackend::Command => {
                let stdout = self.run_checked(runner, &self.config.args, limit).await?;
                parse_sessions_payload(&stdout).map_err(|e| FetchError::Malformed(diagnostic(&e)))
            }
            SessionBackend::File => {
                let path = &self.config.store_path;
                let bytes = match tokio::fs::read(path).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(FetchError::Missing(path.display().to_string()));
                    }
                    Err(e) => return Err(FetchError::Unreadable(e.to_string())),
                };
                parse_sessions_payload(&String::from_utf8_lossy(&bytes))
                    .map_err(|e| FetchError::Malformed(diagnostic(&e)))
            }
            SessionBackend::Subagents => {
                let stdout = self
                    .run_checked(runner, &self.config.subagents_args, limit)
                    .await?;
                Ok(parse_subagent_table(&stdout))
            }
        }
    }

    async fn run_checked<R: CommandRunner>(
        &self,
        runner: &R,
        args: &[String],
        limit: Duration,
    ) -> Result<String, FetchError> {
        let output = runner.run(&self.program, args, limit).await?;
        if !output.success() {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                match output.code {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                }
            } else {
                truncate_chars(stderr, MAX_DIAGNOSTIC_CHARS)
            };
            return Err(FetchError::Failed(reason));
        }
        Ok(output.stdout)
    }

    /// Whether the backend answers at all
    pub async fn probe<R: CommandRunner>(&self, runner: &R, limit: Duration) -> bool {
        match self.config.backend {
            SessionBackend::File => tokio::fs::metadata(&self.config.store_path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            SessionBackend::Command => runner
                .run(&self.program, &self.config.args, limit)
                .await
                .map(|o| o.success())
                .unwrap_or(false),
            SessionBackend::Subagents => runner
                .run(&self.program, &self.config.subagents_args, limit)
                .await
                .map(|o| o.success())
                .unwrap_or(false),
        }
    }

    /// Map records to sorted, capped tasks using one clock reading
    pub fn map_records(&self, records: Vec<RawSession>, now_ms: i64) -> SessionCollection {
        let total = records.len();
        let mut rows: Vec<(Task, bool)> = records
            .iter()
            .filter(|r| !self.is_excluded(&r.key))
            .map(|r| self.to_task(r, now_ms))
            .collect();

        // Stable: equal timestamps keep record order
        rows.sort_by(|a, b| b.0.updated_at_millis.cmp(&a.0.updated_at_millis));
        rows.truncate(self.config.max_tasks);

        let unrecognized = rows.iter().filter(|(_, unknown)| *unknown).count();
        let tasks: Vec<Task> = rows.into_iter().map(|(task, _)| task).collect();

        debug!(
            "Mapped {} of {} session records ({} unrecognized status)",
            tasks.len(),
            total,
            unrecognized
        );

        SessionCollection {
            tasks,
            warning: None,
            unrecognized,
        }
    }

    fn is_excluded(&self, key: &str) -> bool {
        self.exclude
            .as_ref()
            .map(|re| !key.is_empty() && re.is_match(key))
            .unwrap_or(false)
    }

    /// Returns the task and whether the upstream status word was unknown
    fn to_task(&self, record: &RawSession, now_ms: i64) -> (Task, bool) {
        let updated = record.updated_at_millis();
        let (status, unrecognized) = self.status_for(record, updated, now_ms);

        let label = record.title().unwrap_or(DEFAULT_LABEL);

        let task = Task {
            name: clean_label(label, self.config.name_max_chars),
            summary: clean_label(&summary_for(record), self.config.summary_max_chars),
            status,
            updated_at_millis: updated.unwrap_or(0),
        };
        (task, unrecognized)
    }

    fn status_for(
        &self,
        record: &RawSession,
        updated: Option<i64>,
        now_ms: i64,
    ) -> (TaskStatus, bool) {
        if record.aborted {
            return (TaskStatus::Failed, false);
        }

        let mut unrecognized = false;
        if let Some(word) = record.status.as_deref().filter(|w| !w.trim().is_empty()) {
            match TaskStatus::from_vocabulary(word) {
                Some(status) => return (status, false),
                None => {
                    debug!("Unrecognized status {:?} for session {:?}", word, record.key);
                    unrecognized = true;
                }
            }
        }

        let status = match updated {
            // Age = time since last update
            Some(updated) => {
                let age_ms = now_ms.saturating_sub(updated).max(0) as u64;
                self.classifier.classify(age_ms, false)
            }
            None => TaskStatus::Pending,
        };
        (status, unrecognized)
    }
}

fn summary_for(record: &RawSession) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(model) = record.model.as_deref().filter(|m| !m.is_empty()) {
        parts.push(model.to_string());
    }
    if let Some(parent) = record.parent.as_deref().filter(|p| !p.is_empty()) {
        parts.push(format!("spawned by {}", parent));
    }
    if parts.is_empty() {
        return record.key.clone();
    }
    parts.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::command::testing::{FakeRunner, Scripted};
    use crate::source::FixedClock;
    use std::io::Write;
    use tempfile::tempdir;

    const MINUTE: i64 = 60_000;
    const NOW: i64 = 1_769_900_000_000;
    const LIMIT: Duration = Duration::from_secs(10);

    fn collector(config: SessionsConfig) -> SessionCollector {
        SessionCollector::new(config, "openclaw").unwrap()
    }

    fn record(key: &str, label: &str, updated: i64) -> RawSession {
        RawSession {
            key: key.to_string(),
            label: Some(label.to_string()),
            model: Some("claude-sonnet".to_string()),
            ..Default::default()
        }
        .with_updated_at(updated)
    }

    #[test]
    fn test_parse_wrapped_payload() {
        let json = r#"{
            "path": "/x/sessions.json",
            "count": 2,
            "sessions": [
                {"key": "agent:main:main", "label": "Main", "model": "gpt-5", "updatedAt": 1769899990000, "abortedLastRun": false},
                {"key": "agent:main:subagent:1", "displayName": "Research", "updatedAt": "2026-01-31T22:00:00Z", "spawnedBy": "agent:main:main", "abortedLastRun": true}
            ]
        }"#;
        let records = parse_sessions_payload(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].updated_at_millis(), Some(1_769_899_990_000));
        assert_eq!(records[1].title(), Some("Research"));
        assert_eq!(records[1].parent.as_deref(), Some("agent:main:main"));
        assert!(records[1].aborted);
        assert_eq!(
            records[1].updated_at_millis(),
            Some(DateTime::parse_from_rfc3339("2026-01-31T22:00:00Z").unwrap().timestamp_millis())
        );
    }

    #[test]
    fn test_parse_keyed_store() {
        let json = r#"{
            "agent:main:main": {"updatedAt": 100, "model": "m"},
            "agent:main:subagent:9": {"updatedAt": 200, "label": "Child"}
        }"#;
        let records = parse_sessions_payload(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "agent:main:main");
        assert_eq!(records[1].key, "agent:main:subagent:9");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_sessions_payload("not json").is_err());
        assert!(parse_sessions_payload(r#"{"sessions": 5}"#).is_err());
    }

    #[test]
    fn test_parse_subagent_table() {
        let output = "\
Session              Status      Age
-------------------  ----------  ----
research-task        running     3m
build-fix            completed   1h
idle-thing           sleeping    2h
write-docs           FAILED      5m
completed
";
        let records = parse_subagent_table(output);
        let statuses: Vec<&str> = records.iter().filter_map(|r| r.status.as_deref()).collect();
        // The bare single-word row is not a session
        assert_eq!(statuses, vec!["running", "completed", "failed"]);
        assert_eq!(records.len(), 3);
        assert!(records[0].label.as_deref().unwrap().starts_with("research-task"));
    }

    #[test]
    fn test_sorted_most_recent_first() {
        let c = collector(SessionsConfig::default());
        let records = vec![
            record("a", "older", NOW - 300 * MINUTE),
            record("b", "newer", NOW - 2 * MINUTE),
            record("c", "middle", NOW - 60 * MINUTE),
        ];
        let out = c.map_records(records, NOW);
        let names: Vec<&str> = out.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "middle", "older"]);
        assert_eq!(out.tasks[0].status, TaskStatus::Todo);
        assert_eq!(out.tasks[1].status, TaskStatus::Pending);
        assert_eq!(out.tasks[2].status, TaskStatus::Completed);
    }

    #[test]
    fn test_ties_keep_record_order() {
        let c = collector(SessionsConfig::default());
        let records = vec![
            record("a", "first", NOW - MINUTE),
            record("b", "second", NOW - MINUTE),
            record("c", "third", NOW - MINUTE),
        ];
        let out = c.map_records(records, NOW);
        let names: Vec<&str> = out.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_abort_overrides_recency() {
        let c = collector(SessionsConfig::default());
        let mut r = record("agent:main:subagent:1", "recent but aborted", NOW - 5 * MINUTE);
        r.aborted = true;
        r.status = Some("completed".to_string());
        let out = c.map_records(vec![r], NOW);
        assert_eq!(out.tasks[0].status, TaskStatus::Failed);
    }

    #[test]
    fn test_structured_status_and_unrecognized() {
        let c = collector(SessionsConfig::default());
        let mut known = record("k", "known", NOW - 5 * MINUTE);
        known.status = Some("done".to_string());
        let mut unknown = record("u", "unknown", NOW - 5 * MINUTE);
        unknown.status = Some("hibernating".to_string());

        let out = c.map_records(vec![known, unknown], NOW);
        assert_eq!(out.tasks[0].status, TaskStatus::Completed);
        // Falls back to age
        assert_eq!(out.tasks[1].status, TaskStatus::Todo);
        assert_eq!(out.unrecognized, 1);
    }

    #[test]
    fn test_exclusion_and_defaults() {
        let c = collector(SessionsConfig::default());
        let slash = record("agent:main:telegram:slash:42", "/status", NOW);
        let unlabeled = RawSession {
            key: "agent:main:cron:1".to_string(),
            ..Default::default()
        };
        let out = c.map_records(vec![slash, unlabeled], NOW);
        assert_eq!(out.tasks.len(), 1);
        assert_eq!(out.tasks[0].name, DEFAULT_LABEL);
        assert_eq!(out.tasks[0].summary, "agent:main:cron:1");
        // No timestamp at all
        assert_eq!(out.tasks[0].status, TaskStatus::Pending);
        assert_eq!(out.tasks[0].updated_at_millis, 0);
    }

    #[test]
    fn test_truncation_and_whitespace() {
        let c = collector(SessionsConfig::default());
        let mut r = record("k", &format!("Fix   the\n{}", "x".repeat(200)), NOW);
        r.parent = Some("agent:main:main".to_string());
        let out = c.map_records(vec![r], NOW);
        let task = &out.tasks[0];
        assert_eq!(task.name.chars().count(), 70);
        assert!(task.name.starts_with("Fix the x"));
        assert!(task.name.ends_with('…'));
        assert_eq!(task.summary, "claude-sonnet · spawned by agent:main:main");
    }

    #[test]
    fn test_cap() {
        let c = collector(SessionsConfig {
            max_tasks: 3,
            ..Default::default()
        });
        let records = (0..10).map(|i| record(&i.to_string(), "t", NOW - i)).collect();
        let out = c.map_records(records, NOW);
        assert_eq!(out.tasks.len(), 3);
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let c = collector(SessionsConfig::default());
        let out = c.map_records(vec![record("k", "t", NOW + 10 * MINUTE)], NOW);
        assert_eq!(out.tasks[0].status, TaskStatus::Todo);
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let config = SessionsConfig {
            exclude_key_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(SessionCollector::new(config, "openclaw").is_err());
    }

    #[tokio::test]
    async fn test_command_failure_warning() {
        let runner = FakeRunner::new().on("openclaw sessions --json", Scripted::Exit(1, "", "not found\n"));
        let c = collector(SessionsConfig::default());
        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert!(out.tasks.is_empty());
        assert_eq!(out.warning.as_deref(), Some("sessions query failed: not found"));
    }

    #[tokio::test]
    async fn test_command_missing_and_timeout() {
        let c = collector(SessionsConfig::default());

        let out = c.collect(&FakeRunner::new(), &FixedClock(NOW), LIMIT).await;
        assert_eq!(out.warning.as_deref(), Some("sessions backend not found: openclaw"));

        let runner = FakeRunner::new().on("openclaw sessions --json", Scripted::Missing);
        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert!(out.tasks.is_empty());
        assert!(out.warning.is_some());

        let runner = FakeRunner::new().on("openclaw sessions --json", Scripted::Timeout);
        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert!(out.tasks.is_empty());
        assert_eq!(out.warning.as_deref(), Some("sessions query timed out after 10s"));
    }

    #[tokio::test]
    async fn test_command_malformed_payload() {
        let runner = FakeRunner::new().ok("openclaw sessions --json", "{ nope");
        let c = collector(SessionsConfig::default());
        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert!(out.tasks.is_empty());
        let warning = out.warning.unwrap();
        assert!(warning.starts_with("sessions payload malformed:"));
        assert!(!warning.contains("{ nope"));
    }

    #[tokio::test]
    async fn test_command_success() {
        let runner = FakeRunner::new().ok(
            "openclaw sessions --json",
            r#"[{"key":"agent:main:main","label":"Main","updatedAt":1769899700000}]"#,
        );
        let c = collector(SessionsConfig::default());
        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert_eq!(out.warning, None);
        assert_eq!(out.tasks.len(), 1);
        assert_eq!(out.tasks[0].status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn test_file_backend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"agent:main:subagent:1": {{"label": "Crawl", "updatedAt": {}, "abortedLastRun": false}}}}"#,
            NOW - 3 * 60 * MINUTE
        )
        .unwrap();

        let c = collector(SessionsConfig {
            backend: SessionBackend::File,
            store_path: path.clone(),
            ..Default::default()
        });
        let runner = FakeRunner::new();
        assert!(c.probe(&runner, LIMIT).await);

        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert_eq!(out.warning, None);
        assert_eq!(out.tasks[0].name, "Crawl");
        assert_eq!(out.tasks[0].status, TaskStatus::Completed);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_backend_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let c = collector(SessionsConfig {
            backend: SessionBackend::File,
            store_path: path.clone(),
            ..Default::default()
        });
        let runner = FakeRunner::new();
        assert!(!c.probe(&runner, LIMIT).await);

        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        assert!(out.tasks.is_empty());
        assert_eq!(
            out.warning,
            Some(format!("sessions backend not found: {}", path.display()))
        );
    }

    #[tokio::test]
    async fn test_subagents_backend() {
        let runner = FakeRunner::new().ok(
            "openclaw subagents list",
            "Session  Status\n-------  ------\nalpha    running\nbeta     completed\n",
        );
        let c = collector(SessionsConfig {
            backend: SessionBackend::Subagents,
            ..Default::default()
        });
        assert_eq!(c.backend(), SessionBackend::Subagents);
        let out = c.collect(&runner, &FixedClock(NOW), LIMIT).await;
        let statuses: Vec<TaskStatus> = out.tasks.iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec![TaskStatus::Pending, TaskStatus::Completed]);
        assert_eq!(out.tasks[0].name, "alpha running");
    }
}
