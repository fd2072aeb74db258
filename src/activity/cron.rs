//! Scheduled job listing
//!
//! Cron absence is expected: a missing tool, a non-zero exit, or a timeout
//! all yield an empty list without a warning.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use super::schema::CronJob;
use super::text::clean_label;
use crate::source::CommandRunner;

/// Schedule shown when a row carries no recognizable expression
pub const DEFAULT_SCHEDULE: &str = "scheduled";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    pub args: Vec<String>,
    pub max_jobs: usize,
    pub name_max_chars: usize,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            args: vec!["cron".to_string(), "list".to_string()],
            max_jobs: 10,
            name_max_chars: 60,
        }
    }
}

fn header_pattern() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        // A header keyword must stand alone as the first column
        Regex::new(r"^(?:Job|ID|Name)(?:\s*$|\s{2,}|\t|\s*\|)|^-|-{5,}|^No (?:cron )?jobs")
            .expect("valid header pattern")
    })
}

fn column_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s+\|\s+|\t+|\s{2,}").expect("valid separator pattern"))
}

fn schedule_pattern() -> &'static Regex {
    static SCHEDULE: OnceLock<Regex> = OnceLock::new();
    SCHEDULE.get_or_init(|| {
        // Five or six cron fields, or an interval like "every 30m"
        Regex::new(
            r"(?i)(?:^|\s)((?:[\d*/,\-?LW#]+\s+){4,5}[\d*/,\-?LW#A-Za-z]+)(?:\s|$)|\b(every\s+\d+\s*[smhdw])\b",
        )
        .expect("valid schedule pattern")
    })
}

/// Pull a schedule expression out of a row, if one is present
fn detect_schedule(columns: &[&str]) -> Option<String> {
    columns.iter().skip(1).find_map(|column| {
        let caps = schedule_pattern().captures(column)?;
        caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
    })
}

/// Parse the plain-text listing into jobs, in source order
pub fn parse_cron_listing(output: &str, config: &CronConfig) -> Vec<CronJob> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !header_pattern().is_match(line))
        .take(config.max_jobs)
        .map(|line| {
            let columns: Vec<&str> = column_separator()
                .split(line)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();
            let name = columns.first().copied().unwrap_or(line);
            CronJob {
                name: clean_label(name, config.name_max_chars),
                schedule: detect_schedule(&columns).unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
            }
        })
        .collect()
}

pub struct CronCollector {
    config: CronConfig,
    program: String,
}

impl CronCollector {
    pub fn new(config: CronConfig, program: impl Into<String>) -> Self {
        Self {
            config,
            program: program.into(),
        }
    }

    pub async fn collect<R: CommandRunner>(&self, runner: &R, limit: Duration) -> Vec<CronJob> {
        match runner.run(&self.program, &self.config.args, limit).await {
            Ok(output) if output.success() => parse_cron_listing(&output.stdout, &self.config),
            Ok(output) => {
                debug!("Cron listing exited with {:?}", output.code);
                Vec::new()
            }
            Err(e) => {
                debug!("Cron listing unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// The listing command exits 0
    pub async fn probe<R: CommandRunner>(&self, runner: &R, limit: Duration) -> bool {
        runner
            .run(&self.program, &self.config.args, limit)
            .await
            .map(|o| o.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::command::testing::{FakeRunner, Scripted};

    const LIMIT: Duration = Duration::from_secs(10);

    #[test]
    fn test_skips_headers_and_separators() {
        let output = "\
Job                 Schedule        Next run
------------------  --------------  --------
daily-digest        0 9 * * *       in 3h
inbox-sweep         every 30m       in 12m
";
        let jobs = parse_cron_listing(output, &CronConfig::default());
        assert_eq!(
            jobs,
            vec![
                CronJob {
                    name: "daily-digest".to_string(),
                    schedule: "0 9 * * *".to_string()
                },
                CronJob {
                    name: "inbox-sweep".to_string(),
                    schedule: "every 30m".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_jobs_named_like_header_words_are_kept() {
        let output = "\
ID    Name        Schedule
Name-sync  0 1 * * *
IDle-check  every 5m
Job runner  every 1h
Jobs.cleanup  0 4 * * *
";
        let jobs = parse_cron_listing(output, &CronConfig::default());
        let names: Vec<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["Name-sync", "IDle-check", "Job runner", "Jobs.cleanup"]);
        assert_eq!(jobs[0].schedule, "0 1 * * *");
        assert_eq!(jobs[1].schedule, "every 5m");
    }

    #[test]
    fn test_header_variants_skipped() {
        let output = "Job
Name		Schedule
Job | Schedule
backup  0 3 * * *
";
        let jobs = parse_cron_listing(output, &CronConfig::default());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "backup");
    }

    #[test]
    fn test_unknown_schedule_and_single_column() {
        let jobs = parse_cron_listing("weekly report\n", &CronConfig::default());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "weekly report");
        assert_eq!(jobs[0].schedule, DEFAULT_SCHEDULE);
    }

    #[test]
    fn test_name_truncated() {
        let line = "n".repeat(100);
        let jobs = parse_cron_listing(&line, &CronConfig::default());
        assert_eq!(jobs[0].name.chars().count(), 60);
        assert!(jobs[0].name.ends_with('…'));
    }

    #[test]
    fn test_capped_in_source_order() {
        let output: String = (0..25).map(|i| format!("job-{}\n", i)).collect();
        let jobs = parse_cron_listing(&output, &CronConfig::default());
        assert_eq!(jobs.len(), 10);
        assert_eq!(jobs[0].name, "job-0");
        assert_eq!(jobs[9].name, "job-9");
    }

    #[test]
    fn test_empty_listing() {
        assert!(parse_cron_listing("No cron jobs configured.\n", &CronConfig::default()).is_empty());
        assert!(parse_cron_listing("", &CronConfig::default()).is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_silent() {
        let collector = CronCollector::new(CronConfig::default(), "openclaw");

        assert!(collector.collect(&FakeRunner::new(), LIMIT).await.is_empty());

        let runner = FakeRunner::new().on("openclaw cron list", Scripted::Exit(2, "job-a\n", "boom"));
        assert!(collector.collect(&runner, LIMIT).await.is_empty());
        assert!(!collector.probe(&runner, LIMIT).await);

        let runner = FakeRunner::new().on("openclaw cron list", Scripted::Timeout);
        assert!(collector.collect(&runner, LIMIT).await.is_empty());
    }

    #[tokio::test]
    async fn test_collect() {
        let runner = FakeRunner::new().ok("openclaw cron list", "Job  Schedule\nbackup  0 3 * * *\n");
        let collector = CronCollector::new(CronConfig::default(), "openclaw");
        let jobs = collector.collect(&runner, LIMIT).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "backup");
        assert_eq!(jobs[0].schedule, "0 3 * * *");
        assert!(collector.probe(&runner, LIMIT).await);
    }
}
