//! Optional account and session usage figures
//!
//! Entirely best-effort: anything that goes wrong yields `None`, which the
//! renderer treats as "omit this panel".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::source::CommandRunner;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub enabled: bool,
    pub args: Vec<String>,
    pub top_sessions: usize,
    pub main_session_key: String,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            args: vec![
                "status".to_string(),
                "--usage".to_string(),
                "--json".to_string(),
            ],
            top_sessions: 5,
            main_session_key: "agent:main:main".to_string(),
        }
    }
}

/// A quota window such as "5h" or "week"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    pub label: String,
    pub used_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUsage {
    pub key: String,
    pub total_tokens: u64,
    pub context_tokens: Option<u64>,
    /// `total_tokens / context_tokens`, absent without a non-zero context size
    pub context_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub windows: Vec<UsageWindow>,
    /// Largest sessions by token volume, main session excluded
    pub top_sessions: Vec<SessionUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_session: Option<SessionUsage>,
}

impl UsageSnapshot {
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty() && self.top_sessions.is_empty() && self.main_session.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawWindow {
    #[serde(alias = "name")]
    label: Option<String>,
    used_percent: Option<f64>,
    used: Option<f64>,
    limit: Option<f64>,
}

impl RawWindow {
    fn into_window(self) -> Option<UsageWindow> {
        let label = self.label.filter(|l| !l.trim().is_empty())?;
        let used_percent = self.used_percent.or_else(|| ratio(self.used, self.limit).map(|r| r * 100.0));
        Some(UsageWindow {
            label,
            used_percent,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawProvider {
    windows: Vec<RawWindow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawUsage {
    windows: Vec<RawWindow>,
    providers: Vec<RawProvider>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSessionUsage {
    key: String,
    total_tokens: Option<u64>,
    context_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSessions {
    List(Vec<RawSessionUsage>),
    Grouped {
        #[serde(default)]
        recent: Vec<RawSessionUsage>,
    },
}

impl Default for RawSessions {
    fn default() -> Self {
        RawSessions::List(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    usage: Option<RawUsage>,
    windows: Vec<RawWindow>,
    sessions: RawSessions,
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 && n.is_finite() => Some(n / d),
        _ => None,
    }
}

impl RawSessionUsage {
    fn into_usage(self) -> Option<SessionUsage> {
        let total_tokens = self.total_tokens?;
        Some(SessionUsage {
            context_ratio: ratio(
                Some(total_tokens as f64),
                self.context_tokens.map(|c| c as f64),
            ),
            key: self.key,
            total_tokens,
            context_tokens: self.context_tokens,
        })
    }
}

/// Build a snapshot from the status JSON
pub fn parse_usage(payload: &str, config: &UsageConfig) -> Result<UsageSnapshot> {
    let raw: RawStatus = serde_json::from_str(payload.trim()).context("Failed to parse usage JSON")?;

    let mut raw_windows = raw.windows;
    if let Some(usage) = raw.usage {
        raw_windows.extend(usage.windows);
        raw_windows.extend(usage.providers.into_iter().flat_map(|p| p.windows));
    }
    let windows = raw_windows
        .into_iter()
        .filter_map(RawWindow::into_window)
        .collect();

    let sessions = match raw.sessions {
        RawSessions::List(list) => list,
        RawSessions::Grouped { recent } => recent,
    };

    let mut main_session = None;
    let mut others = Vec::new();
    for session in sessions.into_iter().filter_map(RawSessionUsage::into_usage) {
        if session.key == config.main_session_key && main_session.is_none() {
            main_session = Some(session);
        } else if session.key != config.main_session_key {
            others.push(session);
        }
    }
    others.sort_by(|a, b| b.total_tokens.cmp(&a.total_tokens));
    others.truncate(config.top_sessions);

    Ok(UsageSnapshot {
        windows,
        top_sessions: others,
        main_session,
    })
}

pub struct UsageCollector {
    config: UsageConfig,
    program: String,
}

impl UsageCollector {
    pub fn new(config: UsageConfig, program: impl Into<String>) -> Self {
        Self {
            config,
            program: program.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn collect<R: CommandRunner>(&self, runner: &R, limit: Duration) -> Option<UsageSnapshot> {
        if !self.is_enabled() {
            return None;
        }

        let output = match runner.run(&self.program, &self.config.args, limit).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                debug!("Usage query exited with {:?}", output.code);
                return None;
            }
            Err(e) => {
                debug!("Usage query unavailable: {}", e);
                return None;
            }
        };

        match parse_usage(&output.stdout, &self.config) {
            Ok(snapshot) if !snapshot.is_empty() => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                debug!("Usage payload ignored: {:#}", e);
                None
            }
        }
    }
}
