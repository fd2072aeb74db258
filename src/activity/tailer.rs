//! Tail the newest gateway log file into a bounded list of summarized entries

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::debug;

use super::schema::LogEntry;
use super::summarizer::summarize_message;

/// Bytes read per backwards step
const CHUNK_BYTES: usize = 8 * 1024;

/// Upper bound on bytes read per raw line, so one enormous line cannot make
/// a tail read unbounded
const MAX_BYTES_PER_LINE: usize = 16 * 1024;

/// Lowercase substrings that make an info/debug line worth showing
const KEEP_KEYWORDS: &[&str] = &[
    "enqueue",
    "dequeue",
    "task done",
    "run done",
    "run start",
    "tool start",
    "tool end",
    "sendmessage ok",
    "send ok",
    "deliver ok",
    "delivery ok",
    "delivered",
    "failed",
    "timeout",
    "timed out",
];

/// Configuration for log tailing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailerConfig {
    /// Directory holding the rotating log files
    pub dir: PathBuf,
    /// File name glob, e.g. `openclaw-*.log`
    pub pattern: String,
    /// Raw lines read from the end of the file
    pub max_raw_lines: usize,
    /// Entries returned after filtering
    pub max_entries: usize,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/openclaw"),
            pattern: "openclaw-*.log".to_string(),
            max_raw_lines: 250,
            max_entries: 80,
        }
    }
}

/// A log line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine<'a> {
    /// `timestamp LEVEL [subsystem] message`
    Structured {
        timestamp: &'a str,
        level: &'a str,
        subsystem: &'a str,
        message: &'a str,
    },
    /// `[timestamp] message`
    Bracketed { timestamp: &'a str, message: &'a str },
    /// Anything else
    Raw(&'a str),
}

fn structured_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d{4}-\d{2}-\d{2}[T ]\S+|\S+)\s+((?i:trace|debug|info|warn(?:ing)?|error|fatal))\s+\[([^\]]*)\]\s*(.*)$",
        )
        .expect("valid log line pattern")
    })
}

fn bracketed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[([^\]]+)\]\s*(.*)$").expect("valid bracket pattern"))
}

/// Split a trimmed log line into its parts
pub fn parse_line(line: &str) -> ParsedLine<'_> {
    if let Some(c) = structured_pattern().captures(line) {
        if let (Some(ts), Some(level), Some(subsystem), Some(message)) =
            (c.get(1), c.get(2), c.get(3), c.get(4))
        {
            return ParsedLine::Structured {
                timestamp: ts.as_str(),
                level: level.as_str(),
                subsystem: subsystem.as_str(),
                message: message.as_str(),
            };
        }
    }

    if let Some(c) = bracketed_pattern().captures(line) {
        if let (Some(ts), Some(message)) = (c.get(1), c.get(2)) {
            return ParsedLine::Bracketed {
                timestamp: ts.as_str(),
                message: message.as_str(),
            };
        }
    }

    ParsedLine::Raw(line)
}

/// Keep errors and warnings, plus lifecycle events at any level
pub fn should_keep(level: &str, message: &str) -> bool {
    let level = level.to_ascii_lowercase();
    if matches!(level.as_str(), "error" | "warn" | "warning" | "fatal") {
        return true;
    }
    let message = message.to_ascii_lowercase();
    KEEP_KEYWORDS.iter().any(|k| message.contains(k))
}

/// Turn one raw line into an entry, or `None` when it is filtered out
pub fn line_to_entry(line: &str) -> Option<LogEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (timestamp, subsystem, message) = match parse_line(line) {
        ParsedLine::Structured {
            timestamp,
            level,
            subsystem,
            message,
        } => {
            if !should_keep(level, message) {
                return None;
            }
            (timestamp, Some(subsystem), message)
        }
        ParsedLine::Bracketed { timestamp, message } => (timestamp, None, message),
        ParsedLine::Raw(message) => ("", None, message),
    };

    let summary = summarize_message(subsystem, message);
    if summary.is_empty() {
        return None;
    }
    Some(LogEntry::new(timestamp, summary))
}

/// Log tailer over a directory of rotating files
#[derive(Debug, Clone)]
pub struct LogTailer {
    config: TailerConfig,
}

impl LogTailer {
    pub fn new(config: TailerConfig) -> Self {
        Self { config }
    }

    /// Tail the newest log file; never fails
    ///
    /// A missing directory or file yields no entries. Any other failure is
    /// reported as a single entry carrying the error text.
    pub fn tail(&self) -> Vec<LogEntry> {
        match self.try_tail() {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Log tail failed: {:#}", e);
                vec![LogEntry::new("", format!("Error reading logs: {:#}", e))]
            }
        }
    }

    fn try_tail(&self) -> Result<Vec<LogEntry>> {
        let Some(path) = self.newest_file()? else {
            return Ok(Vec::new());
        };

        let lines = match read_tail_lines(&path, self.config.max_raw_lines) {
            Ok(lines) => lines,
            Err(e) if is_not_found(&e) => {
                // Rotated away between listing and opening
                debug!("Log file vanished: {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut entries: Vec<LogEntry> = lines.iter().filter_map(|l| line_to_entry(l)).collect();
        if entries.len() > self.config.max_entries {
            entries = entries.split_off(entries.len() - self.config.max_entries);
        }

        debug!(
            "Tailed {} ({} raw lines, {} entries)",
            path.display(),
            lines.len(),
            entries.len()
        );
        Ok(entries)
    }

    /// Most recently modified file in the directory matching the pattern
    pub fn newest_file(&self) -> Result<Option<PathBuf>> {
        let matcher = compile_pattern(&self.config.pattern)?;
        newest_matching(&self.config.dir, &matcher)
    }

    /// Whether the log directory can be listed
    pub fn is_available(&self) -> bool {
        std::fs::read_dir(&self.config.dir).is_ok()
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Ok(Glob::new(pattern)
        .with_context(|| format!("Invalid log file pattern {:?}", pattern))?
        .compile_matcher())
}

fn newest_matching(dir: &Path, matcher: &GlobMatcher) -> Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Log directory does not exist: {}", dir.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
        }
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let matches = path
            .file_name()
            .map(|name| matcher.is_match(Path::new(name)))
            .unwrap_or(false);
        if !matches || !path.is_file() {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        let is_newer = newest
            .as_ref()
            .map(|(t, p)| (modified, &path) > (*t, p))
            .unwrap_or(true);
        if is_newer {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|e| e.kind() == ErrorKind::NotFound)
        .unwrap_or(false)
}

/// Read at most the last `max_lines` lines of a file
///
/// Reads backwards from the end in fixed chunks, so the cost depends on
/// `max_lines` and not on the file size. Invalid UTF-8 is replaced.
pub fn read_tail_lines(path: &Path, max_lines: usize) -> Result<Vec<String>> {
    if max_lines == 0 {
        return Ok(Vec::new());
    }

    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let byte_budget = (max_lines.saturating_add(1)).saturating_mul(MAX_BYTES_PER_LINE) as u64;

    let mut pos = file_size;
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut newlines = 0usize;
    let mut read_total = 0u64;

    while pos > 0 && newlines <= max_lines && read_total < byte_budget {
        let step = (CHUNK_BYTES as u64).min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0u8; step as usize];
        file.read_exact(&mut chunk)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        newlines += chunk.iter().filter(|b| **b == b'\n').count();
        read_total += step;
        chunks.push(chunk);
    }

    let bytes: Vec<u8> = chunks.into_iter().rev().flatten().collect();
    let text = String::from_utf8_lossy(&bytes);
    let mut lines: Vec<&str> = text.lines().collect();

    // The first line is partial unless we reached the start of the file
    if pos > 0 && !lines.is_empty() {
        lines.remove(0);
    }

    if lines.len() > max_lines {
        lines = lines.split_off(lines.len() - max_lines);
    }

    Ok(lines.into_iter().map(str::to_string).collect())
}

/// Tail with default limits
pub fn tail(dir: &Path, pattern: &str) -> Vec<LogEntry> {
    LogTailer::new(TailerConfig {
        dir: dir.to_path_buf(),
        pattern: pattern.to_string(),
        ..Default::default()
    })
    .tail()
}
