//! Compress noisy gateway log messages into short human phrases
//!
//! Rules are tried in order and the first match wins. A rule matches on a
//! trigger phrase at the start of the message (after an optional
//! `embedded run` prefix) and renders its output from the `key=value` fields
//! found anywhere in the message, so a missing field degrades the phrase
//! instead of failing the match. No rule output begins with a trigger, so
//! copied field values cannot re-trigger a rule and [`summarize`] stays
//! idempotent.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::text::truncate_chars;

/// Longest message kept verbatim
pub const MAX_MESSAGE_CHARS: usize = 220;

type Fields<'a> = HashMap<&'a str, &'a str>;

struct Rule {
    trigger: Regex,
    render: fn(&Fields<'_>, Option<&str>) -> String,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        fn rule(pattern: &str, render: fn(&Fields<'_>, Option<&str>) -> String) -> Rule {
            let anchored = format!(r"(?i)^(?:embedded\s+(?:run\s+)?)?{}", pattern);
            Rule {
                trigger: Regex::new(&anchored).expect("valid summarizer pattern"),
                render,
            }
        }
        vec![
            rule(r"tool start:", |f, _| match f.get("tool") {
                Some(tool) => format!("Tool started: {}", tool),
                None => "Tool started".to_string(),
            }),
            rule(r"tool end:", |f, _| match f.get("tool") {
                Some(tool) => format!("Tool finished: {}", tool),
                None => "Tool finished".to_string(),
            }),
            rule(r"lane enqueue:", |f, _| {
                let mut out = format!("Queued: {}", f.get("lane").copied().unwrap_or("task"));
                if let Some(size) = f.get("queueSize") {
                    out.push_str(&format!(" ({} waiting)", size));
                }
                out
            }),
            rule(r"lane dequeue:", |f, _| {
                let mut out = format!("Dequeued: {}", f.get("lane").copied().unwrap_or("task"));
                if let Some(wait) = f.get("waitMs").and_then(|v| format_millis(v)) {
                    out.push_str(&format!(" after {}", wait));
                }
                out
            }),
            rule(r"lane task (?:done|error):", |f, _| {
                let mut out = format!("Lane done: {}", f.get("lane").copied().unwrap_or("task"));
                if let Some(duration) = f.get("durationMs").and_then(|v| format_millis(v)) {
                    out.push_str(&format!(" in {}", duration));
                }
                out
            }),
            rule(r"run done:", |f, _| {
                let aborted = f.get("aborted").map(|v| *v == "true").unwrap_or(false);
                let verb = if aborted { "Run aborted" } else { "Run finished" };
                match f.get("durationMs").and_then(|v| format_millis(v)) {
                    Some(duration) if aborted => format!("{} after {}", verb, duration),
                    Some(duration) => format!("{} in {}", verb, duration),
                    None => verb.to_string(),
                }
            }),
            rule(r"(?:sendMessage|send|delivery|deliver) ok\b", |f, subsystem| {
                let mut out = "Message delivered".to_string();
                if let Some(channel) = subsystem.filter(|s| !s.is_empty()) {
                    out.push_str(&format!(" via {}", channel));
                }
                if let Some(chat) = f.get("chat").or_else(|| f.get("to")) {
                    out.push_str(&format!(" to {}", chat));
                }
                out
            }),
        ]
    })
}

fn field_pattern() -> &'static Regex {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    FIELD.get_or_init(|| {
        Regex::new(r#"\b([A-Za-z][A-Za-z0-9_]*)=("[^"]*"|[^\s,]+)"#).expect("valid field pattern")
    })
}

fn extract_fields(message: &str) -> Fields<'_> {
    field_pattern()
        .captures_iter(message)
        .filter_map(|c: Captures<'_>| {
            let key = c.get(1)?.as_str();
            let value = c.get(2)?.as_str().trim_matches('"');
            Some((key, value))
        })
        .collect()
}

/// Render a millisecond count as `850ms` or `12.3s`
fn format_millis(raw: &str) -> Option<String> {
    let ms: u64 = raw.parse().ok()?;
    Some(if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    })
}

/// Summarize a raw log line; an empty result means "drop"
pub fn summarize(raw: &str) -> String {
    summarize_message(None, raw)
}

/// Summarize an already-parsed message, with its subsystem when known
pub fn summarize_message(subsystem: Option<&str>, message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        return String::new();
    }

    for rule in rules() {
        if rule.trigger.is_match(message) {
            let fields = extract_fields(message);
            return truncate_chars(&(rule.render)(&fields, subsystem), MAX_MESSAGE_CHARS);
        }
    }

    truncate_chars(message, MAX_MESSAGE_CHARS)
}
