//! Log summarization (C6): a registry of per-log-type summarizers tried in
//! priority order, each producing a structured, capped summary.

pub mod application;
pub mod build;
pub mod generic;
pub mod server;
pub mod test_log;

use crate::dedup::{self, GroupOptions};
use crate::types::{LogEntry, LogLevel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    Normal,
    Detailed,
}

impl DetailLevel {
    /// (errors, warnings, events) caps per §4.6.
    #[must_use]
    pub fn caps(self) -> (usize, usize, usize) {
        match self {
            Self::Minimal => (5, 3, 5),
            Self::Normal => (10, 5, 10),
            Self::Detailed => (20, 10, 20),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_lines: u32,
    pub error_count: u32,
    pub warning_count: u32,
    pub timespan: Option<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSummary {
    pub log_type: String,
    pub overview: String,
    pub errors: Vec<LogEntry>,
    pub warnings: Vec<LogEntry>,
    pub key_events: Vec<LogEntry>,
    pub statistics: Statistics,
}

/// A per-log-type summarizer. `can_summarize` is a cheap, side-effect-free
/// predicate; the registry stops at the first summarizer that returns true.
pub trait Summarizer: Send + Sync {
    fn log_type(&self) -> &'static str;
    fn can_summarize(&self, text: &str) -> bool;
    fn summarize(&self, text: &str, detail: DetailLevel) -> LogSummary;
}

/// Summarizers tried in priority order: server > test > build > application
/// > generic (the final, always-true fallback).
#[must_use]
pub fn registry() -> Vec<Box<dyn Summarizer>> {
    vec![
        Box::new(server::ServerSummarizer),
        Box::new(test_log::TestSummarizer),
        Box::new(build::BuildSummarizer),
        Box::new(application::ApplicationSummarizer),
        Box::new(generic::GenericSummarizer),
    ]
}

/// Run the registry against `text`, returning the first matching summary.
#[must_use]
pub fn summarize(text: &str, detail: DetailLevel) -> LogSummary {
    for summarizer in registry() {
        if summarizer.can_summarize(text) {
            return summarizer.summarize(text, detail);
        }
    }
    generic::GenericSummarizer.summarize(text, detail)
}

fn timestamp_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?").unwrap(),
                Regex::new(r"\[\d{2}:\d{2}:\d{2}\]").unwrap(),
                Regex::new(r"[A-Z][a-z]{2} +\d{1,2} \d{2}:\d{2}:\d{2}").unwrap(),
                Regex::new(r"\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2}").unwrap(),
                Regex::new(r"\b1[5-8]\d{11}\b").unwrap(),
            ]
        })
        .as_slice()
}

/// First and last matched timestamp string across all lines, or `None` if
/// no line matches any of the five recognized formats.
#[must_use]
pub fn timespan(text: &str) -> Option<(String, String)> {
    let mut first = None;
    let mut last = None;
    for line in text.lines() {
        for pattern in timestamp_patterns() {
            if let Some(m) = pattern.find(line) {
                if first.is_none() {
                    first = Some(m.as_str().to_string());
                }
                last = Some(m.as_str().to_string());
                break;
            }
        }
    }
    match (first, last) {
        (Some(f), Some(l)) => Some((f, l)),
        _ => None,
    }
}

fn level_of(line: &str) -> LogLevel {
    let upper = line.to_uppercase();
    if upper.contains("ERROR") || upper.contains("FATAL") || upper.contains("PANIC") {
        LogLevel::Error
    } else if upper.contains("WARN") {
        LogLevel::Warning
    } else if upper.contains("DEBUG") || upper.contains("TRACE") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

fn key_event_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(started|starting|stopped|stopping|shutdown|crash(ed)?|deploy(ed|ing)?|listening on port|bound to port)\b").unwrap()
    })
}

/// Split `text` into deduplicated, leveled entries, and extract any
/// "key event" lines (start/stop/crash/deploy/port).
fn collect_entries(text: &str) -> (Vec<LogEntry>, Vec<LogEntry>, Vec<LogEntry>, u32) {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let dedup_result = dedup::group(&lines, &GroupOptions::default());

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut events = Vec::new();

    for group in &dedup_result.groups {
        let Some(sample) = group.representative_lines.first() else {
            continue;
        };
        let level = level_of(sample);
        let entry = LogEntry {
            timestamp: timestamp_patterns()
                .iter()
                .find_map(|p| p.find(sample).map(|m| m.as_str().to_string())),
            level,
            message: sample.trim().to_string(),
            count: group.occurrences,
            context: None,
            raw: sample.clone(),
        };

        if key_event_re().is_match(sample) {
            events.push(entry.clone());
        }

        match level {
            LogLevel::Error => errors.push(entry),
            LogLevel::Warning => warnings.push(entry),
            _ => {}
        }
    }

    (errors, warnings, events, lines.len() as u32)
}

/// Shared summarization body every summarizer delegates to, parameterized
/// only by the type tag and overview sentence.
fn summarize_common(text: &str, detail: DetailLevel, log_type: &str, overview: String) -> LogSummary {
    let (mut errors, mut warnings, mut events, total_lines) = collect_entries(text);
    let (err_cap, warn_cap, event_cap) = detail.caps();

    let error_count = errors.iter().map(|e| e.count).sum();
    let warning_count = warnings.iter().map(|e| e.count).sum();

    errors.truncate(err_cap);
    warnings.truncate(warn_cap);
    events.truncate(event_cap);

    LogSummary {
        log_type: log_type.to_string(),
        overview,
        errors,
        warnings,
        key_events: events,
        statistics: Statistics {
            total_lines,
            error_count,
            warning_count,
            timespan: timespan(text),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespan_finds_first_and_last_iso_timestamp() {
        let text = "2024-01-01T00:00:00Z start\nplain line\n2024-01-02T12:30:00Z end\n";
        let span = timespan(text).unwrap();
        assert_eq!(span.0, "2024-01-01T00:00:00Z");
        assert_eq!(span.1, "2024-01-02T12:30:00Z");
    }

    #[test]
    fn no_timestamps_returns_none() {
        assert!(timespan("no timestamps here\nor here\n").is_none());
    }

    #[test]
    fn detail_level_caps_scale_up() {
        assert_eq!(DetailLevel::Minimal.caps(), (5, 3, 5));
        assert_eq!(DetailLevel::Detailed.caps(), (20, 10, 20));
    }
}
