//! Application-log summarizer: generic leveled logs with `[LEVEL]` markers
//! or ISO timestamps, but none of the more specific server/test/build shapes.

use super::{summarize_common, DetailLevel, LogSummary, Summarizer};
use regex::Regex;
use std::sync::OnceLock;

fn level_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[(ERROR|WARN|WARNING|INFO|DEBUG|TRACE)\]").unwrap())
}

pub struct ApplicationSummarizer;

impl Summarizer for ApplicationSummarizer {
    fn log_type(&self) -> &'static str {
        "application"
    }

    fn can_summarize(&self, text: &str) -> bool {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return false;
        }
        let hits = lines.iter().filter(|l| level_marker_re().is_match(l)).count();
        hits as f32 / lines.len() as f32 >= 0.3
    }

    fn summarize(&self, text: &str, detail: DetailLevel) -> LogSummary {
        let overview = format!("Application log, {} lines", text.lines().count());
        summarize_common(text, detail, self.log_type(), overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_level_markers() {
        let text = "[INFO] starting up\n[ERROR] connection refused\n[INFO] retrying\n";
        assert!(ApplicationSummarizer.can_summarize(text));
    }

    #[test]
    fn rejects_unmarked_prose() {
        assert!(!ApplicationSummarizer.can_summarize("plain text with no markers at all\nmore plain text\n"));
    }
}
