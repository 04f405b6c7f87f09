//! Server/request-log summarizer: HTTP access logs and service startup banners.

use super::{summarize_common, DetailLevel, LogSummary, Summarizer};
use regex::Regex;
use std::sync::OnceLock;

fn server_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS)\s+/|listening on port|server started|bound to (0\.0\.0\.0|127\.0\.0\.1|localhost)"#).unwrap()
    })
}

pub struct ServerSummarizer;

impl Summarizer for ServerSummarizer {
    fn log_type(&self) -> &'static str {
        "server"
    }

    fn can_summarize(&self, text: &str) -> bool {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return false;
        }
        let hits = lines.iter().filter(|l| server_re().is_match(l)).count();
        hits as f32 / lines.len() as f32 >= 0.2
    }

    fn summarize(&self, text: &str, detail: DetailLevel) -> LogSummary {
        let request_lines = text.lines().filter(|l| server_re().is_match(l)).count();
        let overview = format!("Server log with {request_lines} request/lifecycle lines");
        summarize_common(text, detail, self.log_type(), overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_http_access_log() {
        let text = "2024-01-01T00:00:00Z GET /api/users 200\n2024-01-01T00:00:01Z POST /api/login 401\nserver started on port 8080\n";
        assert!(ServerSummarizer.can_summarize(text));
    }

    #[test]
    fn rejects_unrelated_text() {
        assert!(!ServerSummarizer.can_summarize("just a plain paragraph of prose\nwith no server lines\n"));
    }
}
