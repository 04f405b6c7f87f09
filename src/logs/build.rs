//! Build-tool output summarizer: compiler/bundler errors and warnings.

use super::{summarize_common, DetailLevel, LogSummary, Summarizer};
use regex::Regex;
use std::sync::OnceLock;

fn build_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(Compiling|Building|error\[E\d+\]|warning:|webpack compiled|tsc |Building target)").unwrap()
    })
}

pub struct BuildSummarizer;

impl Summarizer for BuildSummarizer {
    fn log_type(&self) -> &'static str {
        "build"
    }

    fn can_summarize(&self, text: &str) -> bool {
        text.lines().any(|l| build_marker_re().is_match(l.trim()))
    }

    fn summarize(&self, text: &str, detail: DetailLevel) -> LogSummary {
        let error_lines = text
            .lines()
            .filter(|l| l.to_lowercase().contains("error"))
            .count();
        let overview = format!("Build log with {error_lines} error lines");
        summarize_common(text, detail, self.log_type(), overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_cargo_build_output() {
        let text = "Compiling ctxopt-core v0.1.0\nerror[E0502]: cannot borrow\nwarning: unused import\n";
        assert!(BuildSummarizer.can_summarize(text));
    }

    #[test]
    fn rejects_unrelated_text() {
        assert!(!BuildSummarizer.can_summarize("2024-01-01T00:00:00Z [INFO] hello\n"));
    }
}
