//! Test-runner output summarizer: pass/fail counts from common test harness formats.

use super::{summarize_common, DetailLevel, LogSummary, Summarizer};
use regex::Regex;
use std::sync::OnceLock;

fn test_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(test result:|running \d+ tests?|PASS(ED)?\b|FAIL(ED)?\b|\d+ (passed|failed|skipped))").unwrap()
    })
}

pub struct TestSummarizer;

impl Summarizer for TestSummarizer {
    fn log_type(&self) -> &'static str {
        "test"
    }

    fn can_summarize(&self, text: &str) -> bool {
        text.lines().any(|l| test_marker_re().is_match(l.trim()))
    }

    fn summarize(&self, text: &str, detail: DetailLevel) -> LogSummary {
        let passed = text.matches("PASS").count() + text.matches("passed").count();
        let failed = text.matches("FAIL").count() + text.matches("failed").count();
        let overview = format!("Test run: ~{passed} passed, ~{failed} failed");
        summarize_common(text, detail, self.log_type(), overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_cargo_test_output() {
        let text = "running 3 tests\ntest foo::bar ... ok\ntest result: FAILED. 2 passed; 1 failed; 0 ignored\n";
        assert!(TestSummarizer.can_summarize(text));
    }

    #[test]
    fn rejects_plain_build_log() {
        assert!(!TestSummarizer.can_summarize("Compiling foo v0.1.0\nwarning: unused variable\n"));
    }
}
