//! Fallback summarizer: always matches, used when no other summarizer
//! recognizes the log shape.

use super::{summarize_common, DetailLevel, LogSummary, Summarizer};

pub struct GenericSummarizer;

impl Summarizer for GenericSummarizer {
    fn log_type(&self) -> &'static str {
        "generic"
    }

    fn can_summarize(&self, _text: &str) -> bool {
        true
    }

    fn summarize(&self, text: &str, detail: DetailLevel) -> LogSummary {
        let overview = format!("Unrecognized log format, {} lines", text.lines().count());
        summarize_common(text, detail, self.log_type(), overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_matches() {
        assert!(GenericSummarizer.can_summarize("anything at all"));
        assert!(GenericSummarizer.can_summarize(""));
    }
}
