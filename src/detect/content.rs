//! Content-type detection (C2): classify a blob as logs, a stack trace, a
//! diff, config, code, or generic text, by scored regex voting.

use crate::detect::language;
use crate::types::{Blob, Language};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Logs,
    Stacktrace,
    Diff,
    Config,
    Code,
    Generic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detected_type: ContentType,
    pub confidence: f32,
    pub scores: Vec<(String, f32)>,
}

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}|\[\d{2}:\d{2}:\d{2}\]").unwrap()
    })
}

fn level_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[(ERROR|WARN|WARNING|INFO|DEBUG|TRACE)\]").unwrap())
}

fn stack_frame_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*at .+\(.+:\d+(:\d+)?\)|File "[^"]+", line \d+"#).unwrap()
    })
}

fn diff_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^diff --git |^@@ -\d+(,\d+)? \+\d+(,\d+)? @@|^--- a/|^\+\+\+ b/").unwrap())
}

fn config_kv_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[A-Za-z_][A-Za-z0-9_.\-]*\s*[:=]\s*\S").unwrap())
}

/// Score and classify a blob. Pure and side-effect-free.
#[must_use]
pub fn analyze(blob: &Blob) -> DetectionResult {
    let lines: Vec<&str> = blob.text.lines().collect();
    let n = lines.len().max(1) as f32;

    let log_score = {
        let ts_hits = lines.iter().filter(|l| timestamp_re().is_match(l)).count() as f32;
        let marker_hits = lines.iter().filter(|l| level_marker_re().is_match(l)).count() as f32;
        ((ts_hits + marker_hits) / n).min(1.0)
    };

    let stacktrace_score = {
        let hits = lines.iter().filter(|l| stack_frame_re().is_match(l)).count() as f32;
        (hits / n * 3.0).min(1.0)
    };

    let diff_score = {
        let hits = lines.iter().filter(|l| diff_header_re().is_match(l)).count() as f32;
        if hits > 0.0 { (hits / n * 10.0).min(1.0) } else { 0.0 }
    };

    let config_score = {
        let hits = lines.iter().filter(|l| config_kv_re().is_match(l)).count() as f32;
        let looks_structured = blob.text.trim_start().starts_with('{')
            || blob.text.trim_start().starts_with('[')
            || hits / n > 0.5;
        if looks_structured { (hits / n).min(1.0) } else { 0.0 }
    };

    let code_lang = language::detect(blob);
    let code_score = if code_lang != Language::Generic { 0.9 } else { 0.0 };

    let mut scores = vec![
        ("logs".to_string(), log_score),
        ("stacktrace".to_string(), stacktrace_score),
        ("diff".to_string(), diff_score),
        ("config".to_string(), config_score),
        ("code".to_string(), code_score),
    ];
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let (detected_type, top_score) = pick_dominant(&scores);

    DetectionResult {
        detected_type,
        confidence: top_score,
        scores,
    }
}

/// Pick the winner of a score-sorted (descending) category list. A tie for
/// first place — including a three-way-or-more tie — is treated as no
/// signal and resolves to `Generic`, same as an all-zero vote.
fn pick_dominant(scores: &[(String, f32)]) -> (ContentType, f32) {
    let Some((top_name, top_score)) = scores.first() else {
        return (ContentType::Generic, 0.0);
    };
    let tied_for_top = scores.iter().filter(|(_, s)| s == top_score).count() > 1;
    if *top_score <= 0.0 || tied_for_top {
        return (ContentType::Generic, *top_score);
    }
    let detected = match top_name.as_str() {
        "logs" => ContentType::Logs,
        "stacktrace" => ContentType::Stacktrace,
        "diff" => ContentType::Diff,
        "config" => ContentType::Config,
        "code" => ContentType::Code,
        _ => ContentType::Generic,
    };
    (detected, *top_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_unified_diff() {
        let text = "diff --git a/foo.rs b/foo.rs\n--- a/foo.rs\n+++ b/foo.rs\n@@ -1,2 +1,2 @@\n-old\n+new\n";
        let result = analyze(&Blob::new(text));
        assert_eq!(result.detected_type, ContentType::Diff);
    }

    #[test]
    fn detects_logs_by_timestamp() {
        let text = "2024-01-01T00:00:00 [INFO] server starting\n2024-01-01T00:00:01 [ERROR] boom\n";
        let result = analyze(&Blob::new(text));
        assert_eq!(result.detected_type, ContentType::Logs);
    }

    #[test]
    fn detects_stacktrace() {
        let text = "Traceback:\n  at foo (bar.js:12:4)\n  at baz (qux.js:40:1)\n";
        let result = analyze(&Blob::new(text));
        assert_eq!(result.detected_type, ContentType::Stacktrace);
    }

    #[test]
    fn detects_code_via_language() {
        let text = "fn main() {\n    let mut x = 1;\n    println!(\"{x}\");\n}\n";
        let result = analyze(&Blob::new(text));
        assert_eq!(result.detected_type, ContentType::Code);
    }

    #[test]
    fn empty_text_is_generic() {
        let result = analyze(&Blob::new(""));
        assert_eq!(result.detected_type, ContentType::Generic);
    }

    #[test]
    fn tie_for_top_score_resolves_to_generic() {
        let scores = vec![
            ("logs".to_string(), 0.9),
            ("code".to_string(), 0.9),
            ("diff".to_string(), 0.1),
        ];
        let (detected, _) = pick_dominant(&scores);
        assert_eq!(detected, ContentType::Generic);
    }

    #[test]
    fn unique_top_score_still_wins() {
        let scores = vec![("code".to_string(), 0.9), ("logs".to_string(), 0.3)];
        let (detected, _) = pick_dominant(&scores);
        assert_eq!(detected, ContentType::Code);
    }
}
