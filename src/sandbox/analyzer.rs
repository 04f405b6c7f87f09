//! Static pattern gate (C11, stage 1): rejects snippets containing
//! dangerous identifiers/calls before they ever reach the JS engine.
//!
//! This is the floor, not the ceiling — the sandbox's actual security
//! boundary is this analyzer plus the path validator combined with a
//! memory/time-bounded QuickJS runtime, not pattern matching alone.

use crate::error::CoreError;
use regex::Regex;
use std::sync::OnceLock;

const BLOCKED_PATTERNS: &[&str] = &[
    "eval(",
    "Function(",
    "new Function(",
    "require(",
    "import(",
    "process.",
    "global.",
    "globalThis.",
    "__dirname",
    "__filename",
    "Buffer.",
    "__proto__",
    ".constructor[",
    ".prototype[",
    "Reflect.",
    "setTimeout(",
    "setInterval(",
    "file://",
    "../../",
];

fn warn_patterns() -> &'static [(&'static str, &'static str)] {
    &[
        ("while(true)", "possible infinite loop"),
        ("while (true)", "possible infinite loop"),
        ("for(;;)", "possible infinite loop"),
    ]
}

fn large_repeat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.repeat\(\s*(\d{7,}|\d+e\d+)\s*\)").unwrap())
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub warnings: Vec<String>,
}

/// Scan `source` for blocked patterns. Returns `Ok(report)` with any
/// non-fatal warnings, or `Err(SandboxBlocked)` naming the first match.
pub fn analyze(source: &str) -> Result<AnalysisReport, CoreError> {
    for pattern in BLOCKED_PATTERNS {
        if source.contains(pattern) {
            return Err(CoreError::SandboxBlocked(format!(
                "blocked pattern: {pattern}"
            )));
        }
    }

    let mut warnings = Vec::new();
    for (pattern, message) in warn_patterns() {
        if source.contains(pattern) {
            warnings.push(message.to_string());
        }
    }
    if large_repeat_re().is_match(source) {
        warnings.push("large string repeat literal".to_string());
    }

    Ok(AnalysisReport { warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_eval() {
        let err = analyze("eval('1+1')").unwrap_err();
        assert!(matches!(err, CoreError::SandboxBlocked(_)));
    }

    #[test]
    fn blocks_process_access() {
        assert!(analyze("process.env.SECRET").is_err());
    }

    #[test]
    fn blocks_path_traversal_literal() {
        assert!(analyze("files.read('../../etc/passwd')").is_err());
    }

    #[test]
    fn allows_clean_snippet() {
        let report = analyze("const x = compress.auto('hello world');").unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn warns_on_infinite_loop_without_blocking() {
        let report = analyze("while(true) { doStuff(); }").unwrap();
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn warns_on_huge_string_repeat() {
        let report = analyze("'a'.repeat(10000000)").unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("repeat")));
    }
}
