//! Signature-based line deduplication (C5). Normalizes each line into a
//! deterministic signature, groups lines sharing a signature, and renders
//! high-occurrence groups as a truncated representative sample.

use crate::types::SignatureGroup;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct GroupOptions {
    pub threshold: u32,
    pub keep_first: usize,
    pub custom_pattern: Option<Regex>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            threshold: 2,
            keep_first: 1,
            custom_pattern: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupStats {
    pub original_lines: u32,
    pub deduplicated_lines: u32,
    pub unique_patterns: u32,
    pub duplicates_removed: u32,
    pub reduction_percent: u32,
}

#[derive(Debug, Clone)]
pub struct GroupResult {
    pub groups: Vec<SignatureGroup>,
    pub dropped_line_count: u32,
    pub stats: DedupStats,
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+\.?\d*").unwrap())
}

fn hex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b0x[0-9a-f]{6,}\b|\b[0-9a-f]{8,}\b").unwrap())
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:/[\w.\-]+){2,}|[A-Za-z]:\\[\w.\\\-]+").unwrap())
}

fn double_quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[^"]*""#).unwrap())
}

fn single_quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'[^']*'").unwrap())
}

/// Deterministically normalize a line into a signature: paths, hex runs,
/// and numbers become placeholders, quoted strings collapse, and the
/// result is lowercased and trimmed.
#[must_use]
pub fn normalize(line: &str) -> String {
    let s = path_re().replace_all(line, "<PATH>");
    let s = hex_re().replace_all(&s, "<HASH>");
    let s = number_re().replace_all(&s, "<N>");
    let s = double_quoted_re().replace_all(&s, "\"<STR>\"");
    let s = single_quoted_re().replace_all(&s, "'<STR>'");
    s.trim().to_lowercase()
}

/// Group `lines` by normalized signature and render per `opts`.
#[must_use]
pub fn group(lines: &[String], opts: &GroupOptions) -> GroupResult {
    struct Bucket {
        signature: String,
        originals: Vec<String>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut buckets: std::collections::HashMap<String, Bucket> = std::collections::HashMap::new();
    let mut dropped = 0u32;
    let mut passthrough: Vec<String> = Vec::new();

    for line in lines {
        if let Some(pattern) = &opts.custom_pattern {
            if !pattern.is_match(line) {
                passthrough.push(line.clone());
                continue;
            }
        }
        let sig = normalize(line);
        if !buckets.contains_key(&sig) {
            order.push(sig.clone());
        }
        let bucket = buckets.entry(sig.clone()).or_insert_with(|| Bucket {
            signature: sig,
            originals: Vec::new(),
        });
        bucket.originals.push(line.clone());
    }

    let mut groups = Vec::new();
    for sig in &order {
        let bucket = &buckets[sig];
        let occurrences = bucket.originals.len() as u32;
        let keep = opts.keep_first.min(bucket.originals.len());
        if occurrences >= opts.threshold {
            dropped += occurrences - keep as u32;
        }
        groups.push(SignatureGroup {
            signature: bucket.signature.clone(),
            representative_lines: bucket.originals[..keep].to_vec(),
            occurrences,
            files: Vec::new(),
        });
    }

    let original_lines = lines.len() as u32;
    let deduplicated_lines = groups
        .iter()
        .map(|g| {
            if g.occurrences >= opts.threshold {
                g.representative_lines.len() as u32 + 1 // +1 for the "… N more" marker
            } else {
                g.occurrences
            }
        })
        .sum::<u32>()
        + passthrough.len() as u32;

    let stats = DedupStats {
        original_lines,
        deduplicated_lines,
        unique_patterns: groups.len() as u32,
        duplicates_removed: dropped,
        reduction_percent: crate::token::reduction_percent(original_lines, deduplicated_lines),
    };

    GroupResult {
        groups,
        dropped_line_count: dropped,
        stats,
    }
}

/// Render a `GroupResult` back into text, in first-seen order, with
/// `"… and N more occurrences"` suffixes on collapsed groups.
#[must_use]
pub fn render(result: &GroupResult, threshold: u32) -> String {
    let mut out = Vec::new();
    for group in &result.groups {
        for line in &group.representative_lines {
            out.push(line.clone());
        }
        if group.occurrences >= threshold {
            let remaining = group.occurrences - group.representative_lines.len() as u32;
            if remaining > 0 {
                out.push(format!("… and {remaining} more occurrences"));
            }
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_numbers_paths_and_strings() {
        assert_eq!(normalize("Error at /var/log/app.log:42"), "error at <path>:<n>");
        assert_eq!(normalize(r#"user "alice" failed 3 times"#), r#"user "<str>" failed <n> times"#);
    }

    #[test]
    fn groups_near_duplicate_lines() {
        let lines = vec![
            "connection refused to 10.0.0.1".to_string(),
            "connection refused to 10.0.0.2".to_string(),
            "connection refused to 10.0.0.3".to_string(),
            "unique one-off message".to_string(),
        ];
        let result = group(&lines, &GroupOptions::default());
        assert_eq!(result.groups.len(), 2);
        let dup_group = result.groups.iter().find(|g| g.occurrences == 3).unwrap();
        assert_eq!(dup_group.representative_lines.len(), 1);
        assert_eq!(result.dropped_line_count, 2);
    }

    #[test]
    fn below_threshold_groups_render_verbatim() {
        let lines = vec!["only once".to_string()];
        let result = group(&lines, &GroupOptions::default());
        assert_eq!(result.groups[0].representative_lines.len(), 1);
        assert_eq!(result.dropped_line_count, 0);
    }

    #[test]
    fn custom_pattern_passes_non_matching_lines_through() {
        let lines = vec![
            "ERROR: boom 1".to_string(),
            "ERROR: boom 2".to_string(),
            "INFO: fine".to_string(),
        ];
        let opts = GroupOptions {
            custom_pattern: Some(Regex::new(r"^ERROR").unwrap()),
            ..Default::default()
        };
        let result = group(&lines, &opts);
        assert_eq!(result.groups.len(), 1);
    }

    #[test]
    fn render_adds_more_occurrences_suffix() {
        let lines = vec!["dup".to_string(), "dup".to_string(), "dup".to_string()];
        let result = group(&lines, &GroupOptions::default());
        let rendered = render(&result, 2);
        assert!(rendered.contains("… and 2 more occurrences"));
    }
}
