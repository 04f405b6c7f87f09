//! Unified-diff parsing and compression (C7): three reduction strategies
//! trading code detail for token savings.

use crate::semantic;
use crate::token;
use crate::types::{DiffFileChange, DiffStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffStrategy {
    HunksOnly,
    Summary,
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDiff {
    pub raw: String,
    pub files: Vec<DiffFileChange>,
    pub stats: DiffStats,
}

#[derive(Debug, Clone)]
struct Hunk {
    file: String,
    header: String,
    lines: Vec<String>,
}

fn file_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap())
}

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+\d+(?:,\d+)? @@").unwrap())
}

/// Parse a unified diff into per-file stats.
#[must_use]
pub fn parse(diff_text: &str) -> ParsedDiff {
    let mut files: Vec<DiffFileChange> = Vec::new();
    let mut current: Option<usize> = None;
    let mut total_additions = 0u32;
    let mut total_deletions = 0u32;
    let mut renamed = false;
    let mut new_file = false;
    let mut deleted_file = false;

    for line in diff_text.lines() {
        if let Some(caps) = file_header_re().captures(line) {
            if let Some(idx) = current {
                finalize_status(&mut files[idx], renamed, new_file, deleted_file);
            }
            let path = caps.get(2).map_or("", |m| m.as_str()).to_string();
            files.push(DiffFileChange {
                file: path,
                status: DiffStatus::Modified,
                additions: 0,
                deletions: 0,
            });
            current = Some(files.len() - 1);
            renamed = false;
            new_file = false;
            deleted_file = false;
            continue;
        }
        if line.starts_with("rename from") || line.starts_with("rename to") {
            renamed = true;
            continue;
        }
        if line.starts_with("new file mode") {
            new_file = true;
            continue;
        }
        if line.starts_with("deleted file mode") {
            deleted_file = true;
            continue;
        }
        if let Some(idx) = current {
            if line.starts_with('+') && !line.starts_with("+++") {
                files[idx].additions += 1;
                total_additions += 1;
            } else if line.starts_with('-') && !line.starts_with("---") {
                files[idx].deletions += 1;
                total_deletions += 1;
            }
        }
    }
    if let Some(idx) = current {
        finalize_status(&mut files[idx], renamed, new_file, deleted_file);
    }

    ParsedDiff {
        raw: diff_text.to_string(),
        files,
        stats: DiffStats {
            additions: total_additions,
            deletions: total_deletions,
        },
    }
}

fn finalize_status(change: &mut DiffFileChange, renamed: bool, new_file: bool, deleted_file: bool) {
    change.status = if renamed {
        DiffStatus::Renamed
    } else if new_file {
        DiffStatus::Added
    } else if deleted_file {
        DiffStatus::Deleted
    } else {
        DiffStatus::Modified
    };
}

fn split_hunks(diff_text: &str) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current_file = String::new();
    let mut current: Option<Hunk> = None;

    for line in diff_text.lines() {
        if let Some(caps) = file_header_re().captures(line) {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            current_file = caps.get(2).map_or("", |m| m.as_str()).to_string();
            continue;
        }
        if hunk_header_re().is_match(line) {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            current = Some(Hunk {
                file: current_file.clone(),
                header: line.to_string(),
                lines: Vec::new(),
            });
            continue;
        }
        if let Some(h) = current.as_mut() {
            h.lines.push(line.to_string());
        }
    }
    if let Some(h) = current.take() {
        hunks.push(h);
    }
    hunks
}

/// Drop context lines, keep file and hunk headers plus `+`/`-` lines.
#[must_use]
pub fn compress_hunks_only(diff_text: &str) -> String {
    let hunks = split_hunks(diff_text);
    let mut out = Vec::new();
    let mut last_file = String::new();
    for hunk in &hunks {
        if hunk.file != last_file {
            out.push(format!("diff --git a/{0} b/{0}", hunk.file));
            last_file = hunk.file.clone();
        }
        out.push(hunk.header.clone());
        for line in &hunk.lines {
            if line.starts_with('+') || line.starts_with('-') {
                out.push(line.clone());
            }
        }
    }
    out.join("\n")
}

/// One-line-per-file summary: `"M path (+a/-b)"` plus totals.
#[must_use]
pub fn compress_summary(parsed: &ParsedDiff) -> String {
    let mut out: Vec<String> = parsed
        .files
        .iter()
        .map(|f| {
            let tag = match f.status {
                DiffStatus::Added => "A",
                DiffStatus::Modified => "M",
                DiffStatus::Deleted => "D",
                DiffStatus::Renamed => "R",
            };
            format!("{tag} {} (+{}/-{})", f.file, f.additions, f.deletions)
        })
        .collect();
    out.push(format!(
        "Total: {} files, +{}/-{}",
        parsed.files.len(),
        parsed.stats.additions,
        parsed.stats.deletions
    ));
    out.join("\n")
}

/// TF-IDF-ranked hunk selection, keeping hunks until `max_tokens` is
/// reached; always keeps at least one hunk per file that has any.
#[must_use]
pub fn compress_semantic(diff_text: &str, max_tokens: u32) -> String {
    let hunks = split_hunks(diff_text);
    if hunks.is_empty() {
        return String::new();
    }

    let segments: Vec<String> = hunks
        .iter()
        .map(|h| h.lines.join("\n"))
        .collect();
    let scores = semantic::score_segments(&segments, &[]);

    let mut ranked: Vec<usize> = (0..hunks.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap());

    let mut kept: Vec<bool> = vec![false; hunks.len()];
    let mut seen_files = std::collections::HashSet::new();
    let mut budget_used = 0u32;

    for &idx in &ranked {
        let hunk_tokens = token::count(&render_hunk(&hunks[idx]));
        let is_first_for_file = seen_files.insert(hunks[idx].file.clone());
        if is_first_for_file || budget_used + hunk_tokens <= max_tokens {
            kept[idx] = true;
            budget_used += hunk_tokens;
        }
    }

    let mut out = Vec::new();
    let mut last_file = String::new();
    for (idx, hunk) in hunks.iter().enumerate() {
        if !kept[idx] {
            continue;
        }
        if hunk.file != last_file {
            out.push(format!("diff --git a/{0} b/{0}", hunk.file));
            last_file = hunk.file.clone();
        }
        out.push(render_hunk(hunk));
    }
    out.join("\n")
}

fn render_hunk(hunk: &Hunk) -> String {
    let mut lines = vec![hunk.header.clone()];
    lines.extend(hunk.lines.iter().cloned());
    lines.join("\n")
}

/// Apply a named strategy and return the compressed text.
#[must_use]
pub fn compress(diff_text: &str, strategy: DiffStrategy, max_tokens: u32) -> String {
    match strategy {
        DiffStrategy::HunksOnly => compress_hunks_only(diff_text),
        DiffStrategy::Summary => compress_summary(&parse(diff_text)),
        DiffStrategy::Semantic => compress_semantic(diff_text, max_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "diff --git a/src/foo.rs b/src/foo.rs\n--- a/src/foo.rs\n+++ b/src/foo.rs\n@@ -1,3 +1,4 @@\n fn foo() {\n-    1\n+    2\n+    3\n }\n";

    #[test]
    fn parse_counts_additions_and_deletions() {
        let parsed = parse(SAMPLE);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].additions, 2);
        assert_eq!(parsed.files[0].deletions, 1);
        assert_eq!(parsed.stats.additions, 2);
    }

    #[test]
    fn hunks_only_drops_context_lines() {
        let out = compress_hunks_only(SAMPLE);
        assert!(!out.contains("fn foo() {"));
        assert!(out.contains("-    1"));
        assert!(out.contains("+    2"));
    }

    #[test]
    fn summary_has_one_line_per_file_plus_total() {
        let parsed = parse(SAMPLE);
        let out = compress_summary(&parsed);
        assert!(out.contains("M src/foo.rs (+2/-1)"));
        assert!(out.contains("Total: 1 files"));
    }

    #[test]
    fn semantic_keeps_at_least_one_hunk_per_file() {
        let out = compress_semantic(SAMPLE, 1);
        assert!(out.contains("@@"));
    }

    #[test]
    fn detects_renamed_file() {
        let text = "diff --git a/old.rs b/new.rs\nrename from old.rs\nrename to new.rs\n";
        let parsed = parse(text);
        assert_eq!(parsed.files[0].status, DiffStatus::Renamed);
    }

    #[test]
    fn detects_added_file() {
        let text = "diff --git a/new.rs b/new.rs\nnew file mode 100644\n--- /dev/null\n+++ b/new.rs\n@@ -0,0 +1 @@\n+hello\n";
        let parsed = parse(text);
        assert_eq!(parsed.files[0].status, DiffStatus::Added);
    }
}
