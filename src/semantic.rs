//! TF-IDF segment ranking (C8): split text into segments, score each by
//! term relevance plus position/anchor boosts, and keep the top segments
//! up to a token-ratio budget, restoring original order for output.

use crate::detect::{self, ContentType};
use crate::token;
use crate::types::Blob;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const POSITION_BOOST_MAX: f32 = 1.0;
const POSITION_BOOST_MIN: f32 = 0.2;
const ANCHOR_BOOST: f32 = 1.0;
const DEFAULT_TARGET_RATIO: f32 = 0.5;

fn stopwords() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "of", "to",
            "in", "for", "with", "on", "at", "by", "and", "or", "but", "if", "this", "that",
            "these", "those", "it", "as",
        ]
        .into_iter()
        .collect()
    })
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z_][a-zA-Z0-9_]{1,}").unwrap())
}

#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    token_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !stopwords().contains(w.as_str()))
        .collect()
}

/// Split `text` into paragraphs on blank lines. The generic segmenter, used
/// for prose and any content type without a more specific splitter.
#[must_use]
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                segments.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        segments.push(current.join("\n"));
    }
    if segments.is_empty() && !text.is_empty() {
        segments.push(text.to_string());
    }
    segments
}

/// Split `text` into top-level brace-delimited blocks: a run of lines
/// outside any `{...}` nesting is its own segment, and each top-level
/// `{` through its matching `}` (tracking nested braces) is one segment.
/// Used for code content so a function/block is never cut mid-body.
#[must_use]
pub fn split_code_blocks(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut depth: i32 = 0;

    for line in text.lines() {
        current.push(line);
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth = (depth - 1).max(0),
                _ => {}
            }
        }
        if depth == 0 {
            segments.push(current.join("\n"));
            current.clear();
        }
    }
    if !current.is_empty() {
        segments.push(current.join("\n"));
    }
    segments.retain(|s| !s.trim().is_empty());
    if segments.is_empty() && !text.is_empty() {
        segments.push(text.to_string());
    }
    segments
}

fn log_entry_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}|\[\d{2}:\d{2}:\d{2}\]|(?i)\[(ERROR|WARN|WARNING|INFO|DEBUG|TRACE)\])").unwrap()
    })
}

/// Group log lines so that continuation lines (stack frames, wrapped
/// messages with no timestamp/level marker of their own) stay attached to
/// the entry that started them, rather than splitting on blank lines.
#[must_use]
pub fn split_log_groups(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if log_entry_start_re().is_match(line) && !current.is_empty() {
            segments.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        segments.push(current.join("\n"));
    }
    if segments.is_empty() && !text.is_empty() {
        segments.push(text.to_string());
    }
    segments
}

/// Pick the segmenter matching `text`'s detected content type: code blocks
/// for code, log-line groups for logs/stack traces, paragraphs otherwise.
#[must_use]
pub fn segment(text: &str) -> Vec<String> {
    let detection = detect::analyze(&Blob::new(text.to_string()));
    match detection.detected_type {
        ContentType::Code => split_code_blocks(text),
        ContentType::Logs | ContentType::Stacktrace => split_log_groups(text),
        ContentType::Diff | ContentType::Config | ContentType::Generic => split_paragraphs(text),
    }
}

/// Score each segment by summed TF-IDF over its terms, a position boost
/// (first 10% of segments score highest, decaying linearly to 20% by the
/// end), and an anchor boost if any `preserve_patterns` regex matches.
#[must_use]
pub fn score_segments(segments: &[String], preserve_patterns: &[Regex]) -> Vec<f32> {
    let n = segments.len().max(1);
    let tokenized: Vec<Vec<String>> = segments.iter().map(|s| tokenize(s)).collect();

    let mut df: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *df.entry(term).or_insert(0) += 1;
        }
    }

    let mut scores = Vec::with_capacity(segments.len());
    for (idx, tokens) in tokenized.iter().enumerate() {
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for t in tokens {
            *tf.entry(t.as_str()).or_insert(0) += 1;
        }
        let len = tokens.len().max(1) as f32;

        let mut tfidf_sum = 0.0f32;
        for (&term, &count) in &tf {
            let term_df = *df.get(term).unwrap_or(&1) as f32;
            let idf = (1.0 + n as f32 / term_df).ln();
            tfidf_sum += (count as f32 / len) * idf;
        }

        let position_ratio = idx as f32 / n as f32;
        let position_boost = if position_ratio <= 0.1 {
            POSITION_BOOST_MAX
        } else {
            let decay = (position_ratio - 0.1) / 0.9;
            POSITION_BOOST_MAX - decay * (POSITION_BOOST_MAX - POSITION_BOOST_MIN)
        };

        let anchor_boost = if preserve_patterns.iter().any(|p| p.is_match(&segments[idx])) {
            ANCHOR_BOOST
        } else {
            0.0
        };

        scores.push(tfidf_sum + position_boost + anchor_boost);
    }
    scores
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCompressResult {
    pub content: String,
    pub original_tokens: u32,
    pub compressed_tokens: u32,
    pub segments_kept: usize,
    pub segments_total: usize,
}

/// Rank segments, keep the top-scoring ones up to `target_ratio` of the
/// original token count, then restore original reading order.
#[must_use]
pub fn compress(text: &str, target_ratio: Option<f32>, preserve_patterns: &[Regex]) -> SemanticCompressResult {
    let ratio = target_ratio.unwrap_or(DEFAULT_TARGET_RATIO);
    let segments = segment(text);
    let original_tokens = token::count(text);

    if segments.is_empty() {
        return SemanticCompressResult {
            content: String::new(),
            original_tokens,
            compressed_tokens: 0,
            segments_kept: 0,
            segments_total: 0,
        };
    }

    let scores = score_segments(&segments, preserve_patterns);
    let target_tokens = ((original_tokens as f32) * ratio).round() as u32;

    let mut ranked: Vec<usize> = (0..segments.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap());

    let mut kept = vec![false; segments.len()];
    let mut used_tokens = 0u32;
    for &idx in &ranked {
        if used_tokens >= target_tokens && used_tokens > 0 {
            break;
        }
        kept[idx] = true;
        used_tokens += token::count(&segments[idx]);
    }

    let ordered: Vec<&String> = segments
        .iter()
        .enumerate()
        .filter(|(idx, _)| kept[*idx])
        .map(|(_, s)| s)
        .collect();
    let content = ordered
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let compressed_tokens = token::count(&content);

    SemanticCompressResult {
        content,
        original_tokens,
        compressed_tokens,
        segments_kept: ordered.len(),
        segments_total: segments.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_stopwords() {
        let tokens = tokenize("the quick brown fox is fast");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(tokens.contains(&"quick".to_string()));
    }

    #[test]
    fn split_paragraphs_on_blank_lines() {
        let text = "first para\nline two\n\nsecond para\n";
        let segments = split_paragraphs(text);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn split_code_blocks_keeps_nested_braces_together() {
        let text = "fn outer() {\n    if true {\n        do_thing();\n    }\n}\nfn other() {\n    1\n}\n";
        let segments = split_code_blocks(text);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("do_thing"));
        assert!(segments[0].contains("if true"));
    }

    #[test]
    fn split_log_groups_attaches_continuation_lines() {
        let text = "2024-01-01T00:00:00 ERROR boom\n  at foo()\n  at bar()\n2024-01-01T00:00:01 INFO ok\n";
        let segments = split_log_groups(text);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("at foo()"));
        assert!(segments[0].contains("at bar()"));
    }

    #[test]
    fn segment_routes_detected_rust_through_brace_splitter() {
        let text = "fn a() {\n    let mut x = 1;\n    if x > 0 {\n        x += 1;\n    }\n}\n\nfn b() {\n    let mut y = 2;\n}\n";
        let segments = segment(text);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("if x > 0"));
    }

    #[test]
    fn compress_preserves_reading_order() {
        let text = "alpha beta gamma relevant keyword here\n\nfiller filler filler words words\n\nanother relevant keyword section\n";
        let result = compress(text, Some(0.6), &[]);
        let alpha_pos = result.content.find("alpha");
        let another_pos = result.content.find("another");
        if let (Some(a), Some(b)) = (alpha_pos, another_pos) {
            assert!(a < b);
        }
    }

    #[test]
    fn anchor_pattern_boosts_matching_segment() {
        let text = "irrelevant filler paragraph one with words\n\nTODO: fix this critical bug\n\nmore irrelevant filler text here\n";
        let pattern = Regex::new(r"TODO").unwrap();
        let result = compress(text, Some(0.34), &[pattern]);
        assert!(result.content.contains("TODO"));
    }

    #[test]
    fn empty_text_compresses_to_empty() {
        let result = compress("", None, &[]);
        assert_eq!(result.content, "");
        assert_eq!(result.segments_total, 0);
    }
}
