//! Conversation memory (C9): deterministic (no model calls) rolling
//! summary / key-extraction / hybrid compression over message lists, plus
//! the single process-wide memory slot described in §5.

use crate::token;
use crate::types::{ConversationMemory, ConversationMessage, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryStrategy {
    RollingSummary,
    KeyExtraction,
    Hybrid,
}

#[derive(Debug, Clone)]
pub struct CompressOptions {
    pub strategy: MemoryStrategy,
    pub max_tokens: Option<u32>,
    pub preserve_system: bool,
    pub preserve_last_n: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            strategy: MemoryStrategy::Hybrid,
            max_tokens: None,
            preserve_system: true,
            preserve_last_n: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressResult {
    pub compressed_messages: Vec<ConversationMessage>,
    pub original_tokens: u32,
    pub compressed_tokens: u32,
    pub savings: u32,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
}

fn decision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(we will|let's|decided to|we'll|going to)\b[^.\n]*").unwrap())
}

fn code_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`(?:\s*\(([\w./\\-]+:\d+)\))?").unwrap())
}

fn constraint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(must|should not|shouldn't|never|always)\b[^.\n]*").unwrap())
}

/// Extract decision sentences ("we will", "let's", "decided to").
#[must_use]
pub fn extract_decisions(messages: &[ConversationMessage]) -> Vec<String> {
    messages
        .iter()
        .flat_map(|m| decision_re().find_iter(&m.content).map(|mm| mm.as_str().trim().to_string()))
        .collect()
}

/// Extract backtick-delimited code references, with an optional `path:line`.
#[must_use]
pub fn extract_code_refs(messages: &[ConversationMessage]) -> Vec<String> {
    messages
        .iter()
        .flat_map(|m| {
            code_ref_re().captures_iter(&m.content).map(|c| {
                let ident = c.get(1).map_or("", |mm| mm.as_str());
                match c.get(2) {
                    Some(loc) => format!("{ident} ({})", loc.as_str()),
                    None => ident.to_string(),
                }
            })
        })
        .collect()
}

fn extract_constraints(messages: &[ConversationMessage]) -> Vec<String> {
    messages
        .iter()
        .flat_map(|m| constraint_re().find_iter(&m.content).map(|mm| mm.as_str().trim().to_string()))
        .collect()
}

fn split_preserved<'a>(
    messages: &'a [ConversationMessage],
    opts: &CompressOptions,
) -> (Vec<&'a ConversationMessage>, Vec<&'a ConversationMessage>) {
    let mut system = Vec::new();
    let mut rest = Vec::new();
    for m in messages {
        if opts.preserve_system && m.role == Role::System {
            system.push(m);
        } else {
            rest.push(m);
        }
    }
    let split_at = rest.len().saturating_sub(opts.preserve_last_n);
    let (to_compress, tail) = rest.split_at(split_at);
    let mut preserved = system;
    preserved.extend(tail);
    (preserved, to_compress.to_vec())
}

fn rolling_summary(messages: &[&ConversationMessage]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let user_goals: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.lines().next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .collect();
    let actions: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.content.lines().next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut parts = Vec::new();
    if !user_goals.is_empty() {
        parts.push(format!("User asked about: {}.", user_goals.join("; ")));
    }
    if !actions.is_empty() {
        parts.push(format!("Assistant covered: {}.", actions.join("; ")));
    }
    parts.join(" ")
}

/// Compress `messages` per `opts`. Preservation invariants: `role=system`
/// messages pass through unchanged when `preserve_system`, and the last
/// `preserve_last_n` non-system messages always pass through unchanged.
#[must_use]
pub fn compress(messages: &[ConversationMessage], opts: &CompressOptions) -> CompressResult {
    let original_tokens = token::count_messages(messages);
    let (preserved, to_compress) = split_preserved(messages, opts);

    if to_compress.is_empty() {
        let compressed_messages: Vec<ConversationMessage> = preserved.into_iter().cloned().collect();
        let compressed_tokens = token::count_messages(&compressed_messages);
        return CompressResult {
            compressed_tokens,
            savings: original_tokens.saturating_sub(compressed_tokens),
            compressed_messages,
            original_tokens,
            summary: None,
            key_points: None,
        };
    }

    let owned: Vec<ConversationMessage> = to_compress.iter().map(|m| (*m).clone()).collect();

    let mut summary = None;
    let mut key_points = None;
    let mut synthesized = Vec::new();

    match opts.strategy {
        MemoryStrategy::RollingSummary => {
            let s = rolling_summary(&to_compress);
            if !s.is_empty() {
                synthesized.push(ConversationMessage {
                    role: Role::System,
                    content: s.clone(),
                });
            }
            summary = Some(s);
        }
        MemoryStrategy::KeyExtraction => {
            let points = key_points_for(&owned);
            if !points.is_empty() {
                synthesized.push(ConversationMessage {
                    role: Role::System,
                    content: points.join("\n- "),
                });
            }
            key_points = Some(points);
        }
        MemoryStrategy::Hybrid => {
            let s = rolling_summary(&to_compress);
            let points = key_points_for(&owned);
            let mut content = s.clone();
            if !points.is_empty() {
                content = format!("{content}\n- {}", points.join("\n- "));
            }
            if !content.trim().is_empty() {
                synthesized.push(ConversationMessage {
                    role: Role::System,
                    content: content.clone(),
                });
            }
            summary = Some(s);
            key_points = Some(points);
        }
    }

    // Insert synthesized message(s) where the compressed span was, ahead of
    // the preserved tail (system messages the caller already had stay first).
    let mut compressed_messages: Vec<ConversationMessage> = Vec::new();
    let system_count = messages.iter().take_while(|m| m.role == Role::System).count();
    for (idx, m) in preserved.iter().enumerate() {
        if idx == system_count.min(preserved.len()) {
            compressed_messages.extend(synthesized.clone());
        }
        compressed_messages.push((*m).clone());
    }
    if compressed_messages.len() == preserved.len() {
        // preserved had no system messages at all — append synthesized first.
        let mut combined = synthesized;
        combined.extend(compressed_messages);
        compressed_messages = combined;
    }

    let compressed_tokens = token::count_messages(&compressed_messages);
    CompressResult {
        original_tokens,
        compressed_tokens,
        savings: original_tokens.saturating_sub(compressed_tokens),
        compressed_messages,
        summary,
        key_points,
    }
}

fn key_points_for(messages: &[ConversationMessage]) -> Vec<String> {
    let mut points = extract_decisions(messages);
    points.extend(extract_code_refs(messages));
    points.extend(extract_constraints(messages));
    points
}

/// The single process-wide conversation-memory slot (§5: exclusive writer
/// is whichever caller last wrote; readers observe the last write).
static MEMORY_SLOT: OnceLock<Mutex<Option<ConversationMemory>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<ConversationMemory>> {
    MEMORY_SLOT.get_or_init(|| Mutex::new(None))
}

pub fn create_memory(messages: &[ConversationMessage]) -> ConversationMemory {
    let result = compress(
        messages,
        &CompressOptions {
            strategy: MemoryStrategy::Hybrid,
            ..Default::default()
        },
    );
    let memory = ConversationMemory {
        summary: result.summary.unwrap_or_default(),
        decisions: extract_decisions(messages),
        code_references: extract_code_refs(messages),
        compressed_history: result.compressed_messages,
        last_updated: String::new(),
    };
    set_memory(memory.clone());
    memory
}

pub fn set_memory(memory: ConversationMemory) {
    *slot().lock().unwrap() = Some(memory);
}

#[must_use]
pub fn get_memory() -> Option<ConversationMemory> {
    slot().lock().unwrap().clone()
}

pub fn clear_memory() {
    *slot().lock().unwrap() = None;
}

#[must_use]
pub fn has_memory() -> bool {
    slot().lock().unwrap().is_some()
}

#[must_use]
pub fn get_summary() -> Option<String> {
    slot().lock().unwrap().as_ref().map(|m| m.summary.clone())
}

#[must_use]
pub fn restore() -> Option<Vec<ConversationMessage>> {
    slot().lock().unwrap().as_ref().map(|m| m.compressed_history.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> ConversationMessage {
        ConversationMessage {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn system_messages_pass_through_unchanged() {
        let messages = vec![
            msg(Role::System, "you are a helpful assistant"),
            msg(Role::User, "hi"),
            msg(Role::Assistant, "hello"),
            msg(Role::User, "what's next"),
            msg(Role::Assistant, "let's proceed"),
        ];
        let result = compress(&messages, &CompressOptions::default());
        assert!(result
            .compressed_messages
            .iter()
            .any(|m| m.role == Role::System && m.content == "you are a helpful assistant"));
    }

    #[test]
    fn last_n_messages_preserved_verbatim() {
        let messages = vec![
            msg(Role::User, "first"),
            msg(Role::Assistant, "second"),
            msg(Role::User, "third"),
            msg(Role::Assistant, "fourth"),
        ];
        let opts = CompressOptions {
            preserve_last_n: 2,
            ..Default::default()
        };
        let result = compress(&messages, &opts);
        assert!(result.compressed_messages.iter().any(|m| m.content == "third"));
        assert!(result.compressed_messages.iter().any(|m| m.content == "fourth"));
    }

    #[test]
    fn compressed_length_never_exceeds_original() {
        let messages = vec![
            msg(Role::User, "do a thing"),
            msg(Role::Assistant, "we will do the thing"),
            msg(Role::User, "ok"),
            msg(Role::Assistant, "done"),
        ];
        let result = compress(&messages, &CompressOptions::default());
        assert!(result.compressed_messages.len() <= messages.len());
    }

    #[test]
    fn extract_decisions_finds_commitment_language() {
        let messages = vec![msg(Role::Assistant, "we will refactor the parser next.")];
        let decisions = extract_decisions(&messages);
        assert!(!decisions.is_empty());
    }

    #[test]
    fn extract_code_refs_finds_backticked_identifiers() {
        let messages = vec![msg(Role::User, "look at `parse_rust` (src/ast/treesitter.rs:30)")];
        let refs = extract_code_refs(&messages);
        assert_eq!(refs, vec!["parse_rust (src/ast/treesitter.rs:30)".to_string()]);
    }

    #[test]
    fn memory_slot_round_trips() {
        clear_memory();
        assert!(!has_memory());
        let messages = vec![msg(Role::User, "let's ship it")];
        create_memory(&messages);
        assert!(has_memory());
        assert!(get_summary().is_some());
        clear_memory();
        assert!(!has_memory());
    }
}
