//! Cheap token-count heuristic used throughout the engine to report
//! `{originalTokens, compressedTokens, reductionPercent}` on every compressor.
//!
//! This is deliberately not a real tokenizer: running one in-process for
//! every model family is out of scope. The contract callers rely on is
//! the invariants below, not exactness.

use crate::types::ConversationMessage;

/// Characters per token for the heuristic estimate.
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead added by `count_messages`, approximating role/name
/// framing tokens a real chat-completion tokenizer would add.
const MESSAGE_OVERHEAD: u32 = 3;

/// Estimate the token count of `text`.
///
/// Invariants relied on elsewhere in the crate:
/// - `count("") == 0`
/// - `count(a) + count(b) >= count(concat(a, b)) - 1` (sub-additive up to a
///   rounding slack of one token)
/// - monotonic: `a` a prefix of `b` implies `count(a) <= count(b)`
#[must_use]
pub fn count(text: &str) -> u32 {
    let chars = text.chars().count();
    (chars.div_ceil(CHARS_PER_TOKEN)) as u32
}

/// Estimate the combined token count of a conversation, including a small
/// per-message framing overhead.
#[must_use]
pub fn count_messages(messages: &[ConversationMessage]) -> u32 {
    messages
        .iter()
        .map(|m| count(&m.content) + MESSAGE_OVERHEAD)
        .sum()
}

/// Percent reduction from `original` to `compressed`, rounded to the
/// nearest integer. Returns 0 when `original` is 0 (nothing to reduce).
#[must_use]
pub fn reduction_percent(original: u32, compressed: u32) -> u32 {
    if original == 0 {
        return 0;
    }
    let saved = original.saturating_sub(compressed) as f64;
    ((saved / f64::from(original)) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero_tokens() {
        assert_eq!(count(""), 0);
    }

    #[test]
    fn monotonic_in_prefix_length() {
        let a = "fn foo() {";
        let b = "fn foo() { let x = 1;";
        assert!(count(a) <= count(b));
    }

    #[test]
    fn subadditive_within_one_token() {
        let a = "hello world ";
        let b = "goodbye world";
        let combined = format!("{a}{b}");
        assert!(count(&combined) <= count(a) + count(b) + 1);
    }

    #[test]
    fn reduction_percent_handles_zero_original() {
        assert_eq!(reduction_percent(0, 0), 0);
    }

    #[test]
    fn reduction_percent_basic() {
        assert_eq!(reduction_percent(100, 40), 60);
    }

    #[test]
    fn count_messages_adds_overhead_per_message() {
        let msgs = vec![
            ConversationMessage {
                role: crate::types::Role::User,
                content: "hi".into(),
            },
            ConversationMessage {
                role: crate::types::Role::Assistant,
                content: "hello".into(),
            },
        ];
        let total = count_messages(&msgs);
        assert!(total >= count("hi") + count("hello") + 2 * MESSAGE_OVERHEAD);
    }
}
