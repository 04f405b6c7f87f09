//! Registry tools wrapping C2/C6/C7/C8: `compress.auto`/`logs`/`diff`/`semantic`.

use crate::detect::{self, ContentType};
use crate::diff;
use crate::error::CoreError;
use crate::logs::{self, DetailLevel};
use crate::registry::ToolDyn;
use crate::semantic;
use crate::types::Blob;
use serde_json::{json, Value};

pub struct AutoCompressTool;

impl ToolDyn for AutoCompressTool {
    fn name(&self) -> &str {
        "compress_auto"
    }
    fn description(&self) -> &str {
        "Detect content type and route to the matching compressor."
    }
    fn category(&self) -> &str {
        "compress"
    }
    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"content": {"type": "string"}}, "required": ["content"]})
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let blob = Blob::new(content);
        let detection = detect::analyze(&blob);
        let out = match detection.detected_type {
            ContentType::Logs | ContentType::Stacktrace => {
                logs::summarize(&blob.text, DetailLevel::Normal).overview
            }
            ContentType::Diff => diff::compress_summary(&diff::parse(&blob.text)),
            _ => semantic::compress(&blob.text, None, &[]).content,
        };
        Ok(vec![out])
    }
}

pub struct LogCompressTool;

impl ToolDyn for LogCompressTool {
    fn name(&self) -> &str {
        "compress_logs"
    }
    fn description(&self) -> &str {
        "Summarize log/stacktrace text at a chosen detail level."
    }
    fn category(&self) -> &str {
        "compress"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {"type": "string"},
                "detail": {"type": "string", "enum": ["minimal", "normal", "detailed"]},
            },
            "required": ["content"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let detail = match args.get("detail").and_then(Value::as_str) {
            Some("minimal") => DetailLevel::Minimal,
            Some("detailed") => DetailLevel::Detailed,
            _ => DetailLevel::Normal,
        };
        Ok(vec![logs::summarize(&content, detail).overview])
    }
}

pub struct DiffCompressTool;

impl ToolDyn for DiffCompressTool {
    fn name(&self) -> &str {
        "compress_diff"
    }
    fn description(&self) -> &str {
        "Parse a unified diff and emit a hunks-only summary."
    }
    fn category(&self) -> &str {
        "compress"
    }
    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"content": {"type": "string"}}, "required": ["content"]})
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let parsed = diff::parse(&content);
        Ok(vec![diff::compress_summary(&parsed)])
    }
}

pub struct SemanticCompressTool;

impl ToolDyn for SemanticCompressTool {
    fn name(&self) -> &str {
        "compress_semantic"
    }
    fn description(&self) -> &str {
        "Rank and keep the highest-scoring TF-IDF segments of free text."
    }
    fn category(&self) -> &str {
        "compress"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"content": {"type": "string"}, "ratio": {"type": "number"}},
            "required": ["content"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let ratio = args.get("ratio").and_then(Value::as_f64).map(|r| r as f32);
        Ok(vec![semantic::compress(&content, ratio, &[]).content])
    }
}

pub(crate) fn require_str(args: &Value, key: &str) -> Result<String, CoreError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoreError::InvalidInput(format!("missing '{key}'")))
}
