//! Registry tools wrapping C9: conversation compression and the single
//! process-wide memory slot.

use crate::conversation::{self, CompressOptions};
use crate::error::CoreError;
use crate::registry::ToolDyn;
use crate::types::ConversationMessage;
use serde_json::{json, Value};

fn parse_messages(args: &Value) -> Result<Vec<ConversationMessage>, CoreError> {
    let raw = args
        .get("messages")
        .ok_or_else(|| CoreError::InvalidInput("missing 'messages'".into()))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| CoreError::InvalidInput(format!("invalid 'messages': {e}")))
}

pub struct ConversationCompressTool;

impl ToolDyn for ConversationCompressTool {
    fn name(&self) -> &str {
        "conversation_compress"
    }
    fn description(&self) -> &str {
        "Compress a message list with the rolling-summary/key-extraction/hybrid strategy."
    }
    fn category(&self) -> &str {
        "pipeline"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"messages": {"type": "array"}, "maxTokens": {"type": "integer"}},
            "required": ["messages"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let messages = parse_messages(args)?;
        let mut opts = CompressOptions::default();
        if let Some(max) = args.get("maxTokens").and_then(Value::as_u64) {
            opts.max_tokens = Some(max as u32);
        }
        let result = conversation::compress(&messages, &opts);
        Ok(vec![serde_json::to_string(&result).unwrap_or_default()])
    }
}

pub struct CreateMemoryTool;

impl ToolDyn for CreateMemoryTool {
    fn name(&self) -> &str {
        "conversation_create_memory"
    }
    fn description(&self) -> &str {
        "Build and store a ConversationMemory snapshot from a message list."
    }
    fn category(&self) -> &str {
        "pipeline"
    }
    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"messages": {"type": "array"}}, "required": ["messages"]})
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let messages = parse_messages(args)?;
        let memory = conversation::create_memory(&messages);
        conversation::set_memory(memory.clone());
        Ok(vec![serde_json::to_string(&memory).unwrap_or_default()])
    }
}

pub struct GetMemoryTool;

impl ToolDyn for GetMemoryTool {
    fn name(&self) -> &str {
        "conversation_get_memory"
    }
    fn description(&self) -> &str {
        "Read the process-wide conversation memory slot, if set."
    }
    fn category(&self) -> &str {
        "pipeline"
    }
    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn execute(&self, _args: &Value) -> Result<Vec<String>, CoreError> {
        match conversation::get_memory() {
            Some(memory) => Ok(vec![serde_json::to_string(&memory).unwrap_or_default()]),
            None => Ok(vec!["null".to_string()]),
        }
    }
}

pub struct ClearMemoryTool;

impl ToolDyn for ClearMemoryTool {
    fn name(&self) -> &str {
        "conversation_clear_memory"
    }
    fn description(&self) -> &str {
        "Clear the process-wide conversation memory slot."
    }
    fn category(&self) -> &str {
        "pipeline"
    }
    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn execute(&self, _args: &Value) -> Result<Vec<String>, CoreError> {
        conversation::clear_memory();
        Ok(vec!["true".to_string()])
    }
}
