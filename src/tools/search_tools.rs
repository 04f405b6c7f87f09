//! Registry tools covering `search` (ripgrep passthrough, kept from the
//! teacher) and the path-guarded SDK search ops (symbols/references/grep).

use crate::error::CoreError;
use crate::registry::ToolDyn;
use crate::sandbox::sdk::SdkContext;
use crate::tools::compress_tools::require_str;
use serde_json::{json, Value};
use std::path::PathBuf;

pub struct RipgrepSearchTool;

impl ToolDyn for RipgrepSearchTool {
    fn name(&self) -> &str {
        "search"
    }
    fn description(&self) -> &str {
        "Search for a pattern in files using ripgrep. Returns matching lines with context."
    }
    fn category(&self) -> &str {
        "analyze"
    }
    fn input_schema(&self) -> Value {
        crate::tools::search::definition()
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        crate::tools::search::execute(args)
            .map(|s| vec![s])
            .map_err(|e| CoreError::ExternalFailure(e.to_string()))
    }
}

pub struct SdkSearchTool {
    pub working_dir: PathBuf,
}

impl ToolDyn for SdkSearchTool {
    fn name(&self) -> &str {
        "search_symbols"
    }
    fn description(&self) -> &str {
        "Rank code symbols across a glob of files by BM25 relevance to a query."
    }
    fn category(&self) -> &str {
        "analyze"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}, "glob": {"type": "string"}},
            "required": ["query"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let query = require_str(args, "query")?;
        let glob = args.get("glob").and_then(Value::as_str).unwrap_or("**/*").to_string();
        let ctx = SdkContext::new(self.working_dir.clone());
        let result = ctx.call("search", "symbols", &json!([query, glob]))?;
        Ok(vec![serde_json::to_string(&result).unwrap_or_default()])
    }
}
