//! Registry tool exposing `discover` (§4.12): lazy catalog listing.

use crate::error::CoreError;
use crate::registry::{DiscoverFormat, ToolDyn, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Weak;

pub struct DiscoverTool {
    pub registry: Weak<ToolRegistry>,
}

impl ToolDyn for DiscoverTool {
    fn name(&self) -> &str {
        "discover"
    }
    fn description(&self) -> &str {
        "List available tools, optionally filtered by query/category, in list/schema/toon format."
    }
    fn category(&self) -> &str {
        "pipeline"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "category": {"type": "string", "enum": ["compress", "analyze", "logs", "code", "pipeline"]},
                "format": {"type": "string", "enum": ["list", "schema", "toon", "toon-tabular"]},
            }
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| CoreError::ExternalFailure("registry no longer available".into()))?;
        let query = args.get("query").and_then(Value::as_str);
        let category = args.get("category").and_then(Value::as_str);
        let format = match args.get("format").and_then(Value::as_str) {
            Some("schema") => DiscoverFormat::Schema,
            Some("toon") => DiscoverFormat::Toon,
            Some("toon-tabular") => DiscoverFormat::ToonTabular,
            _ => DiscoverFormat::List,
        };
        Ok(vec![registry.discover(query, category, format)])
    }
}
