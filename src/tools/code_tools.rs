//! Registry tools wrapping C4: `code.parse`/`extract`/`skeleton`.

use crate::ast::{self, ExtractOptions};
use crate::error::CoreError;
use crate::registry::ToolDyn;
use crate::tools::compress_tools::require_str;
use crate::types::{Blob, ElementKind, Language};
use serde_json::{json, Value};

pub struct ParseTool;

impl ToolDyn for ParseTool {
    fn name(&self) -> &str {
        "code_parse"
    }
    fn description(&self) -> &str {
        "Parse source into its structural elements (functions, classes, imports)."
    }
    fn category(&self) -> &str {
        "code"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"content": {"type": "string"}, "language": {"type": "string"}},
            "required": ["content", "language"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let lang = Language::from_extension(&require_str(args, "language")?);
        let structure = ast::parse(&Blob::new(content), lang);
        Ok(vec![serde_json::to_string(&structure).unwrap_or_default()])
    }
}

pub struct SkeletonTool;

impl ToolDyn for SkeletonTool {
    fn name(&self) -> &str {
        "code_skeleton"
    }
    fn description(&self) -> &str {
        "Render signatures-only skeleton of a source file."
    }
    fn category(&self) -> &str {
        "code"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"content": {"type": "string"}, "language": {"type": "string"}},
            "required": ["content", "language"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let lang = Language::from_extension(&require_str(args, "language")?);
        Ok(vec![ast::skeleton(&Blob::new(content), lang)])
    }
}

pub struct ExtractTool;

impl ToolDyn for ExtractTool {
    fn name(&self) -> &str {
        "code_extract"
    }
    fn description(&self) -> &str {
        "Extract a single named function/class/method body (with optional imports/comments)."
    }
    fn category(&self) -> &str {
        "code"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {"type": "string"},
                "language": {"type": "string"},
                "kind": {"type": "string"},
                "name": {"type": "string"},
                "includeImports": {"type": "boolean"},
                "includeComments": {"type": "boolean"},
            },
            "required": ["content", "language", "kind", "name"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let content = require_str(args, "content")?;
        let lang = Language::from_extension(&require_str(args, "language")?);
        let kind = parse_kind(&require_str(args, "kind")?)?;
        let name = require_str(args, "name")?;
        let opts = ExtractOptions {
            include_imports: args.get("includeImports").and_then(Value::as_bool).unwrap_or(false),
            include_comments: args.get("includeComments").and_then(Value::as_bool).unwrap_or(false),
        };
        match ast::extract(&Blob::new(content), lang, kind, &name, opts) {
            Some(result) => Ok(vec![result.content]),
            None => Err(CoreError::NotFound(format!("element '{name}' not found"))),
        }
    }
}

fn parse_kind(kind: &str) -> Result<ElementKind, CoreError> {
    match kind {
        "function" => Ok(ElementKind::Function),
        "method" => Ok(ElementKind::Method),
        "class" => Ok(ElementKind::Class),
        "interface" => Ok(ElementKind::Interface),
        "type" => Ok(ElementKind::Type),
        "variable" => Ok(ElementKind::Variable),
        other => Err(CoreError::InvalidInput(format!("unknown element kind: {other}"))),
    }
}
