//! Registry tool wrapping C11: execute an SDK-calling snippet in the sandbox.

use crate::error::CoreError;
use crate::registry::ToolDyn;
use crate::sandbox::{self, SandboxOptions};
use crate::tools::compress_tools::require_str;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

pub struct SandboxExecuteTool {
    pub working_dir: PathBuf,
}

impl ToolDyn for SandboxExecuteTool {
    fn name(&self) -> &str {
        "sandbox_execute"
    }
    fn description(&self) -> &str {
        "Run a short JS snippet against the compress/code/files/git/search/analyze/utils/conversation SDK."
    }
    fn category(&self) -> &str {
        "pipeline"
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"source": {"type": "string"}, "timeoutSecs": {"type": "integer"}},
            "required": ["source"]
        })
    }
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
        let source = require_str(args, "source")?;
        let mut opts = SandboxOptions::default();
        if let Some(secs) = args.get("timeoutSecs").and_then(Value::as_u64) {
            opts.timeout = Duration::from_secs(secs);
        }
        let report = sandbox::run(&source, &self.working_dir, &opts)?;
        let mut lines = vec![report.output];
        for warning in report.warnings {
            lines.push(format!("warning: {warning}"));
        }
        if report.timed_out {
            lines.push("warning: execution hit the deadline".to_string());
        }
        Ok(lines)
    }
}
