//! Sandbox (C11): evaluates untrusted JS-flavored snippets that call into
//! the SDK (§6). The static analyzer and path validator are the actual
//! security boundary; QuickJS's own memory/time ceiling is the backstop.

pub mod analyzer;
pub mod pathguard;
pub mod sdk;

use crate::error::CoreError;
use crate::token;
use rquickjs::{Context, Function, Runtime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MEMORY_LIMIT: usize = 128 * 1024 * 1024;
const MAX_OUTPUT_TOKENS: u32 = 4000;

#[derive(Debug, Clone)]
pub struct SandboxOptions {
    pub timeout: Duration,
    pub memory_limit: usize,
    pub max_output_tokens: u32,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

impl SandboxOptions {
    #[must_use]
    pub fn clamp(mut self) -> Self {
        if self.timeout > MAX_TIMEOUT {
            self.timeout = MAX_TIMEOUT;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct SandboxReport {
    pub output: String,
    pub warnings: Vec<String>,
    pub timed_out: bool,
    pub truncated: bool,
}

/// Run `source` against the SDK rooted at `working_dir`. Both gate stages
/// (§4.11) must pass before the engine ever sees the snippet.
pub fn run(source: &str, working_dir: &Path, opts: &SandboxOptions) -> Result<SandboxReport, CoreError> {
    let opts = opts.clone().clamp();
    let report = analyzer::analyze(source)?;

    let ctx = sdk::SdkContext::new(working_dir.to_path_buf());
    let deadline = Instant::now() + opts.timeout;

    let runtime = Runtime::new().map_err(|e| CoreError::ExternalFailure(format!("quickjs runtime: {e}")))?;
    runtime.set_memory_limit(opts.memory_limit);
    let interrupt_deadline = deadline;
    runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= interrupt_deadline)));

    let context = Context::full(&runtime)
        .map_err(|e| CoreError::ExternalFailure(format!("quickjs context: {e}")))?;

    let sdk_ctx = Arc::new(ctx);
    let result: Result<String, CoreError> = context.with(|ctx| {
        bind_sdk(&ctx, Arc::clone(&sdk_ctx))
            .map_err(|e| CoreError::ExternalFailure(format!("binding sdk: {e}")))?;
        ctx.eval::<(), _>(SDK_PRELUDE)
            .map_err(|e| CoreError::ExternalFailure(format!("sdk prelude: {e}")))?;

        let value: rquickjs::Result<rquickjs::Value> = ctx.eval(source);
        match value {
            Ok(v) => {
                ctx.globals()
                    .set("__result", v)
                    .map_err(|e| CoreError::ExternalFailure(format!("storing result: {e}")))?;
                let json: String = ctx
                    .eval("JSON.stringify(globalThis.__result === undefined ? null : globalThis.__result)")
                    .map_err(|e| CoreError::ExternalFailure(format!("serializing result: {e}")))?;
                Ok(json)
            }
            Err(e) => Err(CoreError::ExternalFailure(sanitize_message(&e.to_string(), working_dir))),
        }
    });

    let timed_out = Instant::now() >= deadline;
    let output = result?;
    let (output, truncated) = truncate_output(output, opts.max_output_tokens);

    Ok(SandboxReport {
        output,
        warnings: report.warnings,
        timed_out,
        truncated,
    })
}

/// Bind a single native entry point, `__sdk_call(namespace, op, argsJson)`,
/// onto the globals. [`SDK_PRELUDE`] wraps it into the eight namespace
/// proxy objects the snippet actually calls — keeping the Rust/JS boundary
/// to one function, marshaled entirely through JSON strings.
fn bind_sdk<'js>(ctx: &rquickjs::Ctx<'js>, sdk: Arc<sdk::SdkContext>) -> rquickjs::Result<()> {
    let dispatch = Function::new(
        ctx.clone(),
        move |call_ctx: rquickjs::Ctx<'js>, namespace: String, op: String, args_json: String| -> rquickjs::Result<String> {
            let args: serde_json::Value = serde_json::from_str(&args_json).unwrap_or(serde_json::json!([]));
            match sdk.call(&namespace, &op, &args) {
                Ok(value) => Ok(serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())),
                Err(e) => {
                    warn!(namespace = %namespace, op = %op, error = %e, "sdk call failed");
                    Err(rquickjs::Exception::throw_message(&call_ctx, &e.to_string()))
                }
            }
        },
    )?;
    ctx.globals().set("__sdk_call", dispatch)?;
    Ok(())
}

/// Builds `{compress, code, files, git, search, analyze, utils,
/// conversation}` proxy objects where every method forwards
/// `name(...args)` to `__sdk_call(namespace, name, JSON.stringify(args))`
/// and JSON-parses the result.
const SDK_PRELUDE: &str = r#"
(function () {
  function makeNamespace(namespace) {
    return new Proxy({}, {
      get(_target, op) {
        return function (...args) {
          const raw = __sdk_call(namespace, String(op), JSON.stringify(args));
          return JSON.parse(raw);
        };
      },
    });
  }
  globalThis.compress = makeNamespace("compress");
  globalThis.code = makeNamespace("code");
  globalThis.files = makeNamespace("files");
  globalThis.git = makeNamespace("git");
  globalThis.search = makeNamespace("search");
  globalThis.analyze = makeNamespace("analyze");
  globalThis.utils = makeNamespace("utils");
  globalThis.conversation = makeNamespace("conversation");
})();
"#;

fn truncate_output(output: String, max_tokens: u32) -> (String, bool) {
    if token::count(&output) <= max_tokens {
        return (output, false);
    }
    let max_chars = (max_tokens as usize) * 4;
    let mut truncated: String = output.chars().take(max_chars).collect();
    truncated.push_str("...[truncated]");
    (truncated, true)
}

fn sanitize_message(message: &str, working_dir: &Path) -> String {
    let mut sanitized = message.replace(&working_dir.to_string_lossy().into_owned(), "<workdir>");
    if let Some(home) = dirs::home_dir() {
        sanitized = sanitized.replace(&home.to_string_lossy().into_owned(), "<home>");
    }
    sanitized
}

#[must_use]
pub fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_clamp_to_max_timeout() {
        let opts = SandboxOptions {
            timeout: Duration::from_secs(999),
            ..SandboxOptions::default()
        }
        .clamp();
        assert_eq!(opts.timeout, MAX_TIMEOUT);
    }

    #[test]
    fn blocked_snippet_never_reaches_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let result = run("eval('1')", dir.path(), &SandboxOptions::default());
        assert!(matches!(result, Err(CoreError::SandboxBlocked(_))));
    }

    #[test]
    fn truncate_output_marks_long_results() {
        let long = "x".repeat(100_000);
        let (out, truncated) = truncate_output(long, 10);
        assert!(truncated);
        assert!(out.ends_with("...[truncated]"));
    }

    #[test]
    fn sanitize_message_rewrites_working_dir() {
        let dir = PathBuf::from("/workspace/project");
        let message = format!("cannot read {}/secret.txt", dir.display());
        let sanitized = sanitize_message(&message, &dir);
        assert!(sanitized.contains("<workdir>"));
        assert!(!sanitized.contains("/workspace/project"));
    }
}
