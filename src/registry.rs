//! Tool Registry & Pipeline (C12): object-safe tool dispatch with an
//! explicit before/after/on_error middleware chain and a lazy catalog.
//!
//! Grounded in the teacher's phase-adaptive tool selection
//! (`tools::tools_for_turn`) generalized into a real lazy/loaded split, and
//! in `ToolDyn`/`ToolRegistry`'s `Arc<dyn Trait>` storage shape — but the
//! middleware trait here exposes `before`/`after`/`on_error` as three named
//! hooks rather than a single `Next`-style continuation, since that's what
//! dispatch's numbered steps actually call for.

use crate::error::CoreError;
use crate::token;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// One tool invocation's lifecycle state, threaded through every middleware
/// hook and mutated in place.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub name: String,
    pub args: Value,
    pub start_time: Instant,
    pub metadata: HashMap<String, Value>,
    pub middleware_errors: Vec<String>,
}

/// Outcome of a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<String>,
    pub is_error: bool,
    pub was_filtered: bool,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub tokens_saved: u32,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    fn filtered(tokens_in: u32) -> Self {
        Self {
            content: vec![],
            is_error: false,
            was_filtered: true,
            tokens_in,
            tokens_out: 0,
            tokens_saved: 0,
            metadata: HashMap::new(),
        }
    }

    fn error(message: String, tokens_in: u32) -> Self {
        Self {
            content: vec![message],
            is_error: true,
            was_filtered: false,
            tokens_in,
            tokens_out: 0,
            tokens_saved: 0,
            metadata: HashMap::new(),
        }
    }
}

/// Object-safe tool: name/description/schema are cheap metadata; `execute`
/// is only required once the tool is loaded.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    fn input_schema(&self) -> Value;
    fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError>;
}

/// Middleware hook points. `before` may return `None` to skip execution
/// entirely (step 3 of dispatch); `after` and `on_error` never abort.
pub trait ToolMiddleware: Send + Sync {
    fn before(&self, _ctx: &mut ToolContext) -> Option<()> {
        Some(())
    }
    fn after(&self, _ctx: &mut ToolContext, _result: &mut ToolResult) {}
    fn on_error(&self, _ctx: &mut ToolContext, _error: &CoreError) -> Option<ToolResult> {
        None
    }
}

struct CatalogEntry {
    tool: Option<Arc<dyn ToolDyn>>,
    name: String,
    description: String,
    category: String,
    schema: Value,
}

/// Registry distinguishing *available* (metadata only) from *loaded*
/// (executable) tools, with a `Mutex`-serialized write path and
/// copy-on-read snapshots via `Arc<HashMap<..>>`.
pub struct ToolRegistry {
    catalog: Mutex<HashMap<String, CatalogEntry>>,
    middleware: RwLock<Vec<Arc<dyn ToolMiddleware>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(HashMap::new()),
            middleware: RwLock::new(Vec::new()),
        }
    }

    /// Register available metadata without mounting an executor.
    pub fn register_available(&self, name: &str, description: &str, category: &str, schema: Value) {
        let mut catalog = self.catalog.lock().expect("catalog mutex poisoned");
        catalog.insert(
            name.to_string(),
            CatalogEntry {
                tool: None,
                name: name.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                schema,
            },
        );
    }

    /// Register an already-loaded, executable tool.
    pub fn register(&self, tool: Arc<dyn ToolDyn>) {
        let mut catalog = self.catalog.lock().expect("catalog mutex poisoned");
        catalog.insert(
            tool.name().to_string(),
            CatalogEntry {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                category: tool.category().to_string(),
                schema: tool.input_schema(),
                tool: Some(tool),
            },
        );
    }

    /// Mount the executor for a previously metadata-only entry.
    pub fn load(&self, name: &str, tool: Arc<dyn ToolDyn>) -> Result<(), CoreError> {
        let mut catalog = self.catalog.lock().expect("catalog mutex poisoned");
        let entry = catalog
            .get_mut(name)
            .ok_or_else(|| CoreError::NotFound(format!("tool '{name}' is not registered")))?;
        entry.tool = Some(tool);
        Ok(())
    }

    pub fn unregister(&self, name: &str) {
        self.catalog.lock().expect("catalog mutex poisoned").remove(name);
    }

    pub fn use_middleware(&self, middleware: Arc<dyn ToolMiddleware>) {
        self.middleware.write().expect("middleware lock poisoned").push(middleware);
    }

    /// §4.12 dispatch: count in, before-chain, execute, count out,
    /// after-chain (reversed), on_error on failure.
    pub fn dispatch(&self, name: &str, args: Value) -> ToolResult {
        let tokens_in = token::count(&args.to_string());
        let mut ctx = ToolContext {
            name: name.to_string(),
            args: args.clone(),
            start_time: Instant::now(),
            metadata: HashMap::new(),
            middleware_errors: Vec::new(),
        };

        let middleware: Vec<Arc<dyn ToolMiddleware>> =
            self.middleware.read().expect("middleware lock poisoned").clone();

        for mw in &middleware {
            if mw.before(&mut ctx).is_none() {
                return ToolResult::filtered(tokens_in);
            }
        }

        let tool = {
            let catalog = self.catalog.lock().expect("catalog mutex poisoned");
            catalog.get(name).and_then(|entry| entry.tool.clone())
        };

        let outcome = match tool {
            None => Err(CoreError::NotFound(format!("tool '{name}' is not loaded"))),
            Some(tool) => tool.execute(&args),
        };

        let mut result = match outcome {
            Ok(content) => {
                let tokens_out = token::count(&content.join("\n"));
                ToolResult {
                    content,
                    is_error: false,
                    was_filtered: false,
                    tokens_in,
                    tokens_out,
                    tokens_saved: tokens_in.saturating_sub(tokens_out),
                    metadata: HashMap::new(),
                }
            }
            Err(err) => {
                let mut handled = None;
                for mw in &middleware {
                    if let Some(result) = mw.on_error(&mut ctx, &err) {
                        handled = Some(result);
                        break;
                    }
                }
                handled.unwrap_or_else(|| {
                    ToolResult::error(format!("Error executing {name}: {err}"), tokens_in)
                })
            }
        };

        for mw in middleware.iter().rev() {
            mw.after(&mut ctx, &mut result);
        }

        result
    }

    /// §4.12 `discover`: lazy catalog listing, filterable by query/category,
    /// rendered as `list` (names only), full schemas, or `toon`/`toon-tabular`.
    pub fn discover(&self, query: Option<&str>, category: Option<&str>, format: DiscoverFormat) -> String {
        let catalog = self.catalog.lock().expect("catalog mutex poisoned");
        let mut matches: Vec<&CatalogEntry> = catalog
            .values()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .filter(|e| {
                query.is_none_or(|q| {
                    let q = q.to_lowercase();
                    e.name.to_lowercase().contains(&q) || e.description.to_lowercase().contains(&q)
                })
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));

        match format {
            DiscoverFormat::List => matches.iter().map(|e| e.name.clone()).collect::<Vec<_>>().join("\n"),
            DiscoverFormat::Schema => {
                let items: Vec<Value> = matches
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "name": e.name, "description": e.description,
                            "category": e.category, "schema": e.schema,
                            "loaded": e.tool.is_some(),
                        })
                    })
                    .collect();
                serde_json::to_string(&items).unwrap_or_default()
            }
            DiscoverFormat::Toon => render_toon(&matches, false),
            DiscoverFormat::ToonTabular => render_toon(&matches, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverFormat {
    List,
    Schema,
    Toon,
    ToonTabular,
}

/// Compact key-once tabular encoding: header row of keys, tab-separated
/// value rows. Deterministic for a given catalog snapshot.
fn render_toon(entries: &[&CatalogEntry], tabular: bool) -> String {
    let header = if tabular {
        "name\tcategory\tdescription\tloaded"
    } else {
        "name\tcategory\tdescription"
    };
    let mut out = String::from(header);
    out.push('\n');
    for entry in entries {
        out.push_str(&escape_toon(&entry.name));
        out.push('\t');
        out.push_str(&escape_toon(&entry.category));
        out.push('\t');
        out.push_str(&escape_toon(&entry.description));
        if tabular {
            out.push('\t');
            out.push_str(if entry.tool.is_some() { "1" } else { "0" });
        }
        out.push('\n');
    }
    out
}

fn escape_toon(field: &str) -> String {
    if field.contains('\t') || field.contains('\n') || !field.is_ascii() {
        base64_encode(field.as_bytes())
    } else {
        field.to_string()
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::new();
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied().unwrap_or(0);
        let b2 = chunk.get(2).copied().unwrap_or(0);
        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(b2 & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;
    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn category(&self) -> &str {
            "compress"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn execute(&self, args: &Value) -> Result<Vec<String>, CoreError> {
            Ok(vec![args.to_string()])
        }
    }

    struct FailTool;
    impl ToolDyn for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn category(&self) -> &str {
            "analyze"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn execute(&self, _args: &Value) -> Result<Vec<String>, CoreError> {
            Err(CoreError::InvalidInput("boom".into()))
        }
    }

    struct SkipMiddleware;
    impl ToolMiddleware for SkipMiddleware {
        fn before(&self, _ctx: &mut ToolContext) -> Option<()> {
            None
        }
    }

    #[test]
    fn dispatch_executes_registered_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let result = registry.dispatch("echo", json!({"x": 1}));
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn dispatch_reports_not_found() {
        let registry = ToolRegistry::new();
        let result = registry.dispatch("missing", json!({}));
        assert!(result.is_error);
    }

    #[test]
    fn dispatch_surfaces_tool_errors() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(FailTool));
        let result = registry.dispatch("fail", json!({}));
        assert!(result.is_error);
        assert!(result.content[0].contains("boom"));
    }

    #[test]
    fn before_middleware_can_skip_execution() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.use_middleware(Arc::new(SkipMiddleware));
        let result = registry.dispatch("echo", json!({}));
        assert!(result.was_filtered);
        assert_eq!(result.tokens_out, 0);
    }

    #[test]
    fn discover_filters_by_category_and_query() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(FailTool));
        let list = registry.discover(None, Some("compress"), DiscoverFormat::List);
        assert_eq!(list, "echo");
        let list = registry.discover(Some("fail"), None, DiscoverFormat::List);
        assert_eq!(list, "fail");
    }

    #[test]
    fn toon_output_is_deterministic() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(FailTool));
        let first = registry.discover(None, None, DiscoverFormat::Toon);
        let second = registry.discover(None, None, DiscoverFormat::Toon);
        assert_eq!(first, second);
        assert!(first.starts_with("name\tcategory\tdescription"));
    }

    #[test]
    fn available_only_entries_are_not_loaded() {
        let registry = ToolRegistry::new();
        registry.register_available("pending", "not yet loaded", "analyze", json!({}));
        let result = registry.dispatch("pending", json!({}));
        assert!(result.is_error);
    }
}
