//! The SDK surface (§6) exposed to sandboxed snippets: eight namespaces,
//! each a thin wrapper over the corresponding component. Every file-taking
//! operation is routed through [`PathGuard`] before touching disk.

use crate::ast::{self, ExtractOptions};
use crate::conversation;
use crate::detect;
use crate::diff;
use crate::error::CoreError;
use crate::git::GitRepo;
use crate::globmatch;
use crate::hybrid::HybridIndex;
use crate::logs;
use crate::sandbox::pathguard::PathGuard;
use crate::semantic;
use crate::token;
use crate::types::{Blob, ElementKind, Language};
use serde_json::{json, Value};
use std::path::PathBuf;

pub struct SdkContext {
    pub working_dir: PathBuf,
    guard: PathGuard,
    git: Option<GitRepo>,
}

impl SdkContext {
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let git = GitRepo::open(&working_dir);
        Self {
            guard: PathGuard::new(working_dir.clone()),
            working_dir,
            git,
        }
    }

    /// Dispatch one `namespace.op(args)` call. `args` is the JSON array of
    /// positional arguments the JS shim packed.
    pub fn call(&self, namespace: &str, op: &str, args: &Value) -> Result<Value, CoreError> {
        let arr = args.as_array().cloned().unwrap_or_default();
        match namespace {
            "compress" => self.compress(op, &arr),
            "code" => self.code(op, &arr),
            "files" => self.files(op, &arr),
            "git" => self.git(op, &arr),
            "search" => self.search(op, &arr),
            "analyze" => self.analyze(op, &arr),
            "utils" => self.utils(op, &arr),
            "conversation" => self.conversation(op, &arr),
            other => Err(CoreError::Unsupported(format!("unknown namespace: {other}"))),
        }
    }

    fn compress(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        match op {
            "auto" => {
                let content = arg_str(args, 0)?;
                let blob = Blob::new(content);
                let detection = detect::analyze(&blob);
                let result = match detection.detected_type {
                    detect::ContentType::Logs | detect::ContentType::Stacktrace => {
                        json!(logs::summarize(&blob.text, logs::DetailLevel::Normal))
                    }
                    detect::ContentType::Diff => json!(diff::compress_summary(&diff::parse(&blob.text))),
                    _ => json!(semantic::compress(&blob.text, None, &[])),
                };
                Ok(json!({"detected_type": detection.detected_type, "result": result}))
            }
            "logs" => {
                let content = arg_str(args, 0)?;
                Ok(json!(logs::summarize(&content, logs::DetailLevel::Normal)))
            }
            "diff" => {
                let content = arg_str(args, 0)?;
                Ok(json!(diff::parse(&content)))
            }
            "semantic" => {
                let content = arg_str(args, 0)?;
                let ratio = args.get(1).and_then(Value::as_f64).map(|r| r as f32);
                Ok(json!(semantic::compress(&content, ratio, &[])))
            }
            other => Err(CoreError::Unsupported(format!("compress.{other}"))),
        }
    }

    fn code(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        match op {
            "parse" => {
                let content = arg_str(args, 0)?;
                let lang = arg_lang(args, 1)?;
                Ok(json!(ast::parse(&Blob::new(content), lang)))
            }
            "extract" => {
                let content = arg_str(args, 0)?;
                let lang = arg_lang(args, 1)?;
                let target = args.get(2).ok_or_else(|| CoreError::InvalidInput("missing target".into()))?;
                let kind = target_kind(target)?;
                let name = target
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CoreError::InvalidInput("target.name missing".into()))?;
                let opts = ExtractOptions {
                    include_imports: target.get("includeImports").and_then(Value::as_bool).unwrap_or(false),
                    include_comments: target.get("includeComments").and_then(Value::as_bool).unwrap_or(false),
                };
                match ast::extract(&Blob::new(content), lang, kind, name, opts) {
                    Some(result) => Ok(json!({"content": result.content})),
                    None => Err(CoreError::NotFound(format!("element '{name}' not found"))),
                }
            }
            "skeleton" => {
                let content = arg_str(args, 0)?;
                let lang = arg_lang(args, 1)?;
                Ok(json!(ast::skeleton(&Blob::new(content), lang)))
            }
            other => Err(CoreError::Unsupported(format!("code.{other}"))),
        }
    }

    fn files(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        match op {
            "read" => {
                let path = arg_str(args, 0)?;
                let resolved = self.guard.resolve(&path)?;
                std::fs::read_to_string(&resolved)
                    .map(|s| json!(s))
                    .map_err(|e| CoreError::ExternalFailure(format!("read {path}: {e}")))
            }
            "exists" => {
                let path = arg_str(args, 0)?;
                match self.guard.resolve(&path) {
                    Ok(resolved) => Ok(json!(resolved.exists())),
                    Err(_) => Ok(json!(false)),
                }
            }
            "glob" => {
                let pattern = arg_str(args, 0)?;
                self.guard.validate_glob(&pattern)?;
                Ok(json!(globmatch::glob_files(&self.working_dir, &pattern)))
            }
            other => Err(CoreError::Unsupported(format!("files.{other}"))),
        }
    }

    fn git(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        let repo = self
            .git
            .as_ref()
            .ok_or_else(|| CoreError::ExternalFailure("not a git repository".into()))?;
        match op {
            "diff" => {
                let git_ref = args.first().and_then(Value::as_str);
                repo.diff(git_ref).map(|s| json!(s))
            }
            "log" => {
                let limit = args.first().and_then(Value::as_u64).unwrap_or(20) as usize;
                repo.log(limit).map(|entries| {
                    json!(entries
                        .into_iter()
                        .map(|e| json!({
                            "hash": e.hash, "shortHash": e.short_hash,
                            "message": e.message, "timestamp": e.timestamp,
                        }))
                        .collect::<Vec<_>>())
                })
            }
            "blame" => {
                let file = arg_str(args, 0)?;
                let line = args.get(1).and_then(Value::as_u64).map(|n| n as u32);
                repo.blame(&file, line).map(|lines| {
                    json!(lines
                        .into_iter()
                        .map(|l| json!({
                            "hash": l.hash, "author": l.author,
                            "line": l.line_no, "content": l.content,
                        }))
                        .collect::<Vec<_>>())
                })
            }
            "status" => repo.status().map(|s| json!(s)),
            "branch" => repo.branch().map(|s| json!(s)),
            other => Err(CoreError::Unsupported(format!("git.{other}"))),
        }
    }

    fn search(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        match op {
            "grep" => {
                let pattern = arg_str(args, 0)?;
                let glob = args.get(1).and_then(Value::as_str);
                Ok(json!(self.grep(&pattern, glob)?))
            }
            "files" => {
                let pattern = arg_str(args, 0)?;
                self.guard.validate_glob(&pattern)?;
                Ok(json!(globmatch::glob_files(&self.working_dir, &pattern)))
            }
            "symbols" => {
                let query = arg_str(args, 0)?;
                let glob = args.get(1).and_then(Value::as_str).unwrap_or("**/*");
                Ok(json!(self.search_symbols(&query, glob)?))
            }
            "references" => {
                let symbol = arg_str(args, 0)?;
                let glob = args.get(1).and_then(Value::as_str).unwrap_or("**/*");
                Ok(json!(self.search_references(&symbol, glob)?))
            }
            other => Err(CoreError::Unsupported(format!("search.{other}"))),
        }
    }

    fn grep(&self, pattern: &str, glob: Option<&str>) -> Result<Vec<Value>, CoreError> {
        let files = globmatch::glob_files(&self.working_dir, glob.unwrap_or("**/*"));
        let regex = regex::Regex::new(pattern)
            .map_err(|e| CoreError::InvalidInput(format!("invalid pattern: {e}")))?;
        let mut hits = Vec::new();
        for file in files {
            let Ok(resolved) = self.guard.resolve(&file) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(&resolved) else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    hits.push(json!({"file": file, "line": idx + 1, "text": line}));
                }
                if hits.len() >= 200 {
                    return Ok(hits);
                }
            }
        }
        Ok(hits)
    }

    fn search_symbols(&self, query: &str, glob: &str) -> Result<Vec<Value>, CoreError> {
        #[derive(Clone)]
        struct SymItem {
            file: String,
            kind: ElementKind,
            name: String,
            line: u32,
            text: String,
        }

        let files = globmatch::glob_files(&self.working_dir, glob);
        let mut items = Vec::new();
        for file in &files {
            let Ok(resolved) = self.guard.resolve(file) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(&resolved) else {
                continue;
            };
            let lang = Language::from_path(&resolved);
            let structure = ast::quick_scan(&Blob::with_path(content, resolved.as_path()), lang);
            for el in structure.all_elements() {
                items.push(SymItem {
                    file: file.clone(),
                    kind: el.kind,
                    name: el.name.clone(),
                    line: el.start_line,
                    text: format!("{:?} {}", el.kind, el.name),
                });
            }
        }

        let index = HybridIndex::new(items, |i| i.text.clone());
        let hits = index.search_bm25_only(query);
        Ok(hits
            .into_iter()
            .take(50)
            .map(|h| json!({
                "file": h.item.file, "kind": format!("{:?}", h.item.kind).to_lowercase(),
                "name": h.item.name, "line": h.item.line, "score": h.bm25_score,
            }))
            .collect())
    }

    fn search_references(&self, symbol: &str, glob: &str) -> Result<Vec<Value>, CoreError> {
        #[derive(Clone)]
        struct RefItem {
            file: String,
            line: u32,
            text: String,
        }

        let files = globmatch::glob_files(&self.working_dir, glob);
        let mut items = Vec::new();
        for file in &files {
            let Ok(resolved) = self.guard.resolve(file) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(&resolved) else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                if line.contains(symbol) {
                    items.push(RefItem {
                        file: file.clone(),
                        line: idx as u32 + 1,
                        text: line.to_string(),
                    });
                }
            }
        }

        let index = HybridIndex::new(items, |i| i.text.clone());
        let hits = index.search_bm25_only(symbol);
        Ok(hits
            .into_iter()
            .take(100)
            .map(|h| json!({"file": h.item.file, "line": h.item.line, "text": h.item.text}))
            .collect())
    }

    fn analyze(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        match op {
            "dependencies" => {
                let file = arg_str(args, 0)?;
                let resolved = self.guard.resolve(&file)?;
                let content = std::fs::read_to_string(&resolved)
                    .map_err(|e| CoreError::ExternalFailure(format!("read {file}: {e}")))?;
                let lang = Language::from_path(&resolved);
                let structure = ast::quick_scan(&Blob::with_path(content, resolved.as_path()), lang);
                Ok(json!(structure
                    .imports
                    .iter()
                    .map(|i| i.name.clone())
                    .collect::<Vec<_>>()))
            }
            "exports" => {
                let file = arg_str(args, 0)?;
                let resolved = self.guard.resolve(&file)?;
                let content = std::fs::read_to_string(&resolved)
                    .map_err(|e| CoreError::ExternalFailure(format!("read {file}: {e}")))?;
                let lang = Language::from_path(&resolved);
                let structure = ast::quick_scan(&Blob::with_path(content, resolved.as_path()), lang);
                Ok(json!(structure
                    .all_elements()
                    .filter(|e| e.is_exported)
                    .map(|e| e.name.clone())
                    .collect::<Vec<_>>()))
            }
            "call_graph" => {
                let function = arg_str(args, 0)?;
                let file = arg_str(args, 1)?;
                let depth = args.get(2).and_then(Value::as_u64).unwrap_or(1).max(1);
                self.call_graph(&function, &file, depth as u32)
            }
            "structure" => {
                let dir = args.first().and_then(Value::as_str).unwrap_or(".");
                let depth = args.get(1).and_then(Value::as_u64).unwrap_or(3) as u32;
                Ok(json!(self.structure(dir, depth)?))
            }
            other => Err(CoreError::Unsupported(format!("analyze.{other}"))),
        }
    }

    fn call_graph(&self, function: &str, file: &str, depth: u32) -> Result<Value, CoreError> {
        let resolved = self.guard.resolve(file)?;
        let content = std::fs::read_to_string(&resolved)
            .map_err(|e| CoreError::ExternalFailure(format!("read {file}: {e}")))?;
        let lang = Language::from_path(&resolved);
        let structure = ast::quick_scan(&Blob::with_path(content, resolved.as_path()), lang);
        if !structure.all_elements().any(|e| e.name == function) {
            return Err(CoreError::NotFound(format!("function '{function}' not found")));
        }

        let mut callers = Vec::new();
        let call_pattern = format!("{function}(");
        for (idx, line) in self.grep(&regex::escape(&call_pattern), None)?.iter().enumerate() {
            if idx as u32 >= depth * 20 {
                break;
            }
            callers.push(line.clone());
        }
        Ok(json!({"function": function, "file": file, "callers": callers}))
    }

    fn structure(&self, dir: &str, depth: u32) -> Result<Value, CoreError> {
        let root = self.guard.resolve(dir).unwrap_or_else(|_| self.working_dir.clone());
        Ok(json!(walk_structure(&root, &root, depth)))
    }

    fn utils(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        match op {
            "count_tokens" => {
                let text = arg_str(args, 0)?;
                Ok(json!(token::count(&text)))
            }
            "detect_type" => {
                let text = arg_str(args, 0)?;
                Ok(json!(detect::analyze(&Blob::new(text))))
            }
            "detect_language" => {
                let path = arg_str(args, 0)?;
                Ok(json!(Language::from_path(std::path::Path::new(&path)).label()))
            }
            other => Err(CoreError::Unsupported(format!("utils.{other}"))),
        }
    }

    fn conversation(&self, op: &str, args: &[Value]) -> Result<Value, CoreError> {
        use crate::types::ConversationMessage;

        let parse_messages = |v: &Value| -> Vec<ConversationMessage> {
            serde_json::from_value(v.clone()).unwrap_or_default()
        };

        match op {
            "compress" => {
                let messages = parse_messages(args.first().unwrap_or(&json!([])));
                Ok(json!(conversation::compress(
                    &messages,
                    &conversation::CompressOptions::default()
                )))
            }
            "create_memory" => {
                let messages = parse_messages(args.first().unwrap_or(&json!([])));
                Ok(json!(conversation::create_memory(&messages)))
            }
            "extract_decisions" => {
                let messages = parse_messages(args.first().unwrap_or(&json!([])));
                Ok(json!(conversation::extract_decisions(&messages)))
            }
            "extract_code_refs" => {
                let messages = parse_messages(args.first().unwrap_or(&json!([])));
                Ok(json!(conversation::extract_code_refs(&messages)))
            }
            "restore" => Ok(json!(conversation::restore())),
            "get_memory" => Ok(json!(conversation::get_memory())),
            "set_memory" => {
                let memory = args
                    .first()
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .ok_or_else(|| CoreError::InvalidInput("invalid memory object".into()))?;
                conversation::set_memory(memory);
                Ok(json!(true))
            }
            "clear_memory" => {
                conversation::clear_memory();
                Ok(json!(true))
            }
            "has_memory" => Ok(json!(conversation::has_memory())),
            "get_summary" => Ok(json!(conversation::get_summary())),
            other => Err(CoreError::Unsupported(format!("conversation.{other}"))),
        }
    }
}

fn walk_structure(root: &std::path::Path, dir: &std::path::Path, depth: u32) -> Value {
    if depth == 0 {
        return json!(null);
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return json!(null);
    };
    let mut children = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            children.push(json!({"name": name, "type": "dir", "children": walk_structure(root, &path, depth - 1)}));
        } else {
            children.push(json!({"name": name, "type": "file"}));
        }
    }
    json!(children)
}

fn arg_str(args: &[Value], idx: usize) -> Result<String, CoreError> {
    args.get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoreError::InvalidInput(format!("expected string argument at position {idx}")))
}

fn arg_lang(args: &[Value], idx: usize) -> Result<Language, CoreError> {
    let label = args.get(idx).and_then(Value::as_str).unwrap_or("generic");
    Ok(Language::from_extension(label))
}

fn target_kind(target: &Value) -> Result<ElementKind, CoreError> {
    match target.get("kind").and_then(Value::as_str) {
        Some("function") => Ok(ElementKind::Function),
        Some("method") => Ok(ElementKind::Method),
        Some("class") => Ok(ElementKind::Class),
        Some("interface") => Ok(ElementKind::Interface),
        Some("type") => Ok(ElementKind::Type),
        Some("variable") => Ok(ElementKind::Variable),
        Some(other) => Err(CoreError::InvalidInput(format!("unknown element kind: {other}"))),
        None => Err(CoreError::InvalidInput("target.kind missing".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utils_count_tokens_roundtrips_through_json() {
        let ctx = SdkContext::new(std::env::temp_dir());
        let result = ctx.call("utils", "count_tokens", &json!(["hello world"])).unwrap();
        assert!(result.as_u64().unwrap() > 0);
    }

    #[test]
    fn files_read_outside_working_dir_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SdkContext::new(dir.path());
        let result = ctx.call("files", "read", &json!(["../../etc/passwd"]));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_namespace_is_unsupported() {
        let ctx = SdkContext::new(std::env::temp_dir());
        let result = ctx.call("nope", "op", &json!([]));
        assert!(matches!(result, Err(CoreError::Unsupported(_))));
    }

    #[test]
    fn code_skeleton_renders_signatures() {
        let ctx = SdkContext::new(std::env::temp_dir());
        let src = "pub fn add_one(x: i32) -> i32 { x + 1 }";
        let result = ctx.call("code", "skeleton", &json!([src, "rs"])).unwrap();
        assert!(result.as_str().unwrap().contains("add_one"));
    }
}
