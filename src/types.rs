//! Shared data model (§3 of the spec): the value types every component
//! passes between each other. Kept in one module because almost every
//! other module needs a handful of these and a constellation of tiny
//! per-component type files would just fragment the same dozen structs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A chunk of UTF-8 text plus an optional hint about where it came from.
/// Never persisted by the core past a single tool invocation.
#[derive(Debug, Clone)]
pub struct Blob {
    pub text: String,
    pub path_hint: Option<PathBuf>,
}

impl Blob {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path_hint: None,
        }
    }

    #[must_use]
    pub fn with_path(text: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            path_hint: Some(path.into()),
        }
    }
}

/// Closed set of languages the AST extractor and detector recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Rust,
    Java,
    C,
    Cpp,
    CSharp,
    Swift,
    Php,
    Ruby,
    Generic,
}

impl Language {
    /// Map a file extension (without the leading dot) to a language.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "py" | "pyi" => Self::Python,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Self::Cpp,
            "cs" => Self::CSharp,
            "swift" => Self::Swift,
            "php" => Self::Php,
            "rb" => Self::Ruby,
            _ => Self::Generic,
        }
    }

    #[must_use]
    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Generic)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Swift => "swift",
            Self::Php => "php",
            Self::Ruby => "ruby",
            Self::Generic => "generic",
        }
    }
}

/// Closed set of code-element kinds a `FileStructure` groups symbols into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Variable,
    Import,
    Export,
}

/// One parsed element of a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeElement {
    pub kind: ElementKind,
    pub name: String,
    /// 1-indexed, inclusive.
    pub start_line: u32,
    /// 1-indexed, inclusive, `>= start_line`.
    pub end_line: u32,
    pub signature: Option<String>,
    pub documentation: Option<String>,
    /// For methods: the enclosing class/struct name.
    pub parent: Option<String>,
    pub is_exported: bool,
    pub is_async: bool,
}

impl CodeElement {
    #[must_use]
    pub fn new(kind: ElementKind, name: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            name: name.into(),
            start_line: line,
            end_line: line,
            signature: None,
            documentation: None,
            parent: None,
            is_exported: false,
            is_async: false,
        }
    }
}

/// The parsed structure of one file, produced by the AST extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileStructure {
    pub language: Option<Language>,
    pub total_lines: u32,
    pub functions: Vec<CodeElement>,
    pub classes: Vec<CodeElement>,
    pub interfaces: Vec<CodeElement>,
    pub types: Vec<CodeElement>,
    pub variables: Vec<CodeElement>,
    pub imports: Vec<CodeElement>,
    pub exports: Vec<CodeElement>,
    /// True when this structure came from `quick_scan` or a degraded
    /// full-parse attempt rather than a real grammar walk.
    pub parse_degraded: bool,
}

impl FileStructure {
    #[must_use]
    pub fn empty(total_lines: u32) -> Self {
        Self {
            total_lines,
            ..Default::default()
        }
    }

    /// All elements across every kind, in no particular order.
    pub fn all_elements(&self) -> impl Iterator<Item = &CodeElement> {
        self.functions
            .iter()
            .chain(self.classes.iter())
            .chain(self.interfaces.iter())
            .chain(self.types.iter())
            .chain(self.variables.iter())
            .chain(self.imports.iter())
            .chain(self.exports.iter())
    }
}

/// One file's change summary, as parsed out of a unified diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffFileChange {
    pub file: String,
    pub status: DiffStatus,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// A log level as recognized by the log summarizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

/// One (possibly deduplicated) log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub count: u32,
    pub context: Option<String>,
    pub raw: String,
}

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

/// The single process-wide conversation-memory slot (§4.9, §5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub summary: String,
    pub decisions: Vec<String>,
    pub code_references: Vec<String>,
    pub compressed_history: Vec<ConversationMessage>,
    pub last_updated: String,
}

/// A normalized line-signature group, as produced by the dedup grouper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureGroup {
    pub signature: String,
    pub representative_lines: Vec<String>,
    pub occurrences: u32,
    pub files: Vec<String>,
}

/// One piece of tool-result content. The spec only ever uses text content,
/// but the shape leaves room for future content types without a breaking
/// change to `ToolResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Result of dispatching a tool, including the token accounting every
/// middleware pass reads and updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub tokens_saved: u32,
    pub was_filtered: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ToolResult {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
            tokens_in: 0,
            tokens_out: 0,
            tokens_saved: 0,
            was_filtered: false,
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
            tokens_in: 0,
            tokens_out: 0,
            tokens_saved: 0,
            was_filtered: false,
            metadata: serde_json::Map::new(),
        }
    }

    /// Concatenation of all text content blocks, used for token accounting.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
