//! AST extraction (C4): parse source into a [`FileStructure`], with a
//! regex/quick-scan fallback for languages with no vendored grammar.

pub mod quickscan;
pub mod treesitter;

use crate::types::{Blob, CodeElement, ElementKind, FileStructure, Language};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Options controlling `extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub include_imports: bool,
    pub include_comments: bool,
}

/// One element located by `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub is_exported: bool,
}

/// Result of `extract`: the trimmed source plus the elements it covers.
#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub content: String,
    pub elements: Vec<CodeElement>,
}

/// Full parse. Uses the Rust grammar when available; every other language
/// degrades straight to `quick_scan` with `parse_degraded = true`.
#[must_use]
pub fn parse(blob: &Blob, language: Language) -> FileStructure {
    if language == Language::Rust {
        match treesitter::parse_rust(&blob.text) {
            Some(structure) => return structure,
            None => {
                warn!("rust grammar parse failed, degrading to quick scan");
            }
        }
    }
    quick_scan(blob, language)
}

/// Regex/prefix-stripping fallback. Never fails.
#[must_use]
pub fn quick_scan(blob: &Blob, language: Language) -> FileStructure {
    quickscan::quick_scan(&blob.text, language)
}

/// Extract one named element plus optional leading comments/imports.
///
/// Line numbers on the returned elements refer to the original file, not
/// the trimmed `content`.
#[must_use]
pub fn extract(
    blob: &Blob,
    language: Language,
    kind: ElementKind,
    name: &str,
    opts: ExtractOptions,
) -> Option<ExtractResult> {
    let structure = parse(blob, language);
    let element = structure
        .all_elements()
        .find(|e| e.kind == kind && e.name == name)?
        .clone();

    let lines: Vec<&str> = blob.text.lines().collect();
    let mut start_idx = (element.start_line.saturating_sub(1)) as usize;

    if opts.include_comments {
        while start_idx > 0 {
            let candidate = lines.get(start_idx - 1).map(str::trim).unwrap_or("");
            if candidate.starts_with("//") || candidate.starts_with('#') || candidate.starts_with('*') {
                start_idx -= 1;
            } else {
                break;
            }
        }
    }

    let end_idx = (element.end_line as usize).min(lines.len());
    let mut body = lines[start_idx..end_idx].join("\n");

    if opts.include_imports && !structure.imports.is_empty() {
        let import_block = structure
            .imports
            .iter()
            .filter_map(|i| i.signature.clone().or_else(|| Some(i.name.clone())))
            .collect::<Vec<_>>()
            .join("\n");
        body = format!("{import_block}\n\n{body}");
    }

    Some(ExtractResult {
        content: body,
        elements: vec![element],
    })
}

/// Compact signatures-only rendering of a file's top-level elements,
/// exposed to sandboxed snippets as `code.skeleton`.
#[must_use]
pub fn skeleton(blob: &Blob, language: Language) -> String {
    let structure = parse(blob, language);
    let mut lines = Vec::new();
    for el in structure
        .classes
        .iter()
        .chain(structure.interfaces.iter())
        .chain(structure.functions.iter())
    {
        let sig = el.signature.clone().unwrap_or_else(|| el.name.clone());
        if let Some(doc) = &el.documentation {
            lines.push(format!("/// {doc}"));
        }
        lines.push(sig);
    }
    lines.join("\n")
}

/// Substring search over a file's elements, ranked by match then by
/// `!is_exported` as a tiebreaker (exported symbols first).
#[must_use]
pub fn search(blob: &Blob, language: Language, query: &str) -> Vec<ElementRef> {
    let structure = parse(blob, language);
    let needle = query.to_lowercase();
    let mut matches: Vec<ElementRef> = structure
        .all_elements()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .map(|e| ElementRef {
            kind: e.kind,
            name: e.name.clone(),
            start_line: e.start_line,
            end_line: e.end_line,
            is_exported: e.is_exported,
        })
        .collect();
    matches.sort_by_key(|m| !m.is_exported);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_rust_function_with_imports() {
        let text = "use std::fmt;\n\n/// Adds one.\npub fn add_one(x: i32) -> i32 {\n    x + 1\n}\n";
        let blob = Blob::new(text);
        let result = extract(
            &blob,
            Language::Rust,
            ElementKind::Function,
            "add_one",
            ExtractOptions {
                include_imports: true,
                include_comments: true,
            },
        )
        .unwrap();
        assert!(result.content.contains("use std::fmt"));
        assert!(result.content.contains("fn add_one"));
    }

    #[test]
    fn search_ranks_exported_first() {
        let text = "fn helper() {}\npub fn helper_public() {}\n";
        let blob = Blob::new(text);
        let results = search(&blob, Language::Rust, "helper");
        assert_eq!(results.len(), 2);
        assert!(results[0].is_exported);
    }

    #[test]
    fn quick_scan_degrades_for_non_rust() {
        let blob = Blob::new("func main() {}\n");
        let structure = parse(&blob, Language::Go);
        assert!(structure.parse_degraded);
    }
}
