//! Full-grammar AST parse for Rust, using `tree-sitter` + `tree-sitter-rust`.
//!
//! This is the only vendored grammar (matching the teacher's existing
//! `tree-sitter`/`tree-sitter-rust` dependency pair); every other language
//! goes through [`crate::ast::quickscan`] directly. A grammar-init or parse
//! failure here degrades to quick-scan rather than propagating an error.

use crate::types::{CodeElement, ElementKind, FileStructure, Language};
use std::sync::OnceLock;
use tree_sitter::{Node, Parser};

fn rust_language() -> tree_sitter::Language {
    tree_sitter_rust::language()
}

fn parser() -> Option<Parser> {
    static INIT_FAILED: OnceLock<bool> = OnceLock::new();
    if *INIT_FAILED.get_or_init(|| false) {
        return None;
    }
    let mut parser = Parser::new();
    parser.set_language(&rust_language()).ok()?;
    Some(parser)
}

/// Parse `text` as Rust source. Returns `None` on grammar init failure or a
/// parse timeout/cancellation, signalling the caller to fall back to
/// `quickscan::quick_scan`.
#[must_use]
pub fn parse_rust(text: &str) -> Option<FileStructure> {
    let mut parser = parser()?;
    let tree = parser.parse(text, None)?;
    let root = tree.root_node();

    let total_lines = text.lines().count().max(1) as u32;
    let mut structure = FileStructure {
        language: Some(Language::Rust),
        total_lines,
        parse_degraded: false,
        ..Default::default()
    };

    let mut cursor = root.walk();
    walk(root, text, &mut cursor, &mut structure, None);
    Some(structure)
}

fn walk(
    node: Node,
    source: &str,
    cursor: &mut tree_sitter::TreeCursor,
    structure: &mut FileStructure,
    parent: Option<&str>,
) {
    for child in node.children(cursor) {
        match child.kind() {
            "function_item" => {
                if let Some(el) = function_element(child, source, parent) {
                    if parent.is_some() {
                        structure.functions.push(el);
                    } else {
                        structure.functions.push(el);
                    }
                }
            }
            "struct_item" | "enum_item" | "union_item" => {
                if let Some(el) = named_element(child, source, ElementKind::Class, "name") {
                    structure.classes.push(el);
                }
            }
            "trait_item" => {
                if let Some(el) = named_element(child, source, ElementKind::Interface, "name") {
                    structure.interfaces.push(el);
                }
            }
            "type_item" => {
                if let Some(el) = named_element(child, source, ElementKind::Type, "name") {
                    structure.types.push(el);
                }
            }
            "const_item" | "static_item" => {
                if let Some(el) = named_element(child, source, ElementKind::Variable, "name") {
                    structure.variables.push(el);
                }
            }
            "use_declaration" => {
                let text = child.utf8_text(source.as_bytes()).unwrap_or("").to_string();
                let mut el = CodeElement::new(
                    ElementKind::Import,
                    text.trim_end_matches(';').to_string(),
                    child.start_position().row as u32 + 1,
                );
                el.end_line = child.end_position().row as u32 + 1;
                structure.imports.push(el);
            }
            "impl_item" => {
                let impl_name = impl_type_name(child, source);
                let mut impl_cursor = child.walk();
                walk(child, source, &mut impl_cursor, structure, impl_name.as_deref());
            }
            "mod_item" => {
                let mut mod_cursor = child.walk();
                walk(child, source, &mut mod_cursor, structure, parent);
            }
            _ => {}
        }
    }
}

fn impl_type_name(node: Node, source: &str) -> Option<String> {
    let type_node = node.child_by_field_name("type")?;
    type_node.utf8_text(source.as_bytes()).ok().map(|s| {
        s.split('<')
            .next()
            .unwrap_or(s)
            .trim()
            .to_string()
    })
}

fn function_element(node: Node, source: &str, parent: Option<&str>) -> Option<CodeElement> {
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(source.as_bytes()).ok()?.to_string();
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let is_pub = has_pub_modifier(node, source);
    let is_async = node_text(node, source).starts_with("pub async fn")
        || node_text(node, source).starts_with("async fn")
        || node_text(node, source).contains(" async fn ");

    let mut element = CodeElement::new(
        if parent.is_some() {
            ElementKind::Method
        } else {
            ElementKind::Function
        },
        name,
        start_line,
    );
    element.end_line = end_line;
    element.is_exported = is_pub;
    element.is_async = is_async;
    element.parent = parent.map(str::to_string);
    element.signature = Some(signature_line(node, source));
    element.documentation = leading_doc_comment(node, source);
    Some(element)
}

fn named_element(
    node: Node,
    source: &str,
    kind: ElementKind,
    field: &str,
) -> Option<CodeElement> {
    let name_node = node.child_by_field_name(field)?;
    let name = name_node.utf8_text(source.as_bytes()).ok()?.to_string();
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let mut element = CodeElement::new(kind, name, start_line);
    element.end_line = end_line;
    element.is_exported = has_pub_modifier(node, source);
    element.signature = Some(signature_line(node, source));
    element.documentation = leading_doc_comment(node, source);
    Some(element)
}

fn has_pub_modifier(node: Node, source: &str) -> bool {
    node_text(node, source).trim_start().starts_with("pub")
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn signature_line(node: Node, source: &str) -> String {
    node_text(node, source)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Leading `///` or `/** */` comment block immediately above this node, if any.
fn leading_doc_comment(node: Node, source: &str) -> Option<String> {
    let mut sibling = node.prev_sibling()?;
    let mut lines = Vec::new();
    loop {
        if sibling.kind() != "line_comment" && sibling.kind() != "block_comment" {
            break;
        }
        let text = node_text(sibling, source).trim();
        if !text.starts_with("///") && !text.starts_with("/**") {
            break;
        }
        lines.push(text.trim_start_matches('/').trim_start_matches('*').trim().to_string());
        match sibling.prev_sibling() {
            Some(s) => sibling = s,
            None => break,
        }
    }
    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_and_struct() {
        let source = "pub struct Foo {\n    bar: i32,\n}\n\n/// Adds one.\npub fn add_one(x: i32) -> i32 {\n    x + 1\n}\n";
        let fs = parse_rust(source).expect("grammar should init");
        assert_eq!(fs.classes.len(), 1);
        assert_eq!(fs.classes[0].name, "Foo");
        assert_eq!(fs.functions.len(), 1);
        assert_eq!(fs.functions[0].name, "add_one");
        assert!(fs.functions[0].is_exported);
        assert_eq!(fs.functions[0].documentation.as_deref(), Some("Adds one."));
    }

    #[test]
    fn methods_attach_to_impl_type() {
        let source = "struct Counter { n: i32 }\n\nimpl Counter {\n    pub fn increment(&mut self) {\n        self.n += 1;\n    }\n}\n";
        let fs = parse_rust(source).expect("grammar should init");
        let method = fs.functions.iter().find(|f| f.name == "increment").unwrap();
        assert_eq!(method.parent.as_deref(), Some("Counter"));
    }

    #[test]
    fn private_function_not_exported() {
        let source = "fn helper() -> i32 { 0 }\n";
        let fs = parse_rust(source).unwrap();
        assert!(!fs.functions[0].is_exported);
    }

    #[test]
    fn empty_source_parses_cleanly() {
        let fs = parse_rust("").unwrap();
        assert!(fs.functions.is_empty());
        assert!(!fs.parse_degraded);
    }
}
