//! Line-oriented regex/prefix-stripping symbol extraction (C4's fallback
//! path). Used directly for every language except Rust, and as the
//! degrade-to path when a full grammar parse fails.
//!
//! The extraction rules are a closed set of prefix-stripping heuristics per
//! language, the same trick a one-shot project symbol scan uses: cheap,
//! zero-dependency-on-a-grammar, good enough to locate a definition line.

use crate::types::{CodeElement, ElementKind, FileStructure, Language};

/// Run a one-line-at-a-time quick scan over `text`. Never fails; on a
/// language with no recognizer, returns a `FileStructure` with only
/// `total_lines` populated.
#[must_use]
pub fn quick_scan(text: &str, language: Language) -> FileStructure {
    let total_lines = text.lines().count() as u32;
    let mut structure = FileStructure {
        language: Some(language),
        total_lines: total_lines.max(1),
        parse_degraded: true,
        ..Default::default()
    };

    let mut pending_parent: Option<(String, u32)> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(found) = extract_from_line(trimmed, language) else {
            continue;
        };

        let mut element = CodeElement::new(found.kind, found.name.clone(), line_no);
        element.is_exported = found.is_exported;
        element.is_async = found.is_async;
        element.signature = Some(trimmed.to_string());

        match found.kind {
            ElementKind::Class | ElementKind::Interface => {
                pending_parent = Some((found.name.clone(), line_no));
                push(&mut structure, element);
            }
            ElementKind::Method => {
                element.parent = found.parent.clone().or_else(|| {
                    pending_parent.as_ref().map(|(parent, _)| parent.clone())
                });
                push(&mut structure, element);
            }
            _ => push(&mut structure, element),
        }
    }

    structure
}

fn push(structure: &mut FileStructure, element: CodeElement) {
    match element.kind {
        ElementKind::Function => structure.functions.push(element),
        ElementKind::Method => structure.functions.push(element),
        ElementKind::Class => structure.classes.push(element),
        ElementKind::Interface => structure.interfaces.push(element),
        ElementKind::Type => structure.types.push(element),
        ElementKind::Variable => structure.variables.push(element),
        ElementKind::Import => structure.imports.push(element),
        ElementKind::Export => structure.exports.push(element),
    }
}

struct Found {
    kind: ElementKind,
    name: String,
    is_exported: bool,
    is_async: bool,
    parent: Option<String>,
}

fn extract_from_line(line: &str, language: Language) -> Option<Found> {
    match language {
        Language::Rust => extract_rust(line),
        Language::TypeScript | Language::JavaScript => extract_ts(line),
        Language::Python => extract_python(line),
        Language::Go => extract_go(line),
        Language::C | Language::Cpp => extract_c(line),
        _ => None,
    }
}

fn extract_rust(line: &str) -> Option<Found> {
    let is_pub = line.starts_with("pub ") || line.starts_with("pub(");

    if let Some(rest) = strip_prefix_variants(
        line,
        &[
            "pub async fn ",
            "pub(crate) async fn ",
            "async fn ",
            "pub fn ",
            "pub(crate) fn ",
            "fn ",
        ],
    ) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Function,
            name,
            is_exported: is_pub,
            is_async: line.contains("async fn"),
            parent: None,
        });
    }
    if let Some(rest) =
        strip_prefix_variants(line, &["pub struct ", "pub(crate) struct ", "struct "])
    {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Class,
            name,
            is_exported: is_pub,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["pub enum ", "pub(crate) enum ", "enum "]) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Class,
            name,
            is_exported: is_pub,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["pub trait ", "pub(crate) trait ", "trait "])
    {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Interface,
            name,
            is_exported: is_pub,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = line.strip_prefix("impl") {
        let rest = rest.trim_start();
        let rest = if rest.starts_with('<') {
            match rest.find('>') {
                Some(i) => rest[i + 1..].trim(),
                None => return None,
            }
        } else {
            rest
        };
        let name = if rest.contains(" for ") {
            rest.split(" for ").nth(1).and_then(ident_at_start)?
        } else {
            ident_at_start(rest)?
        };
        return Some(Found {
            kind: ElementKind::Class,
            name,
            is_exported: true,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["pub const ", "const "]) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Variable,
            name,
            is_exported: is_pub,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["pub use ", "use "]) {
        let name = rest.trim_end_matches(';').to_string();
        return Some(Found {
            kind: ElementKind::Import,
            name,
            is_exported: false,
            is_async: false,
            parent: None,
        });
    }
    None
}

fn extract_ts(line: &str) -> Option<Found> {
    let is_exported = line.starts_with("export ");

    if let Some(rest) = strip_prefix_variants(
        line,
        &[
            "export default async function ",
            "export default function ",
            "export async function ",
            "export function ",
            "async function ",
            "function ",
        ],
    ) {
        let name = ident_at_start(rest).unwrap_or_else(|| "default".to_string());
        return Some(Found {
            kind: ElementKind::Function,
            name,
            is_exported,
            is_async: line.contains("async function"),
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(
        line,
        &["export abstract class ", "export class ", "abstract class ", "class "],
    ) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Class,
            name,
            is_exported,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["export interface ", "interface "]) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Interface,
            name,
            is_exported,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["export type "]) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Type,
            name,
            is_exported: true,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["import "]) {
        return Some(Found {
            kind: ElementKind::Import,
            name: rest.trim_end_matches(';').to_string(),
            is_exported: false,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["export const ", "export let ", "const ", "let "]) {
        let name = ident_at_start(rest)?;
        if line.contains("=>") || line.contains("= async") || line.contains("= function") {
            return Some(Found {
                kind: ElementKind::Function,
                name,
                is_exported,
                is_async: line.contains("= async") || line.contains("async ("),
                parent: None,
            });
        }
    }
    None
}

fn extract_python(line: &str) -> Option<Found> {
    if let Some(rest) = strip_prefix_variants(line, &["async def ", "def "]) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Function,
            name: name.clone(),
            is_exported: !name.starts_with('_'),
            is_async: line.starts_with("async def "),
            parent: None,
        });
    }
    if let Some(rest) = line.strip_prefix("class ") {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Class,
            is_exported: !name.starts_with('_'),
            name,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["import ", "from "]) {
        return Some(Found {
            kind: ElementKind::Import,
            name: rest.to_string(),
            is_exported: false,
            is_async: false,
            parent: None,
        });
    }
    None
}

fn extract_go(line: &str) -> Option<Found> {
    if let Some(rest) = line.strip_prefix("func ") {
        if rest.starts_with('(') {
            let close = rest.find(')')?;
            let receiver_clause = &rest[1..close];
            let after_paren = close.checked_add(2)?;
            let name = ident_at_start(rest.get(after_paren..)?)?;
            let is_exported = name.chars().next().is_some_and(char::is_uppercase);
            return Some(Found {
                kind: ElementKind::Method,
                is_exported,
                name,
                is_async: false,
                parent: parse_go_receiver(receiver_clause),
            });
        }
        let name = ident_at_start(rest)?;
        let is_exported = name.chars().next().is_some_and(char::is_uppercase);
        return Some(Found {
            kind: ElementKind::Function,
            name,
            is_exported,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = strip_prefix_variants(line, &["type "]) {
        let name = ident_at_start(rest)?;
        let is_exported = name.chars().next().is_some_and(char::is_uppercase);
        return Some(Found {
            kind: ElementKind::Class,
            name,
            is_exported,
            is_async: false,
            parent: None,
        });
    }
    if let Some(rest) = line.strip_prefix("import ") {
        return Some(Found {
            kind: ElementKind::Import,
            name: rest.trim().to_string(),
            is_exported: false,
            is_async: false,
            parent: None,
        });
    }
    None
}

/// Pull the receiver's type name out of a Go method's `(recv *Type)` or
/// `(recv Type)` clause (the text between the parens), stripping the
/// pointer marker and any generic type parameters.
fn parse_go_receiver(receiver_clause: &str) -> Option<String> {
    let last = receiver_clause.split_whitespace().last()?;
    let ty = last.trim_start_matches('*');
    let ty = ty.split(['[', '(']).next().unwrap_or(ty);
    (!ty.is_empty()).then(|| ty.to_string())
}

fn extract_c(line: &str) -> Option<Found> {
    if let Some(rest) = strip_prefix_variants(line, &["struct ", "typedef struct "]) {
        let name = ident_at_start(rest)?;
        return Some(Found {
            kind: ElementKind::Class,
            name,
            is_exported: true,
            is_async: false,
            parent: None,
        });
    }
    if line.starts_with("#include") {
        return Some(Found {
            kind: ElementKind::Import,
            name: line.trim_start_matches("#include").trim().to_string(),
            is_exported: false,
            is_async: false,
            parent: None,
        });
    }
    if line.contains('(') && !line.starts_with("//") {
        if let Some(paren_pos) = line.find('(') {
            let before = line[..paren_pos].trim();
            let name = before.split_whitespace().last()?.trim_start_matches('*').to_string();
            if is_ident(&name) {
                return Some(Found {
                    kind: ElementKind::Function,
                    name,
                    is_exported: !line.starts_with("static "),
                    is_async: false,
                    parent: None,
                });
            }
        }
    }
    None
}

fn strip_prefix_variants<'a>(s: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    for prefix in prefixes {
        if let Some(rest) = s.strip_prefix(prefix) {
            return Some(rest);
        }
    }
    None
}

fn ident_at_start(s: &str) -> Option<String> {
    let s = s.trim();
    let end = s
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let name = &s[..end];
    if is_ident(name) {
        Some(name.to_string())
    } else {
        None
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .next()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_functions_and_structs() {
        let text = "pub fn validate_token() {}\npub struct AuthError {}\nfn internal() {}\n";
        let fs = quick_scan(text, Language::Rust);
        assert_eq!(fs.functions.len(), 2);
        assert_eq!(fs.classes.len(), 1);
        assert!(fs.functions[0].is_exported);
        assert!(!fs.functions[1].is_exported);
    }

    #[test]
    fn rust_method_attaches_to_preceding_impl() {
        let text = "impl AuthService {\n    pub fn check(&self) {}\n}\n";
        let fs = quick_scan(text, Language::Rust);
        assert_eq!(fs.classes.len(), 1);
        assert_eq!(fs.classes[0].name, "AuthService");
    }

    #[test]
    fn typescript_exported_function() {
        let text = "export async function fetchData() {}\n";
        let fs = quick_scan(text, Language::TypeScript);
        assert_eq!(fs.functions.len(), 1);
        assert!(fs.functions[0].is_exported);
        assert!(fs.functions[0].is_async);
    }

    #[test]
    fn python_private_function_not_exported() {
        let text = "def _helper():\n    pass\n";
        let fs = quick_scan(text, Language::Python);
        assert_eq!(fs.functions.len(), 1);
        assert!(!fs.functions[0].is_exported);
    }

    #[test]
    fn go_exported_by_uppercase() {
        let text = "func DoThing() {}\nfunc doOther() {}\n";
        let fs = quick_scan(text, Language::Go);
        assert!(fs.functions[0].is_exported);
        assert!(!fs.functions[1].is_exported);
    }

    #[test]
    fn go_method_with_receiver() {
        let text = "func (s *Server) Handle(req Request) {}\n";
        let fs = quick_scan(text, Language::Go);
        assert_eq!(fs.functions.len(), 1);
        assert_eq!(fs.functions[0].name, "Handle");
        assert_eq!(fs.functions[0].parent.as_deref(), Some("Server"));
    }

    #[test]
    fn go_method_parent_comes_from_its_own_receiver_not_proximity() {
        let text = "type Server struct {}\ntype Client struct {}\nfunc (c *Client) Dial() {}\n";
        let fs = quick_scan(text, Language::Go);
        assert_eq!(fs.functions.len(), 1);
        assert_eq!(fs.functions[0].parent.as_deref(), Some("Client"));
    }

    #[test]
    fn go_method_with_value_receiver_and_no_name() {
        let text = "func (*Widget) Reset() {}\n";
        let fs = quick_scan(text, Language::Go);
        assert_eq!(fs.functions[0].parent.as_deref(), Some("Widget"));
    }

    #[test]
    fn empty_blob_has_one_total_line() {
        let fs = quick_scan("", Language::Rust);
        assert_eq!(fs.total_lines, 1);
        assert!(fs.functions.is_empty());
    }

    #[test]
    fn unsupported_language_yields_empty_structure() {
        let fs = quick_scan("fn main() {}", Language::Swift);
        assert!(fs.functions.is_empty());
        assert!(fs.parse_degraded);
    }

    #[test]
    fn ident_at_start_stops_at_punctuation() {
        assert_eq!(ident_at_start("foo(bar)"), Some("foo".to_string()));
        assert_eq!(ident_at_start("MyStruct {"), Some("MyStruct".to_string()));
        assert_eq!(ident_at_start("(not_ident"), None);
        assert_eq!(ident_at_start(""), None);
    }
}
