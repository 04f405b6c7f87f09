//! Content-based language sniffing (C3), used when a blob has no path hint
//! or the path's extension is ambiguous/missing.

use crate::types::{Blob, Language};

/// Detect a language from `blob.path_hint`'s extension first, falling back
/// to a content sniff when there's no path or the extension is unknown.
#[must_use]
pub fn detect(blob: &Blob) -> Language {
    if let Some(path) = &blob.path_hint {
        let from_ext = Language::from_path(path);
        if from_ext != Language::Generic {
            return from_ext;
        }
    }
    from_content(&blob.text)
}

/// Sniff a language purely from content, ignoring any path hint.
#[must_use]
pub fn from_content(text: &str) -> Language {
    let first_line = text.lines().next().unwrap_or("");
    if let Some(lang) = from_shebang(first_line) {
        return lang;
    }

    if text.contains("package main") && text.contains("func ") {
        return Language::Go;
    }
    if (text.contains("fn ") && (text.contains("let mut") || text.contains("impl ")))
        || text.contains("use std::")
    {
        return Language::Rust;
    }
    if (text.contains("def ") || text.contains("import "))
        && !text.contains(';')
        && (text.contains(":\n") || text.contains("self"))
    {
        return Language::Python;
    }
    if text.contains("interface ") && text.contains(": ") && text.contains("=>") {
        return Language::TypeScript;
    }
    if text.contains("function ") || text.contains("=>") || text.contains("const ") {
        return Language::JavaScript;
    }

    Language::Generic
}

fn from_shebang(first_line: &str) -> Option<Language> {
    let rest = first_line.strip_prefix("#!")?;
    if rest.contains("python") {
        Some(Language::Python)
    } else if rest.contains("node") {
        Some(Language::JavaScript)
    } else if rest.contains("ruby") {
        Some(Language::Ruby)
    } else if rest.contains("php") {
        Some(Language::Php)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_go_by_content() {
        let text = "package main\n\nfunc main() {}\n";
        assert_eq!(from_content(text), Language::Go);
    }

    #[test]
    fn detects_rust_by_content() {
        let text = "fn main() {\n    let mut x = 1;\n}\n";
        assert_eq!(from_content(text), Language::Rust);
    }

    #[test]
    fn shebang_wins_for_python() {
        let text = "#!/usr/bin/env python3\nprint('hi')\n";
        assert_eq!(from_content(text), Language::Python);
    }

    #[test]
    fn path_extension_preferred_over_content() {
        let blob = Blob::with_path("package main\nfunc main(){}", "main.go");
        assert_eq!(detect(&blob), Language::Go);
    }

    #[test]
    fn falls_back_to_content_when_no_extension_match() {
        let blob = Blob::with_path("package main\nfunc main(){}", "Makefile");
        assert_eq!(detect(&blob), Language::Go);
    }
}
