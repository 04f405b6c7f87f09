//! Minimal glob matching (`*`, `**`, `?`) used by the sandbox SDK's
//! `files.glob`/`search.files` and by tree walks that need a filter.
//!
//! Deliberately small: this crate's globs only ever need to select source
//! files under a working directory, not full POSIX glob semantics.

use regex::Regex;

/// Compile a glob pattern (relative, forward-slash separated) into a regex
/// anchored to match the whole path.
#[must_use]
pub fn compile(pattern: &str) -> Regex {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

/// Recursively walk `root` (relative paths, forward slashes) and return
/// every file whose relative path matches `pattern`.
#[must_use]
pub fn glob_files(root: &std::path::Path, pattern: &str) -> Vec<String> {
    let regex = compile(pattern);
    let mut out = Vec::new();
    walk(root, root, &regex, &mut out);
    out.sort();
    out
}

fn walk(root: &std::path::Path, dir: &std::path::Path, regex: &Regex, out: &mut Vec<String>) {
    const IGNORED: &[&str] = &[
        "target", "node_modules", ".git", "dist", "build", "__pycache__", ".venv", "venv",
    ];
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || IGNORED.contains(&name_str.as_ref()) {
            continue;
        }
        if path.is_dir() {
            walk(root, &path, regex, out);
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            if regex.is_match(&rel) {
                out.push(rel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_within_segment() {
        let re = compile("*.rs");
        assert!(re.is_match("foo.rs"));
        assert!(!re.is_match("src/foo.rs"));
    }

    #[test]
    fn double_star_matches_across_segments() {
        let re = compile("src/**/*.rs");
        assert!(re.is_match("src/a/b/foo.rs"));
        assert!(re.is_match("src/foo.rs"));
    }

    #[test]
    fn glob_files_finds_matching_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("README.md"), "# hi").unwrap();
        let matches = glob_files(dir.path(), "**/*.rs");
        assert_eq!(matches, vec!["src/main.rs".to_string()]);
    }
}
