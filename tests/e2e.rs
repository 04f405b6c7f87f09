//! End-to-end scenarios (spec §8), exercised against the crate's public
//! API rather than any single module's unit tests.

use ctxopt_core::ast::{self, ExtractOptions};
use ctxopt_core::dedup::{self, GroupOptions};
use ctxopt_core::diff;
use ctxopt_core::sandbox::{self, SandboxOptions};
use ctxopt_core::sandbox::sdk::SdkContext;
use ctxopt_core::semantic;
use ctxopt_core::types::{Blob, ElementKind, Language};
use ctxopt_core::error::CoreError;

#[test]
fn ast_extract_go_method_returns_body_and_parent() {
    let source = "type User struct {\n\tName string\n}\n\nfunc (u *User) Greet() string {\n\treturn \"hi \" + u.Name\n}\n";
    let result = ast::extract(
        &Blob::new(source),
        Language::Go,
        ElementKind::Method,
        "Greet",
        ExtractOptions::default(),
    )
    .expect("Greet method should be found");

    assert!(result.content.starts_with("func (u *User) Greet() string {"));
    assert_eq!(result.elements[0].parent.as_deref(), Some("User"));
}

#[test]
fn diff_summary_strategy_emits_one_line_per_file_and_totals() {
    let input = "diff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -1,4 +1,10 @@\n+1\n+2\n+3\n+4\n+5\n+6\n+7\n+8\n+9\n+10\n-1\n-2\n-3\n-4\n\
diff --git a/b.rs b/b.rs\n--- a/b.rs\n+++ b/b.rs\n@@ -1,0 +1,2 @@\n+1\n+2\n\
diff --git a/c.rs b/c.rs\n--- a/c.rs\n+++ b/c.rs\n@@ -1,3 +1,0 @@\n-1\n-2\n-3\n";

    let parsed = diff::parse(input);
    let summary = diff::compress_summary(&parsed);
    let lines: Vec<&str> = summary.lines().collect();

    assert_eq!(lines.len(), 4, "3 file lines + 1 totals line, got:\n{summary}");
    assert!(lines[0].starts_with("M a.rs (+10/-4)"));
    assert!(lines[1].starts_with("M b.rs (+2/-0)"));
    assert!(lines[2].starts_with("M c.rs (+0/-3)"));
    assert_eq!(lines[3], "Total: 3 files, +12/-7");
}

#[test]
fn semantic_compression_keeps_preserved_paragraph_in_order() {
    let mut paragraphs: Vec<String> = (0..20)
        .map(|i| format!("paragraph number {i} discusses routine background filler content words"))
        .collect();
    paragraphs[6] = "paragraph seven reports an OUTAGE affecting the primary region".to_string();
    let text = paragraphs.join("\n\n");

    let pattern = regex::Regex::new("OUTAGE").unwrap();
    let result = semantic::compress(&text, Some(0.3), std::slice::from_ref(&pattern));

    assert!(result.content.contains("OUTAGE"));

    let positions: Vec<usize> = paragraphs
        .iter()
        .filter_map(|p| result.content.find(p.as_str()))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "selected paragraphs out of order");
}

#[test]
fn dedup_collapses_a_thousand_varying_ips_into_one_group() {
    let lines: Vec<String> = (0..1000)
        .map(|i| format!("Error: connection refused at 10.0.0.{}:443", i % 256))
        .collect();

    let result = dedup::group(&lines, &GroupOptions::default());

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].occurrences, 1000);
    assert!(result.groups[0].signature.contains("<N>"));
}

#[test]
fn sandbox_blocks_snippet_naming_the_offending_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let err = sandbox::run("process.exit(1)", dir.path(), &SandboxOptions::default())
        .expect_err("blocked snippet must not run");

    match err {
        CoreError::SandboxBlocked(message) => assert!(message.contains("process.")),
        other => panic!("expected SandboxBlocked, got {other:?}"),
    }
    assert!(dir.path().read_dir().unwrap().next().is_none(), "no side effect expected");
}

#[test]
fn files_read_traversal_is_denied_regardless_of_filesystem_contents() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = SdkContext::new(dir.path());
    let err = ctx
        .call("files", "read", &serde_json::json!(["../../etc/passwd"]))
        .expect_err("path escaping working_dir must be denied");

    assert!(matches!(err, CoreError::PathDenied(_)));
}
