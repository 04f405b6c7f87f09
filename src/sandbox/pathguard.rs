//! Path validator (C11, stage 2): every file argument the SDK receives is
//! resolved against a `working_dir` and checked against a secret-file
//! blocklist before any filesystem access happens.

use crate::error::CoreError;
use std::path::{Path, PathBuf};

const SECRET_BASENAME_PATTERNS: &[&str] = &[
    ".env",
    ".pem",
    ".key",
    "id_rsa",
    "id_ed25519",
    "credentials",
    "secrets",
    ".keystore",
    ".jks",
    "password",
    ".htpasswd",
    ".netrc",
    ".npmrc",
    ".pypirc",
];

pub struct PathGuard {
    working_dir: PathBuf,
}

impl PathGuard {
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Resolve `requested` against the working directory, rejecting any
    /// path that escapes it (lexically or, for a symlink, by its real
    /// target) or names a secret file.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, CoreError> {
        if requested.contains("..") {
            return Err(CoreError::PathDenied(PathBuf::from(requested)));
        }
        let candidate = self.working_dir.join(requested);
        let resolved = normalize(&candidate);
        if !resolved.starts_with(normalize(&self.working_dir)) {
            return Err(CoreError::PathDenied(resolved));
        }
        if is_secret_basename(&resolved) {
            return Err(CoreError::PathDenied(resolved));
        }

        let root_real = self
            .working_dir
            .canonicalize()
            .map_err(|_| CoreError::PathDenied(self.working_dir.clone()))?;
        let target_real = canonicalize_existing_prefix(&resolved)
            .map_err(|_| CoreError::PathDenied(resolved.clone()))?;
        if !target_real.starts_with(&root_real) {
            return Err(CoreError::PathDenied(target_real));
        }

        Ok(resolved)
    }

    /// Validate a glob pattern: no traversal, no absolute paths.
    pub fn validate_glob(&self, pattern: &str) -> Result<(), CoreError> {
        if pattern.contains("..") || Path::new(pattern).is_absolute() {
            return Err(CoreError::PathDenied(PathBuf::from(pattern)));
        }
        Ok(())
    }
}

fn is_secret_basename(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    SECRET_BASENAME_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// Lexical normalization (no filesystem access, so this works for paths
/// that don't exist yet): resolves `.` and collapses repeated separators.
/// `..` is rejected before this is called, so it is not handled here.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor of `path` (resolving any
/// symlinks along the way) and reattach the non-existent tail, if any,
/// literally. A path that exists all the way down is fully canonicalized,
/// including its final component, so a symlinked leaf is dereferenced.
fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    while !existing.exists() {
        let Some(name) = existing.file_name().map(std::ffi::OsStr::to_os_string) else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no existing ancestor",
            ));
        };
        tail.push(name);
        if !existing.pop() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no existing ancestor",
            ));
        }
    }
    let mut real = existing.canonicalize()?;
    for component in tail.into_iter().rev() {
        real.push(component);
    }
    Ok(real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_path_within_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        let guard = PathGuard::new(dir.path());
        let resolved = guard.resolve("src/main.rs").unwrap();
        assert_eq!(resolved, dir.path().join("src/main.rs"));
    }

    #[test]
    fn resolves_not_yet_existing_path_within_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path());
        let resolved = guard.resolve("notes/new-file.md").unwrap();
        assert_eq!(resolved, dir.path().join("notes/new-file.md"));
    }

    #[test]
    fn rejects_traversal_outside_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path());
        assert!(guard.resolve("../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_secret_file_basenames() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path());
        assert!(guard.resolve(".env").is_err());
        assert!(guard.resolve("config/id_rsa").is_err());
        assert!(guard.resolve("secrets.yaml").is_err());
    }

    #[test]
    fn rejects_absolute_glob() {
        let guard = PathGuard::new("/workspace/project");
        assert!(guard.validate_glob("/etc/**").is_err());
    }

    #[test]
    fn allows_normal_glob() {
        let guard = PathGuard::new("/workspace/project");
        assert!(guard.validate_glob("src/**/*.rs").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escaping_working_dir() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            root.path().join("escape.txt"),
        )
        .unwrap();

        let guard = PathGuard::new(root.path());
        assert!(guard.resolve("escape.txt").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn allows_symlink_pointing_back_inside_working_dir() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("real")).unwrap();
        fs::write(root.path().join("real/data.txt"), "fine").unwrap();
        std::os::unix::fs::symlink(root.path().join("real/data.txt"), root.path().join("alias.txt"))
            .unwrap();

        let guard = PathGuard::new(root.path());
        assert!(guard.resolve("alias.txt").is_ok());
    }
}
