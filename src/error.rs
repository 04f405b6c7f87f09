//! Error types for the compression engine.
//!
//! One enum per the eight kinds the dispatch boundary needs to distinguish.
//! Every fallible operation in this crate returns `Result<T, CoreError>`;
//! conversion to a tool-facing `is_error` result happens once, at the
//! registry boundary (`registry::Registry::dispatch`).

use std::path::PathBuf;

/// Errors produced anywhere in the compression engine.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Arguments failed schema validation before a tool ran.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested language/content type has no dedicated implementation.
    ///
    /// Never fatal on its own — callers degrade to a generic handler and
    /// attach a note to the result's metadata instead of propagating this.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Full AST parse failed or no grammar is available; quick-scan was used.
    #[error("parse degraded: {0}")]
    ParseDegraded(String),

    /// The sandbox's static analyzer rejected a snippet before execution.
    #[error("sandbox blocked: {0}")]
    SandboxBlocked(String),

    /// A path argument resolved outside the allowed working directory, or
    /// named a file on the secret-file blocklist.
    #[error("path denied: {0}")]
    PathDenied(PathBuf),

    /// A resource ceiling (timeout, memory, output size) was hit.
    #[error("resource exceeded: {0}")]
    ResourceExceeded(String),

    /// A named element (symbol, function, memory slot) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A subprocess or external capability (git, embedder) failed.
    #[error("external failure: {0}")]
    ExternalFailure(String),
}

impl CoreError {
    /// Short machine-readable tag, used in tool-result metadata and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unsupported(_) => "unsupported",
            Self::ParseDegraded(_) => "parse_degraded",
            Self::SandboxBlocked(_) => "sandbox_blocked",
            Self::PathDenied(_) => "path_denied",
            Self::ResourceExceeded(_) => "resource_exceeded",
            Self::NotFound(_) => "not_found",
            Self::ExternalFailure(_) => "external_failure",
        }
    }

    /// Whether this error represents a hard stop (sandbox/path violations
    /// never get a partial result; everything else might).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SandboxBlocked(_) | Self::PathDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
