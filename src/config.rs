//! Core configuration (§1 ambient stack): sandbox resource ceilings, log
//! detail defaults, TF-IDF stopword overrides, hybrid fusion weights, and
//! allow-listed working directories. Loaded from `<home>/.ctxopt/config.toml`
//! if present, merged over built-in defaults; the core never writes it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxLimits {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: usize,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            memory_limit_mb: default_memory_limit_mb(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl SandboxLimits {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.min(self.max_timeout_secs))
    }

    #[must_use]
    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb * 1024 * 1024
    }
}

fn default_timeout_secs() -> u64 {
    5
}
fn default_max_timeout_secs() -> u64 {
    30
}
fn default_memory_limit_mb() -> usize {
    128
}
fn default_max_output_tokens() -> u32 {
    4000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefaultLogDetail {
    Minimal,
    Normal,
    Verbose,
}

impl Default for DefaultLogDetail {
    fn default() -> Self {
        Self::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridWeights {
    #[serde(default = "default_bm25_weight")]
    pub bm25_weight: f32,
    #[serde(default = "default_embedding_weight")]
    pub embedding_weight: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            bm25_weight: default_bm25_weight(),
            embedding_weight: default_embedding_weight(),
        }
    }
}

fn default_bm25_weight() -> f32 {
    0.4
}
fn default_embedding_weight() -> f32 {
    0.6
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub sandbox: SandboxLimits,
    #[serde(default)]
    pub default_log_detail: DefaultLogDetail,
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
    #[serde(default)]
    pub hybrid: HybridWeights,
    #[serde(default)]
    pub allowed_working_dirs: Vec<PathBuf>,
}

impl CoreConfig {
    /// Merge `<home>/.ctxopt/config.toml` (if present and parseable) over
    /// built-in defaults. Never writes the file.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
            Self::default()
        })
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ctxopt").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_sandbox_limits() {
        let config = CoreConfig::default();
        assert_eq!(config.sandbox.timeout_secs, 5);
        assert_eq!(config.sandbox.max_timeout_secs, 30);
    }

    #[test]
    fn sandbox_timeout_is_clamped_to_max() {
        let limits = SandboxLimits {
            timeout_secs: 999,
            ..SandboxLimits::default()
        };
        assert_eq!(limits.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn hybrid_weights_sum_to_one_by_default() {
        let weights = HybridWeights::default();
        assert!((weights.bm25_weight + weights.embedding_weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let parsed: CoreConfig = toml::from_str("default_log_detail = \"verbose\"").unwrap();
        assert_eq!(parsed.default_log_detail, DefaultLogDetail::Verbose);
        assert_eq!(parsed.sandbox.timeout_secs, 5);
    }
}
