//! The tool catalog: every SDK operation wired into a [`ToolDyn`] and
//! mounted on a [`ToolRegistry`] by [`build_default_registry`].

pub mod code_tools;
pub mod compress_tools;
pub mod conversation_tools;
pub mod discover_tool;
pub mod sandbox_tool;
pub mod search;
pub mod search_tools;

use crate::registry::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Build and populate the registry this binary serves: one entry per SDK
/// operation category, plus `discover` and `sandbox_execute`.
#[must_use]
pub fn build_default_registry(working_dir: PathBuf) -> Arc<ToolRegistry> {
    let registry = Arc::new(ToolRegistry::new());

    registry.register(Arc::new(compress_tools::AutoCompressTool));
    registry.register(Arc::new(compress_tools::LogCompressTool));
    registry.register(Arc::new(compress_tools::DiffCompressTool));
    registry.register(Arc::new(compress_tools::SemanticCompressTool));

    registry.register(Arc::new(code_tools::ParseTool));
    registry.register(Arc::new(code_tools::SkeletonTool));
    registry.register(Arc::new(code_tools::ExtractTool));

    registry.register(Arc::new(search_tools::RipgrepSearchTool));
    registry.register(Arc::new(search_tools::SdkSearchTool {
        working_dir: working_dir.clone(),
    }));

    registry.register(Arc::new(conversation_tools::ConversationCompressTool));
    registry.register(Arc::new(conversation_tools::CreateMemoryTool));
    registry.register(Arc::new(conversation_tools::GetMemoryTool));
    registry.register(Arc::new(conversation_tools::ClearMemoryTool));

    registry.register(Arc::new(sandbox_tool::SandboxExecuteTool {
        working_dir: working_dir.clone(),
    }));

    registry.register(Arc::new(discover_tool::DiscoverTool {
        registry: Arc::downgrade(&registry),
    }));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_registry_dispatches_compress_auto() {
        let registry = build_default_registry(std::env::temp_dir());
        let result = registry.dispatch("compress_auto", json!({"content": "hello world, this is plain text"}));
        assert!(!result.is_error);
    }

    #[test]
    fn default_registry_exposes_discover() {
        let registry = build_default_registry(std::env::temp_dir());
        let result = registry.dispatch("discover", json!({"format": "list"}));
        assert!(!result.is_error);
        assert!(result.content[0].contains("compress_auto"));
    }
}
