//! The format-plugin seam.
//!
//! Content-level diffing for specific file formats (markdown, JSON, …)
//! lives outside this engine. A plugin declares the paths it understands
//! via a glob pattern and reports entity mutations through
//! [`FormatPlugin::detect_changes`]. Dispatch is ordered iteration over
//! the registry — no reflection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use strata_model::DetectedChange;

use crate::glob::{GlobError, GlobPattern};

/// One side of a file write as handed to plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub path: String,
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Input to one `detect_changes` invocation.
///
/// `before = None` means the file is new; `after = None` means it was
/// removed. Presence requirements are validated before dispatch.
#[derive(Debug, Clone)]
pub struct DetectionInput {
    pub before: Option<FileRecord>,
    pub after: Option<FileRecord>,
}

/// A detection failure reported by a plugin.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PluginError(pub String);

/// A registered file-format plugin.
///
/// `can_detect_changes` is the capability probe: a plugin whose glob
/// matches but which cannot detect is a fatal configuration error, not a
/// skippable one. Implementations that need time limits are wrapped by a
/// decorating plugin that enforces them and reports overruns as
/// [`PluginError`]s.
pub trait FormatPlugin: Send + Sync {
    /// Stable key identifying this plugin; recorded on every change it
    /// produces.
    fn key(&self) -> &str;

    /// Glob pattern selecting the paths this plugin handles.
    fn detect_changes_glob(&self) -> &str;

    /// Whether this plugin implements change detection.
    fn can_detect_changes(&self) -> bool {
        true
    }

    /// Diff `before` against `after` and report entity-level mutations.
    fn detect_changes(&self, input: &DetectionInput) -> Result<Vec<DetectedChange>, PluginError>;
}

struct RegisteredPlugin {
    plugin: Arc<dyn FormatPlugin>,
    glob: GlobPattern,
}

/// Ordered plugin registry.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, compiling its glob. Registration order is
    /// dispatch order.
    pub fn register(&mut self, plugin: Arc<dyn FormatPlugin>) -> Result<(), GlobError> {
        let glob = GlobPattern::compile(plugin.detect_changes_glob())?;
        self.plugins.push(RegisteredPlugin { plugin, glob });
        Ok(())
    }

    /// Plugins whose glob matches `path`, in registration order.
    pub fn matching(&self, path: &str) -> impl Iterator<Item = &Arc<dyn FormatPlugin>> {
        self.plugins
            .iter()
            .filter(move |registered| registered.glob.matches(path))
            .map(|registered| &registered.plugin)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
