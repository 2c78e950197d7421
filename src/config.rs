use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "heritage-graph.toml";

/// Default bound on re-export alias chains.
pub const DEFAULT_MAX_ALIAS_DEPTH: usize = 16;

/// Configuration loaded from `heritage-graph.toml`.
///
/// Threaded explicitly into the orchestrator and every component that needs it.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HeritageConfig {
    /// Additional path patterns to exclude from project walks (beyond .gitignore and node_modules).
    pub exclude: Option<Vec<String>>,
    /// Worker threads for extraction and matching. `0` lets rayon pick.
    pub workers: usize,
    pub cache: CacheSettings,
    pub analysis: AnalysisSettings,
}

/// Caching toggles. `enabled` is the master switch; the others gate single stages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Per-file export / heritage extraction results.
    pub extraction: bool,
    /// Whole analyzer results, keyed by the fingerprint of every input file.
    pub results: bool,
    /// Directory the extraction cache is persisted to. `None` keeps it in memory only.
    pub dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            extraction: true,
            results: true,
            dir: None,
        }
    }
}

impl CacheSettings {
    /// All caching off: observably identical to an always-empty cache.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            extraction: false,
            results: false,
            dir: None,
        }
    }

    pub fn extraction_enabled(&self) -> bool {
        self.enabled && self.extraction
    }

    pub fn results_enabled(&self) -> bool {
        self.enabled && self.results
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_alias_depth: usize,
    pub mixin_detection: MixinDetection,
    pub duplicates: DuplicatePolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
            mixin_detection: MixinDetection::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

/// Which function shapes count as mixins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MixinDetection {
    /// The body is exactly `return class extends <param> {}` (or an arrow expression body).
    #[default]
    Strict,
    /// Statements may precede the final `return class extends <param> {}`, and the
    /// function may be wrapped in one call such as `dedupeMixin(...)`.
    Lenient,
}

/// What to do when the same `(export, project, file, identifier)` match is recorded twice.
///
/// Within one run this happens when a file declares two classes of the same name in
/// different scopes, both extending the same export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Keep,
    Dedupe,
}

impl HeritageConfig {
    /// Load configuration from `heritage-graph.toml` in the given directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        Self::load_file(&root.join(CONFIG_FILE))
    }

    /// Load configuration from an explicit file path, falling back to defaults.
    pub fn load_file(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        "failed to parse config: {err}. Using defaults."
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    "failed to read config: {err}. Using defaults."
                );
                Self::default()
            }
        }
    }
}
