//! Module system configuration.

use serde::{Deserialize, Serialize};

/// Module system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Directory containing module shared libraries.
    #[serde(default = "default_module_directory")]
    pub directory: String,
    /// Whether to automatically load modules on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Regular expression matched against candidate module names; matching
    /// candidates are skipped with an informational log, not loaded.
    #[serde(default)]
    pub blacklist: Option<String>,
    /// When `true`, a file-hook failure mid-pass retracts the file records
    /// that pass already appended to target packages. When `false`, partial
    /// additions remain visible after the failed pass.
    #[serde(default)]
    pub rollback_file_additions: bool,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            directory: default_module_directory(),
            auto_load: default_true(),
            blacklist: None,
            rollback_file_additions: false,
        }
    }
}

fn default_module_directory() -> String {
    "./modules".to_string()
}

fn default_true() -> bool {
    true
}
