//! Project configuration.
//!
//! An optional `draftd.yaml` at the project root; every field has a default
//! so a missing file configures nothing away from the conventions.

use crate::models::DEFAULT_SECTIONS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration filename at the project root
pub const CONFIG_FILE: &str = "draftd.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftdConfig {
    /// Manuscript directory relative to the project root
    #[serde(default = "default_manuscript_dir")]
    pub manuscript_dir: String,

    /// Whether stage completions create checkpoints
    #[serde(default = "default_true")]
    pub enable_checkpoints: bool,

    /// Timeout for identifier resolution calls, in seconds
    #[serde(default = "default_resolver_timeout")]
    pub resolver_timeout_secs: u64,

    /// Sections a new project starts with
    #[serde(default = "default_sections")]
    pub default_sections: Vec<String>,
}

fn default_manuscript_dir() -> String {
    "manuscript".to_string()
}

fn default_true() -> bool {
    true
}

fn default_resolver_timeout() -> u64 {
    crate::evidence::resolver::DEFAULT_TIMEOUT_SECS
}

fn default_sections() -> Vec<String> {
    DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()
}

impl Default for DraftdConfig {
    fn default() -> Self {
        Self {
            manuscript_dir: default_manuscript_dir(),
            enable_checkpoints: true,
            resolver_timeout_secs: default_resolver_timeout(),
            default_sections: default_sections(),
        }
    }
}

impl DraftdConfig {
    /// Load the project configuration, falling back to defaults when the file
    /// is absent. A present-but-malformed file is an error.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Malformed configuration: {}", path.display()))
    }

    /// Absolute manuscript directory for a project root.
    pub fn manuscript_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.manuscript_dir)
    }

    pub fn resolver_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resolver_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
