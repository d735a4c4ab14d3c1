//! Persisted State Store
//!
//! Durable storage for the workflow state document at
//! `manuscript/.draftd/state.json`. Writes are atomic full-document
//! replacements: content goes to a temp file in the same directory, then is
//! renamed over the live document, so a crash mid-write never exposes a
//! partial state to readers.

use crate::models::WorkflowState;
use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Subdirectory of the manuscript dir holding draftd-owned files
pub const STATE_DIR: &str = ".draftd";

/// State document filename within [`STATE_DIR`]
pub const STATE_FILE: &str = "state.json";

/// Reads and writes the state document for one manuscript directory
pub struct StateStore {
    manuscript_dir: PathBuf,
}

impl StateStore {
    pub fn new(manuscript_dir: impl Into<PathBuf>) -> Self {
        Self {
            manuscript_dir: manuscript_dir.into(),
        }
    }

    pub fn manuscript_dir(&self) -> &Path {
        &self.manuscript_dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.manuscript_dir.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load the state document, or `None` if the project has no state yet.
    ///
    /// A present-but-unparsable document is a structural error, not a missing
    /// one: it is surfaced rather than silently replaced.
    pub fn read(&self) -> Result<Option<WorkflowState>> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let state: WorkflowState = serde_json::from_str(&content)
            .with_context(|| format!("Malformed state document: {}", path.display()))?;
        Ok(Some(state))
    }

    /// Persist the full document atomically.
    ///
    /// `last_updated` is stamped here and clamped so it never moves backwards,
    /// even if the system clock does.
    pub fn write(&self, state: &mut WorkflowState) -> Result<()> {
        let now = Utc::now();
        if now > state.last_updated {
            state.last_updated = now;
        }

        let state_dir = self.manuscript_dir.join(STATE_DIR);
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create {}", state_dir.display()))?;

        let content =
            serde_json::to_string_pretty(state).context("Failed to serialize state document")?;

        // Temp file lives in the same directory so the rename stays on one
        // filesystem and is atomic.
        let mut tmp = NamedTempFile::new_in(&state_dir)
            .context("Failed to create temp file for state write")?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write state document")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to flush state document")?;
        tmp.persist(self.state_path())
            .context("Failed to replace state document")?;

        Ok(())
    }

    /// Create the default state if none exists; otherwise return the existing
    /// one untouched. Idempotent.
    pub fn initialize(
        &self,
        project_name: &str,
        target_journal: Option<&str>,
    ) -> Result<WorkflowState> {
        if let Some(existing) = self.read()? {
            return Ok(existing);
        }

        let mut state =
            WorkflowState::new(project_name, target_journal.map(|j| j.to_string()));
        self.write(&mut state)?;
        Ok(state)
    }
}

// =============================================================================
// Tests
// =============================================================================
