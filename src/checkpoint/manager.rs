//! Checkpoint Manager
//!
//! Creates and queries an isolated version history scoped to the manuscript
//! directory. Two gates keep the history from ever touching draftd's own
//! repository: a marker check on the target directory and a denylist check on
//! the history's `origin` remote. Both are fatal for the operation that
//! tripped them; callers treat checkpoint failure as logged-but-non-blocking
//! for workflow progress.

use super::history::{GitHistory, VersionHistory};
use super::CheckpointError;
use std::collections::BTreeMap;
use std::path::Path;

/// Files that identify draftd's own source tree. A manuscript directory must
/// never contain these.
const TOOL_TREE_MARKERS: &[&str] = &[
    "src/checkpoint/manager.rs",
    "src/citations/mod.rs",
    ".claude/skills/draftd.md",
];

/// Remote URL fragments belonging to draftd's canonical repository.
const TOOL_REMOTE_PATTERNS: &[&str] = &["draftd.git", "github.com/draftd-dev/draftd"];

/// Default ignore list written on first initialization: generated binary and
/// cache artifacts that have no place in the manuscript history.
const DEFAULT_IGNORE: &str = "\
# Rendered outputs
*.pdf
*.docx
*.pptx

# draftd caches
.draftd/cache/
.draftd/tmp/

# OS files
.DS_Store
Thumbs.db

# Editor files
*.swp
*.swo
*~
.vscode/
.idea/
";

/// Warn-only pre-commit guard for unusually large files. It prints to stderr
/// and always exits zero so automation is never blocked.
const LARGE_FILE_HOOK: &str = "\
#!/bin/sh
# draftd manuscript history guard
large=$(git diff --cached --name-only | while IFS= read -r f; do
    if [ -f \"$f\" ] && [ \"$(wc -c < \"$f\")\" -gt 10485760 ]; then
        echo \"$f\"
    fi
done)
if [ -n \"$large\" ]; then
    echo \"warning: unusually large files staged:\" >&2
    echo \"$large\" >&2
    echo \"consider adding them to .gitignore\" >&2
fi
exit 0
";

/// Result of `status`: whether the working tree has drifted from the last
/// checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStatus {
    pub has_uncommitted_changes: bool,
}

/// Safety-gated snapshots of the manuscript directory.
pub struct CheckpointManager {
    history: Box<dyn VersionHistory>,
}

impl CheckpointManager {
    /// Manager backed by the real git history.
    pub fn new() -> Self {
        Self {
            history: Box::new(GitHistory),
        }
    }

    /// Manager over any history backend (used by tests).
    pub fn with_history(history: Box<dyn VersionHistory>) -> Self {
        Self { history }
    }

    fn check_target(&self, dir: &Path) -> Result<(), CheckpointError> {
        for marker in TOOL_TREE_MARKERS {
            if dir.join(marker).exists() {
                return Err(CheckpointError::UnsafeTarget {
                    dir: dir.to_path_buf(),
                    marker: marker.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_remote(&self, dir: &Path) -> Result<(), CheckpointError> {
        if let Some(url) = self.history.remote_url(dir)? {
            let lowered = url.to_lowercase();
            for pattern in TOOL_REMOTE_PATTERNS {
                if lowered.contains(pattern) {
                    return Err(CheckpointError::UnsafeRemote { url });
                }
            }
        }
        Ok(())
    }

    /// Create the isolated history at `dir` if none exists.
    ///
    /// Fails with `UnsafeTarget` if `dir` looks like draftd's own source
    /// tree. Idempotent: an existing history is left alone, but its remote is
    /// still re-validated. Returns whether a new history was created.
    pub fn initialize_history(&self, dir: &Path) -> Result<bool, CheckpointError> {
        self.check_target(dir)?;

        if self.history.exists(dir) {
            self.check_remote(dir)?;
            return Ok(false);
        }

        self.history.init(dir)?;
        std::fs::write(dir.join(".gitignore"), DEFAULT_IGNORE)?;
        self.install_large_file_hook(dir)?;

        self.commit_checked(
            dir,
            &[".gitignore".to_string()],
            "initialization",
            "Initialize manuscript history",
            &BTreeMap::new(),
        )?;
        Ok(true)
    }

    fn install_large_file_hook(&self, dir: &Path) -> Result<(), CheckpointError> {
        let hooks_dir = dir.join(".git").join("hooks");
        if !hooks_dir.exists() {
            // Non-filesystem backends have no hook surface
            return Ok(());
        }
        let hook_path = hooks_dir.join("pre-commit");
        std::fs::write(&hook_path, LARGE_FILE_HOOK)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }

    fn commit_checked(
        &self,
        dir: &Path,
        files: &[String],
        stage: &str,
        description: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, CheckpointError> {
        self.check_remote(dir)?;

        let mut message = format!("[draftd] Complete {stage}: {description}\n\nStage: {stage}\n");
        for (key, value) in metadata {
            message.push_str(&format!("{key}: {value}\n"));
        }
        message.push_str(&format!("Timestamp: {}\n", chrono::Utc::now().to_rfc3339()));

        self.history.commit_files(dir, files, &message)
    }

    /// Snapshot the named files into the history.
    ///
    /// Re-validates the target and remote before committing; stages exactly
    /// `files`, never a wildcard. Returns the new checkpoint id.
    pub fn checkpoint(
        &self,
        dir: &Path,
        files: &[String],
        stage: &str,
        description: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, CheckpointError> {
        self.check_target(dir)?;
        if !self.history.exists(dir) {
            return Err(CheckpointError::NotInitialized(dir.to_path_buf()));
        }
        self.commit_checked(dir, files, stage, description, metadata)
    }

    /// Latest checkpoint id, or `None` before the first snapshot.
    pub fn current(&self, dir: &Path) -> Result<Option<String>, CheckpointError> {
        if !self.history.exists(dir) {
            return Ok(None);
        }
        self.history.current_id(dir)
    }

    pub fn status(&self, dir: &Path) -> Result<CheckpointStatus, CheckpointError> {
        Ok(CheckpointStatus {
            has_uncommitted_changes: self.history.has_uncommitted_changes(dir)?,
        })
    }
}

impl Default for CheckpointManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::history::MemoryHistory;
    use tempfile::TempDir;

    fn memory_manager() -> CheckpointManager {
        CheckpointManager::with_history(Box::new(MemoryHistory::new()))
    }

    #[test]
    fn test_initialize_rejects_tool_tree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("draftd-src");
        std::fs::create_dir_all(dir.join("src/checkpoint")).unwrap();
        std::fs::write(dir.join("src/checkpoint/manager.rs"), "// code").unwrap();

        let manager = memory_manager();
        let err = manager.initialize_history(&dir).unwrap_err();
        assert!(matches!(err, CheckpointError::UnsafeTarget { .. }));
    }

    #[test]
    fn test_checkpoint_rejects_tool_tree_without_committing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");
        std::fs::create_dir_all(&dir).unwrap();

        let history = MemoryHistory::new();
        history.init(&dir).unwrap();
        let manager = CheckpointManager::with_history(Box::new(history));

        // The marker appears after initialization
        std::fs::create_dir_all(dir.join("src/citations")).unwrap();
        std::fs::write(dir.join("src/citations/mod.rs"), "// code").unwrap();

        let err = manager
            .checkpoint(&dir, &["a.md".to_string()], "drafting", "snapshot", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, CheckpointError::UnsafeTarget { .. }));

        // No commit was created
        assert!(manager.current(&dir).unwrap().is_none());
    }

    #[test]
    fn test_checkpoint_rejects_tool_remote() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");
        std::fs::create_dir_all(&dir).unwrap();

        let history = MemoryHistory::new();
        history.init(&dir).unwrap();
        history.set_remote(&dir, "git@github.com:draftd-dev/draftd.git");
        let manager = CheckpointManager::with_history(Box::new(history));

        let err = manager
            .checkpoint(&dir, &["a.md".to_string()], "drafting", "snapshot", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, CheckpointError::UnsafeRemote { .. }));
    }

    #[test]
    fn test_initialize_idempotent_but_still_checks_remote() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");
        std::fs::create_dir_all(&dir).unwrap();

        let manager = memory_manager();
        assert!(manager.initialize_history(&dir).unwrap());
        assert!(!manager.initialize_history(&dir).unwrap());
    }

    #[test]
    fn test_reinitialize_with_bad_remote_fails() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");
        std::fs::create_dir_all(&dir).unwrap();

        let history = MemoryHistory::new();
        history.init(&dir).unwrap();
        history.set_remote(&dir, "https://github.com/someone/draftd.git");
        let manager = CheckpointManager::with_history(Box::new(history));

        let err = manager.initialize_history(&dir).unwrap_err();
        assert!(matches!(err, CheckpointError::UnsafeRemote { .. }));
    }

    #[test]
    fn test_commit_message_structure() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");
        std::fs::create_dir_all(&dir).unwrap();

        let history = MemoryHistory::new();
        history.init(&dir).unwrap();
        let manager = CheckpointManager::with_history(Box::new(history));

        let mut metadata = BTreeMap::new();
        metadata.insert("Papers".to_string(), "12".to_string());
        let id = manager
            .checkpoint(
                &dir,
                &["literature.md".to_string()],
                "research",
                "Literature review complete",
                &metadata,
            )
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(manager.current(&dir).unwrap(), Some(id));
    }

    #[test]
    fn test_initialize_real_history_writes_ignore_and_hook() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");

        let manager = CheckpointManager::new();
        assert!(manager.initialize_history(&dir).unwrap());

        let ignore = std::fs::read_to_string(dir.join(".gitignore")).unwrap();
        assert!(ignore.contains("*.pdf"));
        assert!(ignore.contains(".draftd/cache/"));
        assert!(dir.join(".git/hooks/pre-commit").exists());

        // The .gitignore was committed during initialization
        assert!(manager.current(&dir).unwrap().is_some());
        assert!(!manager.status(&dir).unwrap().has_uncommitted_changes);
    }

    #[test]
    fn test_status_reflects_working_tree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("manuscript");

        let manager = CheckpointManager::new();
        manager.initialize_history(&dir).unwrap();

        std::fs::write(dir.join("abstract.md"), "New abstract\n").unwrap();
        assert!(manager.status(&dir).unwrap().has_uncommitted_changes);

        manager
            .checkpoint(
                &dir,
                &["abstract.md".to_string()],
                "drafting",
                "Abstract drafted",
                &BTreeMap::new(),
            )
            .unwrap();
        assert!(!manager.status(&dir).unwrap().has_uncommitted_changes);
    }
}
