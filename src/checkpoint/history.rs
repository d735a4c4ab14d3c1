//! Version-history backends.
//!
//! The checkpoint manager talks to a narrow `VersionHistory` interface so the
//! safety gates and commit semantics stay testable against `MemoryHistory`
//! without a real repository on disk.

use super::CheckpointError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The operations the checkpoint layer needs from a version history.
pub trait VersionHistory {
    /// Whether a history already exists at `dir`.
    fn exists(&self, dir: &Path) -> bool;

    /// Create an empty history rooted at `dir`.
    fn init(&self, dir: &Path) -> Result<(), CheckpointError>;

    /// Stage exactly the named files (paths relative to `dir`) and commit.
    /// Returns the new commit's identifier.
    fn commit_files(
        &self,
        dir: &Path,
        files: &[String],
        message: &str,
    ) -> Result<String, CheckpointError>;

    /// Identifier of the latest commit, if any.
    fn current_id(&self, dir: &Path) -> Result<Option<String>, CheckpointError>;

    /// The `origin` remote URL, if one is configured.
    fn remote_url(&self, dir: &Path) -> Result<Option<String>, CheckpointError>;

    fn has_uncommitted_changes(&self, dir: &Path) -> Result<bool, CheckpointError>;
}

// =============================================================================
// Git Backend
// =============================================================================

/// `VersionHistory` backed by libgit2.
pub struct GitHistory;

impl GitHistory {
    fn open(&self, dir: &Path) -> Result<git2::Repository, CheckpointError> {
        // Open the exact directory, never a discovered parent: discovery could
        // silently land in an enclosing host repository.
        git2::Repository::open(dir)
            .map_err(|_| CheckpointError::NotInitialized(dir.to_path_buf()))
    }

    fn signature(repo: &git2::Repository) -> Result<git2::Signature<'static>, git2::Error> {
        repo.signature()
            .or_else(|_| git2::Signature::now("draftd", "draftd@localhost"))
    }
}

impl VersionHistory for GitHistory {
    fn exists(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    fn init(&self, dir: &Path) -> Result<(), CheckpointError> {
        std::fs::create_dir_all(dir)?;
        git2::Repository::init(dir)?;
        Ok(())
    }

    fn commit_files(
        &self,
        dir: &Path,
        files: &[String],
        message: &str,
    ) -> Result<String, CheckpointError> {
        let repo = self.open(dir)?;
        let mut index = repo.index()?;
        for file in files {
            index.add_path(Path::new(file))?;
        }
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let signature = Self::signature(&repo)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    fn current_id(&self, dir: &Path) -> Result<Option<String>, CheckpointError> {
        if !self.exists(dir) {
            return Ok(None);
        }
        let repo = self.open(dir)?;
        let result = match repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(_) => Ok(None),
        };
        result
    }

    fn remote_url(&self, dir: &Path) -> Result<Option<String>, CheckpointError> {
        let repo = self.open(dir)?;
        let result = match repo.find_remote("origin") {
            Ok(remote) => Ok(remote.url().map(|u| u.to_string())),
            Err(_) => Ok(None),
        };
        result
    }

    fn has_uncommitted_changes(&self, dir: &Path) -> Result<bool, CheckpointError> {
        let repo = self.open(dir)?;
        let mut options = git2::StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        let statuses = repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }
}

// =============================================================================
// In-Memory Backend
// =============================================================================

#[derive(Default)]
struct MemoryRepo {
    commits: Vec<(String, String, Vec<String>)>,
    remote: Option<String>,
    dirty: bool,
}

/// In-memory `VersionHistory` for tests: commits are recorded, never written
/// to disk, and commit ids are content hashes of the message and file list.
#[derive(Default)]
pub struct MemoryHistory {
    repos: Mutex<HashMap<PathBuf, MemoryRepo>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure an `origin` remote for an existing or future history.
    pub fn set_remote(&self, dir: &Path, url: &str) {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(dir.to_path_buf()).or_default().remote = Some(url.to_string());
    }

    pub fn set_dirty(&self, dir: &Path, dirty: bool) {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(dir.to_path_buf()).or_default().dirty = dirty;
    }

    pub fn commit_count(&self, dir: &Path) -> usize {
        let repos = self.repos.lock().unwrap();
        repos.get(dir).map(|r| r.commits.len()).unwrap_or(0)
    }

    pub fn last_message(&self, dir: &Path) -> Option<String> {
        let repos = self.repos.lock().unwrap();
        repos
            .get(dir)
            .and_then(|r| r.commits.last())
            .map(|(_, message, _)| message.clone())
    }

}

impl VersionHistory for MemoryHistory {
    fn exists(&self, dir: &Path) -> bool {
        self.repos.lock().unwrap().contains_key(dir)
    }

    fn init(&self, dir: &Path) -> Result<(), CheckpointError> {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(dir.to_path_buf()).or_default();
        Ok(())
    }

    fn commit_files(
        &self,
        dir: &Path,
        files: &[String],
        message: &str,
    ) -> Result<String, CheckpointError> {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos
            .get_mut(dir)
            .ok_or_else(|| CheckpointError::NotInitialized(dir.to_path_buf()))?;

        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        for file in files {
            hasher.update(file.as_bytes());
        }
        hasher.update(repo.commits.len().to_le_bytes());
        let id = format!("{:x}", hasher.finalize());

        repo.commits
            .push((id.clone(), message.to_string(), files.to_vec()));
        repo.dirty = false;
        Ok(id)
    }

    fn current_id(&self, dir: &Path) -> Result<Option<String>, CheckpointError> {
        let repos = self.repos.lock().unwrap();
        Ok(repos
            .get(dir)
            .and_then(|r| r.commits.last())
            .map(|(id, _, _)| id.clone()))
    }

    fn remote_url(&self, dir: &Path) -> Result<Option<String>, CheckpointError> {
        let repos = self.repos.lock().unwrap();
        Ok(repos.get(dir).and_then(|r| r.remote.clone()))
    }

    fn has_uncommitted_changes(&self, dir: &Path) -> Result<bool, CheckpointError> {
        let repos = self.repos.lock().unwrap();
        Ok(repos.get(dir).map(|r| r.dirty).unwrap_or(false))
    }
}

// =============================================================================
// Tests
// =============================================================================
