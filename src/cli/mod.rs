//! CLI command implementations.
//!
//! Each subcommand is a `run(...)` that resolves the project context, calls
//! into the core subsystems, and prints. Fatal errors bubble up to `main`
//! which prints them and exits non-zero; advisory warnings are printed here
//! and never change the exit status.

pub mod archive;
pub mod assemble;
pub mod checkpoint;
pub mod cite;
pub mod critique;
pub mod evidence;
pub mod init;
pub mod section;
pub mod stage;
pub mod status;

use crate::checkpoint::{CheckpointError, CheckpointManager};
use crate::citations::audit::AUDIT_LOG_FILE;
use crate::config::DraftdConfig;
use crate::state::store::STATE_DIR;
use crate::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved invocation context shared by every subcommand
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: DraftdConfig,
    pub manuscript_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve from `--dir` or the current directory.
    pub fn resolve(dir: Option<&Path>) -> Result<Self> {
        let root = match dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let config = DraftdConfig::load(&root)?;
        let manuscript_dir = config.manuscript_path(&root);
        Ok(Self {
            root,
            config,
            manuscript_dir,
        })
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.manuscript_dir.join(STATE_DIR).join(AUDIT_LOG_FILE)
    }
}

/// Attempt a checkpoint of `files`, treating failure as non-blocking.
///
/// Safety violations propagate (they are never silently bypassed); anything
/// else — no git, no history yet, transient errors — prints a warning and
/// yields `None`, so the workflow update that triggered the checkpoint still
/// goes through.
pub(crate) fn try_checkpoint(
    ctx: &ProjectContext,
    files: &[String],
    stage: &str,
    description: &str,
    metadata: &BTreeMap<String, String>,
) -> Result<Option<String>> {
    if !ctx.config.enable_checkpoints || files.is_empty() {
        return Ok(None);
    }

    let manager = CheckpointManager::new();
    let attempt = manager
        .initialize_history(&ctx.manuscript_dir)
        .and_then(|_| manager.checkpoint(&ctx.manuscript_dir, files, stage, description, metadata));

    match attempt {
        Ok(id) => {
            println!("{}", format!("✓ Checkpoint {}", &id[..7.min(id.len())]).green());
            Ok(Some(id))
        }
        Err(e @ CheckpointError::UnsafeTarget { .. })
        | Err(e @ CheckpointError::UnsafeRemote { .. }) => Err(e.into()),
        Err(e) => {
            eprintln!(
                "{}",
                format!("⚠ Checkpoint skipped ({e}); workflow state was still updated").yellow()
            );
            Ok(None)
        }
    }
}

/// Status symbol used across the status and list displays
pub(crate) fn status_symbol(status: crate::models::StageStatus) -> &'static str {
    match status {
        crate::models::StageStatus::Completed => "✓",
        crate::models::StageStatus::InProgress => "⚠",
        crate::models::StageStatus::NotStarted => "○",
        crate::models::StageStatus::Failed => "✗",
    }
}
