//! Isolated Checkpoint History
//!
//! Snapshots manuscript artifacts into a version history that lives inside
//! the manuscript directory and can never write into draftd's own repository.

pub mod history;
pub mod manager;

use std::path::PathBuf;

pub use history::{GitHistory, MemoryHistory, VersionHistory};
pub use manager::{CheckpointManager, CheckpointStatus};

/// Errors from checkpoint operations. Safety violations are fatal for the
/// operation that tripped them and are never silently bypassed.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error(
        "Refusing to checkpoint {dir}: it contains {marker}, which belongs to draftd's own \
         source tree.\nPoint draftd at a manuscript directory instead"
    )]
    UnsafeTarget { dir: PathBuf, marker: String },

    #[error(
        "Refusing to commit: this history's origin remote ({url}) is draftd's own repository.\n\
         Remove the remote from the manuscript history and retry"
    )]
    UnsafeRemote { url: String },

    #[error("No checkpoint history at {0}. Run `draftd checkpoint init` first")]
    NotInitialized(PathBuf),

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
