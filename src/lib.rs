// Draftd - Evidence-backed manuscript workflow orchestrator
// Tracks stage/section progress, checkpoints artifacts into an isolated
// history, and keeps every citation traceable to verifiable evidence.

pub mod checkpoint;
pub mod citations;
pub mod cli;
pub mod config;
pub mod evidence;
pub mod models;
pub mod state;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use checkpoint::{CheckpointError, CheckpointManager};
pub use citations::{CitationAuditor, CitationError};
pub use evidence::{EvidenceTable, ImportResult, MergeStats};
pub use models::{EvidenceEntry, StageName, StageStatus, WorkflowState};
pub use state::{StateError, StateStore, WorkflowManager};
