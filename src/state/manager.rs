//! Stage Transition Engine
//!
//! All mutation of the workflow state goes through `WorkflowManager`: load the
//! full document, apply one change, persist the full document. Stage and
//! section statuses only move forward; completion stamps a timestamp and the
//! checkpoint id the caller resolved at completion time.

use crate::models::{
    CritiqueIteration, InputFile, RunRecord, StageName, StageStatus, VerificationRun,
    WorkflowState,
};
use crate::state::progress::aggregate_drafting_status;
use crate::state::store::StateStore;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors from state mutation operations
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Unknown workflow stage: {0}")]
    UnknownStage(String),

    #[error("Invalid transition for {stage}: {from} → {to}")]
    InvalidTransition {
        stage: String,
        from: StageStatus,
        to: StageStatus,
    },

    #[error("Drafting cannot be completed directly while sections are pending: {}", pending.join(", "))]
    SectionsPending { pending: Vec<String> },

    #[error("No workflow state found. Run `draftd init` first")]
    NotInitialized,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// "sha256:<hex>" digest of file content, recorded in provenance
pub fn calculate_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

/// Read-modify-write mutations over one project's state document
pub struct WorkflowManager {
    store: StateStore,
}

impl WorkflowManager {
    pub fn new(manuscript_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: StateStore::new(manuscript_dir),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Current state, or `NotInitialized` if the project has none.
    pub fn state(&self) -> Result<WorkflowState, StateError> {
        self.store.read()?.ok_or(StateError::NotInitialized)
    }

    fn mutate<F>(&self, apply: F) -> Result<WorkflowState, StateError>
    where
        F: FnOnce(&mut WorkflowState) -> Result<(), StateError>,
    {
        let mut state = self.state()?;
        apply(&mut state)?;
        self.store.write(&mut state)?;
        Ok(state)
    }

    // =========================================================================
    // Stage Transitions
    // =========================================================================

    /// Update a stage's status.
    ///
    /// Rejects unknown stage names and backward transitions. Completing a
    /// stage stamps `completed_at` and attaches the checkpoint id the caller
    /// resolved from the checkpoint manager (checkpoint failure is the
    /// caller's concern and never blocks the state update).
    pub fn update_stage(
        &self,
        stage_name: &str,
        status: StageStatus,
        artifact: Option<String>,
        checkpoint: Option<String>,
    ) -> Result<WorkflowState, StateError> {
        let stage: StageName = stage_name
            .parse()
            .map_err(StateError::UnknownStage)?;

        self.mutate(|state| {
            if stage == StageName::Drafting && status == StageStatus::Completed {
                let pending = crate::state::progress::pending_sections(
                    &state.workflow_status.drafting,
                );
                if !pending.is_empty() {
                    return Err(StateError::SectionsPending { pending });
                }
            }

            let core = state.workflow_status.core_mut(stage);
            if !core.status.can_transition_to(status) {
                return Err(StateError::InvalidTransition {
                    stage: stage.to_string(),
                    from: core.status,
                    to: status,
                });
            }

            core.status = status;
            if let Some(artifact) = artifact {
                core.artifact = Some(artifact);
            }
            if status == StageStatus::Completed {
                core.completed_at = Some(chrono::Utc::now());
                if checkpoint.is_some() {
                    core.checkpoint = checkpoint;
                }
            }
            Ok(())
        })
    }

    /// Update one drafting section, registering it if unseen.
    ///
    /// Sections are an open set: an unknown name grows the section map and
    /// the total-section denominator. The parent drafting stage's aggregate
    /// status is recomputed after every section update.
    pub fn update_section(
        &self,
        section_name: &str,
        status: StageStatus,
        artifact: Option<String>,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let drafting = &mut state.workflow_status.drafting;
            let section = drafting
                .sections
                .entry(section_name.to_string())
                .or_default();

            if !section.status.can_transition_to(status) {
                return Err(StateError::InvalidTransition {
                    stage: format!("drafting.{section_name}"),
                    from: section.status,
                    to: status,
                });
            }

            section.status = status;
            if let Some(artifact) = artifact {
                section.artifact = Some(artifact);
            }
            if status == StageStatus::Completed {
                section.completed_at = Some(chrono::Utc::now());
            }

            drafting.total_sections = drafting.sections.len() as u32;
            drafting.completed_sections = drafting
                .sections
                .values()
                .filter(|s| s.status == StageStatus::Completed)
                .count() as u32;

            let was = drafting.core.status;
            drafting.core.status = aggregate_drafting_status(&drafting.sections);
            if drafting.core.status == StageStatus::Completed && was != StageStatus::Completed {
                drafting.core.completed_at = Some(chrono::Utc::now());
            }
            Ok(())
        })
    }

    // =========================================================================
    // Critique Iterations
    // =========================================================================

    /// Append a critique iteration with the next version number and mark the
    /// critique stage completed.
    pub fn add_critique_iteration(
        &self,
        recommendation: &str,
        artifact: Option<String>,
        major_issues: u32,
        minor_issues: u32,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let critique = &mut state.workflow_status.critique;
            let version = critique
                .iterations
                .iter()
                .map(|it| it.version)
                .max()
                .unwrap_or(0)
                + 1;

            critique.iterations.push(CritiqueIteration {
                version,
                artifact,
                completed_at: Some(chrono::Utc::now()),
                recommendation: recommendation.to_string(),
                major_issues,
                minor_issues,
            });
            critique.core.status = StageStatus::Completed;
            critique.core.completed_at = Some(chrono::Utc::now());
            Ok(())
        })
    }

    // =========================================================================
    // Research Counters
    // =========================================================================

    /// Record how many evidence entries the research stage currently holds.
    pub fn record_research_counts(
        &self,
        papers_found: u32,
        papers_new: u32,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let research = &mut state.workflow_status.research;
            research.papers_found = papers_found;
            research.papers_new = papers_new;
            Ok(())
        })
    }

    /// Record an evidence import from a prior run.
    pub fn record_import(
        &self,
        papers_from_previous: u32,
        source_run: &str,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let research = &mut state.workflow_status.research;
            research.papers_from_previous = papers_from_previous;
            research.papers_found = research.papers_from_previous + research.papers_new;
            research.source_run = Some(source_run.to_string());
            Ok(())
        })
    }

    /// Record the section and word counters from a manuscript assembly.
    pub fn record_assembly_counts(
        &self,
        sections_included: u32,
        sections_missing: u32,
        word_count: u32,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let assembly = &mut state.workflow_status.assembly;
            assembly.sections_included = sections_included;
            assembly.sections_missing = sections_missing;
            assembly.total_word_count = word_count;
            state.metadata.total_word_count = word_count;
            Ok(())
        })
    }

    // =========================================================================
    // Runs
    // =========================================================================

    /// Record the start of an archived workflow run.
    pub fn add_run(
        &self,
        run_id: &str,
        target_journal: Option<String>,
        checkpoint: Option<String>,
        outputs: BTreeMap<String, String>,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let journal = target_journal.or_else(|| state.target_journal.clone());
            state.runs.push(RunRecord {
                run_id: run_id.to_string(),
                started_at: chrono::Utc::now(),
                completed_at: None,
                target_journal: journal,
                checkpoint,
                outputs,
            });
            Ok(())
        })
    }

    /// Mark a run completed. A `RunRecord` is immutable once completed.
    pub fn complete_run(
        &self,
        run_id: &str,
        outputs: BTreeMap<String, String>,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            let run = state
                .runs
                .iter_mut()
                .find(|r| r.run_id == run_id)
                .ok_or_else(|| StateError::RunNotFound(run_id.to_string()))?;
            if run.completed_at.is_none() {
                run.completed_at = Some(chrono::Utc::now());
                run.outputs.extend(outputs);
            }
            Ok(())
        })
    }

    // =========================================================================
    // Provenance
    // =========================================================================

    /// Append a verification run to provenance.
    pub fn record_verification(
        &self,
        operation: &str,
        file: Option<String>,
        result: &str,
    ) -> Result<WorkflowState, StateError> {
        self.mutate(|state| {
            state.provenance.verification_runs.push(VerificationRun {
                timestamp: chrono::Utc::now(),
                operation: operation.to_string(),
                file,
                result: result.to_string(),
            });
            Ok(())
        })
    }

    /// Record a source artifact with its content checksum.
    pub fn record_input_file(&self, path: &Path) -> Result<WorkflowState, StateError> {
        let content = std::fs::read(path).map_err(|e| {
            StateError::Storage(anyhow::Error::new(e).context(format!(
                "Failed to read input file {}",
                path.display()
            )))
        })?;
        let checksum = calculate_checksum(&content);

        self.mutate(|state| {
            state.provenance.input_files.push(InputFile {
                path: path.display().to_string(),
                checksum,
                recorded_at: chrono::Utc::now(),
            });
            Ok(())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
