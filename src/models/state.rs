//! Workflow State Types
//!
//! Defines the persisted state document structure for a manuscript project:
//! - per-stage records (repository analysis through assembly)
//! - drafting section map (open set, seeded with the six defaults)
//! - archived run records
//! - provenance (input files, verification runs)
//!
//! Stored as JSON at `manuscript/.draftd/state.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Current state document schema version
pub const STATE_VERSION: &str = "2.0";

/// Sections every new project starts with, in canonical order
pub const DEFAULT_SECTIONS: &[&str] = &[
    "abstract",
    "introduction",
    "methods",
    "results",
    "discussion",
    "availability",
];

fn default_version() -> String {
    STATE_VERSION.to_string()
}

// =============================================================================
// Stage Names & Status
// =============================================================================

/// The closed set of workflow stages, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    RepositoryAnalysis,
    Plan,
    Assessment,
    Research,
    Drafting,
    Critique,
    Assembly,
}

impl StageName {
    /// Canonical workflow ordering used by progress reporting
    pub const ORDER: [StageName; 7] = [
        StageName::RepositoryAnalysis,
        StageName::Plan,
        StageName::Assessment,
        StageName::Research,
        StageName::Drafting,
        StageName::Critique,
        StageName::Assembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::RepositoryAnalysis => "repository_analysis",
            StageName::Plan => "plan",
            StageName::Assessment => "assessment",
            StageName::Research => "research",
            StageName::Drafting => "drafting",
            StageName::Critique => "critique",
            StageName::Assembly => "assembly",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repository_analysis" => Ok(StageName::RepositoryAnalysis),
            "plan" => Ok(StageName::Plan),
            "assessment" => Ok(StageName::Assessment),
            "research" => Ok(StageName::Research),
            "drafting" => Ok(StageName::Drafting),
            "critique" => Ok(StageName::Critique),
            "assembly" => Ok(StageName::Assembly),
            other => Err(other.to_string()),
        }
    }
}

/// Status of a workflow stage or drafting section
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl StageStatus {
    /// Whether a transition from `self` to `next` is permitted.
    ///
    /// Status only moves forward along not_started → in_progress → completed.
    /// `failed` is reachable from `in_progress` and can return to
    /// `in_progress` on retry. `completed` is terminal. Identical-status
    /// updates are idempotent.
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        use StageStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Completed, _) => false,
            (NotStarted, InProgress) | (NotStarted, Completed) => true,
            (InProgress, Completed) | (InProgress, Failed) => true,
            (Failed, InProgress) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::NotStarted => "not_started",
            StageStatus::InProgress => "in_progress",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(StageStatus::NotStarted),
            "in_progress" => Ok(StageStatus::InProgress),
            "completed" => Ok(StageStatus::Completed),
            "failed" => Ok(StageStatus::Failed),
            other => Err(other.to_string()),
        }
    }
}

// =============================================================================
// Stage Records
// =============================================================================

/// Fields common to every stage record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StageCore {
    #[serde(default)]
    pub status: StageStatus,

    /// Primary artifact produced by the stage (relative to manuscript dir)
    #[serde(default)]
    pub artifact: Option<String>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Checkpoint id recorded when the stage completed
    #[serde(default)]
    pub checkpoint: Option<String>,
}

/// Research stage record with evidence-gathering counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResearchRecord {
    #[serde(flatten)]
    pub core: StageCore,

    #[serde(default)]
    pub papers_found: u32,

    /// Entries imported from a prior run's evidence table
    #[serde(default)]
    pub papers_from_previous: u32,

    #[serde(default)]
    pub papers_new: u32,

    /// Prior-run directory the evidence was imported from
    #[serde(default)]
    pub source_run: Option<String>,
}

/// One drafting section (abstract, methods, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SectionRecord {
    #[serde(default)]
    pub status: StageStatus,

    #[serde(default)]
    pub artifact: Option<String>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Drafting stage record owning the open section map
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftingRecord {
    #[serde(flatten)]
    pub core: StageCore,

    #[serde(default)]
    pub sections: BTreeMap<String, SectionRecord>,

    #[serde(default)]
    pub completed_sections: u32,

    #[serde(default)]
    pub total_sections: u32,
}

impl Default for DraftingRecord {
    fn default() -> Self {
        let sections: BTreeMap<String, SectionRecord> = DEFAULT_SECTIONS
            .iter()
            .map(|name| (name.to_string(), SectionRecord::default()))
            .collect();
        let total = sections.len() as u32;
        Self {
            core: StageCore::default(),
            sections,
            completed_sections: 0,
            total_sections: total,
        }
    }
}

/// One critique pass over the manuscript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CritiqueIteration {
    pub version: u32,

    #[serde(default)]
    pub artifact: Option<String>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Reviewer recommendation, e.g. "ACCEPT" or "MAJOR REVISION"
    pub recommendation: String,

    #[serde(default)]
    pub major_issues: u32,

    #[serde(default)]
    pub minor_issues: u32,
}

/// Critique stage record with its iteration history
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CritiqueRecord {
    #[serde(flatten)]
    pub core: StageCore,

    #[serde(default)]
    pub iterations: Vec<CritiqueIteration>,
}

impl CritiqueRecord {
    pub fn latest(&self) -> Option<&CritiqueIteration> {
        self.iterations.last()
    }
}

/// Assembly stage record with compilation counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssemblyRecord {
    #[serde(flatten)]
    pub core: StageCore,

    #[serde(default)]
    pub sections_included: u32,

    #[serde(default)]
    pub sections_missing: u32,

    #[serde(default)]
    pub total_word_count: u32,
}

/// All stage records, one typed field per stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStatus {
    #[serde(default)]
    pub repository_analysis: StageCore,

    #[serde(default)]
    pub plan: StageCore,

    #[serde(default)]
    pub assessment: StageCore,

    #[serde(default)]
    pub research: ResearchRecord,

    #[serde(default)]
    pub drafting: DraftingRecord,

    #[serde(default)]
    pub critique: CritiqueRecord,

    #[serde(default)]
    pub assembly: AssemblyRecord,
}

impl WorkflowStatus {
    /// Common fields of a stage record, read-only
    pub fn core(&self, stage: StageName) -> &StageCore {
        match stage {
            StageName::RepositoryAnalysis => &self.repository_analysis,
            StageName::Plan => &self.plan,
            StageName::Assessment => &self.assessment,
            StageName::Research => &self.research.core,
            StageName::Drafting => &self.drafting.core,
            StageName::Critique => &self.critique.core,
            StageName::Assembly => &self.assembly.core,
        }
    }

    /// Common fields of a stage record, mutable
    pub fn core_mut(&mut self, stage: StageName) -> &mut StageCore {
        match stage {
            StageName::RepositoryAnalysis => &mut self.repository_analysis,
            StageName::Plan => &mut self.plan,
            StageName::Assessment => &mut self.assessment,
            StageName::Research => &mut self.research.core,
            StageName::Drafting => &mut self.drafting.core,
            StageName::Critique => &mut self.critique.core,
            StageName::Assembly => &mut self.assembly.core,
        }
    }

    pub fn stage_status(&self, stage: StageName) -> StageStatus {
        self.core(stage).status
    }
}

// =============================================================================
// Runs & Provenance
// =============================================================================

/// Archived snapshot of one workflow iteration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    /// Time-derived identifier, e.g. "2026-03-14_091502_plos-v2"
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub target_journal: Option<String>,

    /// Checkpoint id the run was archived at
    #[serde(default)]
    pub checkpoint: Option<String>,

    /// Archived output files, filename → path relative to manuscript dir
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// Source artifact recorded with its content hash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputFile {
    pub path: String,
    /// "sha256:<hex>" content digest
    pub checksum: String,
    pub recorded_at: DateTime<Utc>,
}

/// One validation/verification run recorded for forensics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationRun {
    pub timestamp: DateTime<Utc>,
    /// Operation performed, e.g. "evidence-validate", "cite-check"
    pub operation: String,
    #[serde(default)]
    pub file: Option<String>,
    pub result: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    #[serde(default)]
    pub input_files: Vec<InputFile>,

    #[serde(default)]
    pub verification_runs: Vec<VerificationRun>,
}

/// Rolled-up manuscript counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub total_word_count: u32,

    #[serde(default)]
    pub citations_count: u32,

    #[serde(default)]
    pub draftd_version: Option<String>,
}

// =============================================================================
// Workflow State (root document)
// =============================================================================

/// The persisted state document, one per project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowState {
    #[serde(default = "default_version")]
    pub version: String,

    pub project_name: String,

    #[serde(default)]
    pub target_journal: Option<String>,

    pub created_at: DateTime<Utc>,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub workflow_status: WorkflowStatus,

    #[serde(default)]
    pub runs: Vec<RunRecord>,

    #[serde(default)]
    pub provenance: Provenance,

    #[serde(default)]
    pub metadata: ProjectMetadata,

    /// Top-level fields this version does not know about are carried through
    /// read-modify-write cycles untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowState {
    /// Fresh state with all stages not_started and the default section set
    pub fn new(project_name: impl Into<String>, target_journal: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            version: default_version(),
            project_name: project_name.into(),
            target_journal,
            created_at: now,
            last_updated: now,
            workflow_status: WorkflowStatus::default(),
            runs: Vec::new(),
            provenance: Provenance::default(),
            metadata: ProjectMetadata {
                draftd_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                ..Default::default()
            },
            extra: serde_json::Map::new(),
        }
    }

    pub fn run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.iter().find(|r| r.run_id == run_id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_forward_only() {
        use StageStatus::*;
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(NotStarted.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(Failed.can_transition_to(InProgress));

        assert!(!Completed.can_transition_to(NotStarted));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!InProgress.can_transition_to(NotStarted));
        assert!(!NotStarted.can_transition_to(Failed));
    }

    #[test]
    fn test_transition_idempotent() {
        use StageStatus::*;
        for status in [NotStarted, InProgress, Completed, Failed] {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_stage_name_round_trip() {
        for stage in StageName::ORDER {
            assert_eq!(stage.as_str().parse::<StageName>().unwrap(), stage);
        }
        assert!("publishing".parse::<StageName>().is_err());
    }

    #[test]
    fn test_default_drafting_sections() {
        let drafting = DraftingRecord::default();
        assert_eq!(drafting.total_sections, 6);
        assert_eq!(drafting.completed_sections, 0);
        for name in DEFAULT_SECTIONS {
            assert!(drafting.sections.contains_key(*name));
        }
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let json = r#"{
            "project_name": "demo",
            "created_at": "2026-01-01T00:00:00Z",
            "last_updated": "2026-01-01T00:00:00Z",
            "custom_annotations": {"editor": "jp"}
        }"#;

        let state: WorkflowState = serde_json::from_str(json).unwrap();
        assert!(state.extra.contains_key("custom_annotations"));

        let out = serde_json::to_string(&state).unwrap();
        let round: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(round["custom_annotations"]["editor"], "jp");
    }

    #[test]
    fn test_state_serde_round_trip() {
        let state = WorkflowState::new("demo", Some("PLOS Comp Biol".to_string()));
        let json = serde_json::to_string_pretty(&state).unwrap();
        let back: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
