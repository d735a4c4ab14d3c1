pub mod evidence;
pub mod state;

pub use evidence::{
    AuditLogEntry, CitationType, Disposition, EvidenceEntry, Freshness, ValidationStatus,
    ValidationSummary,
};
pub use state::{
    CritiqueIteration, CritiqueRecord, DraftingRecord, InputFile, ProjectMetadata, Provenance,
    RunRecord, SectionRecord, StageCore, StageName, StageStatus, VerificationRun, WorkflowState,
    WorkflowStatus, DEFAULT_SECTIONS,
};
