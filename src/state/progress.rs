//! Progress reporting over the workflow state.
//!
//! `next_steps` is a pure function of the state document: given the same
//! state it always returns the same recommendations, with no clock or
//! filesystem dependence.

use crate::models::{
    DraftingRecord, SectionRecord, StageName, StageStatus, WorkflowState, DEFAULT_SECTIONS,
};
use std::collections::BTreeMap;

/// Section names in presentation order: the six defaults first, then any
/// dynamically registered sections alphabetically.
pub fn canonical_section_order(sections: &BTreeMap<String, SectionRecord>) -> Vec<String> {
    let mut ordered: Vec<String> = DEFAULT_SECTIONS
        .iter()
        .filter(|name| sections.contains_key(**name))
        .map(|name| name.to_string())
        .collect();

    // BTreeMap iteration is already alphabetical
    for name in sections.keys() {
        if !DEFAULT_SECTIONS.contains(&name.as_str()) {
            ordered.push(name.clone());
        }
    }

    ordered
}

/// Sections not yet completed, in canonical order.
pub fn pending_sections(drafting: &DraftingRecord) -> Vec<String> {
    canonical_section_order(&drafting.sections)
        .into_iter()
        .filter(|name| {
            drafting
                .sections
                .get(name)
                .map(|s| s.status != StageStatus::Completed)
                .unwrap_or(false)
        })
        .collect()
}

/// Aggregate status of the drafting stage derived from its sections.
///
/// Completed iff every registered section is completed (vacuously true for an
/// empty section set); in progress as soon as any section has moved.
pub fn aggregate_drafting_status(sections: &BTreeMap<String, SectionRecord>) -> StageStatus {
    if sections
        .values()
        .all(|s| s.status == StageStatus::Completed)
    {
        return StageStatus::Completed;
    }
    if sections
        .values()
        .any(|s| s.status != StageStatus::NotStarted)
    {
        return StageStatus::InProgress;
    }
    StageStatus::NotStarted
}

fn stage_recommendation(stage: StageName) -> &'static str {
    match stage {
        StageName::RepositoryAnalysis => "Analyze the repository and record the analysis artifact",
        StageName::Plan => "Create the manuscript outline",
        StageName::Assessment => "Assess journal fit and record the assessment",
        StageName::Research => "Gather literature evidence into the evidence table",
        StageName::Drafting => "Start drafting the manuscript sections",
        StageName::Critique => "Run a critique pass over the completed sections",
        StageName::Assembly => "Assemble the full manuscript",
    }
}

/// Derive the ordered list of recommended next steps.
///
/// Walks the canonical stage order and recommends the first stage that is not
/// completed; pending drafting sections and an outstanding critique revision
/// are always reported on top of that.
pub fn next_steps(state: &WorkflowState) -> Vec<String> {
    let mut steps = Vec::new();
    let status = &state.workflow_status;
    let pending = pending_sections(&status.drafting);

    for stage in StageName::ORDER {
        if status.stage_status(stage) == StageStatus::Completed {
            continue;
        }
        // The drafting recommendation is the pending-section list added below
        if stage != StageName::Drafting || pending.is_empty() {
            steps.push(stage_recommendation(stage).to_string());
        }
        break;
    }

    if !pending.is_empty() {
        steps.push(format!("Draft remaining sections: {}", pending.join(", ")));
    }

    if let Some(latest) = status.critique.latest() {
        if latest.recommendation.to_uppercase().contains("REVISION") {
            steps.push("Address critique issues and revise the affected sections".to_string());
            steps.push("Run another critique pass after revisions".to_string());
        }
    }

    if StageName::ORDER
        .iter()
        .all(|s| status.stage_status(*s) == StageStatus::Completed)
    {
        steps.push("Validate the assembled manuscript against the bibliography".to_string());
    }

    steps
}

// =============================================================================
// Tests
// =============================================================================
