use crate::cli::{try_checkpoint, ProjectContext};
use crate::evidence::bibliography::BIBLIOGRAPHY_FILE;
use crate::evidence::import::LITERATURE_FILE;
use crate::evidence::EVIDENCE_FILE;
use crate::models::{WorkflowState, WorkflowStatus};
use crate::state::WorkflowManager;
use crate::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Metadata written into every archived run directory
#[derive(Debug, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub target_journal: Option<String>,
    pub checkpoint: Option<String>,
    pub files: Vec<String>,
    pub workflow_status: WorkflowStatus,
    pub draftd_version: String,
}

/// Files archived whenever they exist, beyond the per-section artifacts
const STANDARD_FILES: &[&str] = &[
    "outline.md",
    LITERATURE_FILE,
    BIBLIOGRAPHY_FILE,
    EVIDENCE_FILE,
    "full_manuscript.md",
];

/// Archive the current manuscript state as a completed workflow run under
/// `runs/<run_id>/`, record the `RunRecord`, and checkpoint the archive.
pub fn run(description: Option<&str>, journal: Option<&str>, dir: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let manager = WorkflowManager::new(&ctx.manuscript_dir);
    let state = manager.state()?;

    let timestamp = Utc::now().format("%Y-%m-%d_%H%M%S");
    let run_id = match description {
        Some(description) => format!("{timestamp}_{description}"),
        None => timestamp.to_string(),
    };

    let run_dir = ctx.manuscript_dir.join("runs").join(&run_id);
    if run_dir.exists() {
        anyhow::bail!("Run directory already exists: {}", run_dir.display());
    }
    std::fs::create_dir_all(&run_dir)?;

    println!("Archiving current state to: runs/{run_id}");

    let mut copied: Vec<String> = Vec::new();
    for filename in archive_candidates(&state) {
        let source = ctx.manuscript_dir.join(&filename);
        if source.is_file() {
            let target = run_dir.join(&filename);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&source, target)?;
            copied.push(filename.clone());
            println!("  ✓ Copied: {filename}");
        }
    }
    if copied.is_empty() {
        println!("{}", "  ⚠ No files found to archive".yellow());
    }

    let checkpoint_files: Vec<String> = copied
        .iter()
        .map(|f| format!("runs/{run_id}/{f}"))
        .chain(std::iter::once(format!("runs/{run_id}/run_metadata.json")))
        .collect();

    let metadata = RunMetadata {
        run_id: run_id.clone(),
        created_at: Utc::now(),
        target_journal: journal
            .map(|j| j.to_string())
            .or_else(|| state.target_journal.clone()),
        checkpoint: None,
        files: copied.clone(),
        workflow_status: state.workflow_status.clone(),
        draftd_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    std::fs::write(
        run_dir.join("run_metadata.json"),
        serde_json::to_string_pretty(&metadata)?,
    )?;

    let mut checkpoint_metadata = BTreeMap::new();
    checkpoint_metadata.insert("Run".to_string(), run_id.clone());
    let checkpoint = try_checkpoint(
        &ctx,
        &checkpoint_files,
        "archive",
        &format!("Archive workflow run {run_id}"),
        &checkpoint_metadata,
    )?;

    let outputs: BTreeMap<String, String> = copied
        .iter()
        .map(|f| (f.clone(), format!("runs/{run_id}/{f}")))
        .collect();
    manager.add_run(&run_id, journal.map(|j| j.to_string()), checkpoint, outputs.clone())?;
    manager.complete_run(&run_id, outputs)?;

    println!();
    println!("{}", "✓ Run archived".green());
    println!("  Run ID:   {run_id}");
    println!("  Location: runs/{run_id}");
    println!("  Files:    {}", copied.len());
    println!();
    println!("The active workspace stays in {}", ctx.manuscript_dir.display());
    Ok(())
}

fn archive_candidates(state: &WorkflowState) -> Vec<String> {
    let mut files: Vec<String> = STANDARD_FILES.iter().map(|f| f.to_string()).collect();

    for (name, section) in &state.workflow_status.drafting.sections {
        files.push(
            section
                .artifact
                .clone()
                .unwrap_or_else(|| format!("{name}.md")),
        );
    }
    for iteration in &state.workflow_status.critique.iterations {
        if let Some(artifact) = &iteration.artifact {
            files.push(artifact.clone());
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    files.retain(|f| seen.insert(f.clone()));
    files
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CritiqueIteration;

    #[test]
    fn test_run_metadata_round_trips() {
        let metadata = RunMetadata {
            run_id: "2026-02-01_120000_plos-v1".to_string(),
            created_at: chrono::Utc::now(),
            target_journal: Some("PLOS ONE".to_string()),
            checkpoint: None,
            files: vec!["full_manuscript.md".to_string()],
            workflow_status: WorkflowStatus::default(),
            draftd_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let json = serde_json::to_string_pretty(&metadata).unwrap();
        let back: RunMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, metadata.run_id);
        assert_eq!(back.files, metadata.files);
        assert_eq!(back.target_journal, metadata.target_journal);
    }

    #[test]
    fn test_archive_candidates_cover_sections_and_critiques() {
        let mut state = WorkflowState::new("demo", None);
        state
            .workflow_status
            .drafting
            .sections
            .get_mut("abstract")
            .unwrap()
            .artifact = Some("abstract_v2.md".to_string());
        state.workflow_status.critique.iterations.push(CritiqueIteration {
            version: 1,
            artifact: Some("critique_v1.md".to_string()),
            completed_at: None,
            recommendation: "ACCEPT".to_string(),
            major_issues: 0,
            minor_issues: 0,
        });

        let candidates = archive_candidates(&state);
        assert!(candidates.contains(&"abstract_v2.md".to_string()));
        assert!(candidates.contains(&"methods.md".to_string()));
        assert!(candidates.contains(&"critique_v1.md".to_string()));
        assert!(candidates.contains(&"full_manuscript.md".to_string()));

        // No duplicates
        let unique: std::collections::BTreeSet<&String> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }
}
