use crate::cli::{try_checkpoint, ProjectContext};
use crate::models::StageStatus;
use crate::state::progress::pending_sections;
use crate::state::WorkflowManager;
use crate::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Update a drafting section's status. Unseen section names are registered
/// dynamically; the drafting stage's aggregate status follows the sections.
pub fn run(
    section_name: &str,
    status: &str,
    artifact: Option<&str>,
    dir: Option<&Path>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let status = StageStatus::from_str(status)
        .map_err(|s| anyhow::anyhow!("Unknown status '{s}' (expected not_started, in_progress, completed or failed)"))?;
    let manager = WorkflowManager::new(&ctx.manuscript_dir);

    let state = manager.update_section(section_name, status, artifact.map(|a| a.to_string()))?;

    if status == StageStatus::Completed {
        let files: Vec<String> = artifact.iter().map(|a| a.to_string()).collect();
        try_checkpoint(
            &ctx,
            &files,
            "drafting",
            &format!("Complete {section_name} section"),
            &BTreeMap::new(),
        )?;
    }

    let drafting = &state.workflow_status.drafting;
    println!(
        "{}",
        format!(
            "✓ Section {section_name} is now {status} ({}/{} sections completed)",
            drafting.completed_sections, drafting.total_sections
        )
        .green()
    );

    if drafting.core.status == StageStatus::Completed {
        println!("{}", "✓ All sections completed; drafting stage is done".green());
    } else {
        let pending = pending_sections(drafting);
        if !pending.is_empty() {
            println!("  Pending: {}", pending.join(", "));
        }
    }
    Ok(())
}
