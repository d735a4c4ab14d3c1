use crate::cli::{try_checkpoint, ProjectContext};
use crate::models::StageStatus;
use crate::state::WorkflowManager;
use crate::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Update a workflow stage's status.
///
/// Completion snapshots the stage artifact first so the new checkpoint id can
/// be attached to the stage record; a failed snapshot is reported and the
/// state update proceeds without one.
pub fn run(
    stage_name: &str,
    status: &str,
    artifact: Option<&str>,
    dir: Option<&Path>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let status = StageStatus::from_str(status)
        .map_err(|s| anyhow::anyhow!("Unknown status '{s}' (expected not_started, in_progress, completed or failed)"))?;
    let manager = WorkflowManager::new(&ctx.manuscript_dir);

    let checkpoint = if status == StageStatus::Completed {
        let files: Vec<String> = artifact.iter().map(|a| a.to_string()).collect();
        try_checkpoint(
            &ctx,
            &files,
            stage_name,
            &format!("Complete {stage_name} stage"),
            &BTreeMap::new(),
        )?
    } else {
        None
    };

    let state = manager.update_stage(
        stage_name,
        status,
        artifact.map(|a| a.to_string()),
        checkpoint,
    )?;

    if let Ok(stage) = stage_name.parse::<crate::models::StageName>() {
        let core = state.workflow_status.core(stage);
        println!(
            "{}",
            format!("✓ Stage {stage_name} is now {}", core.status).green()
        );
        if let Some(artifact) = &core.artifact {
            println!("  Artifact: {artifact}");
        }
        if let Some(checkpoint) = &core.checkpoint {
            println!("  Checkpoint: {}", &checkpoint[..7.min(checkpoint.len())]);
        }
    }
    Ok(())
}
