use crate::checkpoint::CheckpointManager;
use crate::cli::{status_symbol, ProjectContext};
use crate::models::{StageName, StageStatus, WorkflowState};
use crate::state::{next_steps, StateError, WorkflowManager};
use crate::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;

/// Display workflow progress, next steps, and recent activity.
pub fn run(detailed: bool, json: bool, dir: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let manager = WorkflowManager::new(&ctx.manuscript_dir);

    let state = match manager.state() {
        Ok(state) => state,
        Err(StateError::NotInitialized) if json => {
            println!("{{\"error\": \"not_initialized\"}}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    print_header(&state);
    print_stages(&state, detailed);

    let steps = next_steps(&state);
    if !steps.is_empty() {
        println!("{}", "Next Steps:".cyan().bold());
        for (i, step) in steps.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
        println!();
    }

    if detailed {
        print_runs(&state);
        print_verifications(&state);
    }

    // Best effort; an unreadable history never breaks status display
    let checkpoints = CheckpointManager::new();
    if let Ok(status) = checkpoints.status(&ctx.manuscript_dir) {
        if status.has_uncommitted_changes {
            println!("{}", "⚠ Uncommitted manuscript changes".yellow().bold());
            println!("  Complete a stage or section to checkpoint them");
            println!();
        }
    }

    Ok(())
}

fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn print_header(state: &WorkflowState) {
    println!("{}", "=".repeat(60));
    println!("{}", "draftd Project Status".bold());
    println!("{}", "=".repeat(60));
    println!();
    println!("Project: {}", state.project_name);
    if let Some(journal) = &state.target_journal {
        println!("Target Journal: {journal}");
    }
    println!("Last Updated: {}", format_timestamp(Some(state.last_updated)));
    println!();
}

fn print_stages(state: &WorkflowState, detailed: bool) {
    println!("{}", "Workflow Progress:".cyan().bold());
    println!("{}", "-".repeat(60));

    let status = &state.workflow_status;
    for stage in StageName::ORDER {
        let core = status.core(stage);
        let symbol = status_symbol(core.status);
        let label = match stage {
            StageName::RepositoryAnalysis => "Repository Analysis".to_string(),
            StageName::Plan => "Planning".to_string(),
            StageName::Assessment => "Journal Assessment".to_string(),
            StageName::Research => {
                let papers = status.research.papers_found;
                if papers > 0 {
                    format!("Literature Research ({papers} papers)")
                } else {
                    "Literature Research".to_string()
                }
            }
            StageName::Drafting => format!(
                "Drafting ({}/{} sections)",
                status.drafting.completed_sections, status.drafting.total_sections
            ),
            StageName::Critique => match status.critique.latest() {
                Some(latest) => {
                    format!("Critique (v{} - {})", latest.version, latest.recommendation)
                }
                None => "Critique".to_string(),
            },
            StageName::Assembly => "Final Assembly".to_string(),
        };
        println!("  {symbol} {label}");

        if detailed {
            if let Some(artifact) = &core.artifact {
                println!("      Artifact: {artifact}");
            }
            if core.status == StageStatus::Completed {
                println!("      Completed: {}", format_timestamp(core.completed_at));
            }
            if let Some(checkpoint) = &core.checkpoint {
                println!("      Checkpoint: {}", &checkpoint[..7.min(checkpoint.len())]);
            }
        }
    }

    if detailed {
        let sections = &state.workflow_status.drafting.sections;
        if !sections.is_empty() {
            println!();
            println!("  Sections:");
            for name in crate::state::progress::canonical_section_order(sections) {
                if let Some(section) = sections.get(&name) {
                    println!("    {} {name}", status_symbol(section.status));
                }
            }
        }
    }
    println!();
}

fn print_runs(state: &WorkflowState) {
    if state.runs.is_empty() {
        return;
    }
    println!("{}", "Workflow Runs:".cyan().bold());
    println!("{}", "-".repeat(60));
    for run in state.runs.iter().rev().take(3) {
        println!("  • {}", run.run_id);
        println!(
            "    Journal: {}, Started: {}",
            run.target_journal.as_deref().unwrap_or("N/A"),
            format_timestamp(Some(run.started_at))
        );
    }
    if state.runs.len() > 3 {
        println!("  ... and {} more", state.runs.len() - 3);
    }
    println!();
}

fn print_verifications(state: &WorkflowState) {
    let verifications = &state.provenance.verification_runs;
    if verifications.is_empty() {
        return;
    }
    println!("{}", "Recent Verifications:".cyan().bold());
    println!("{}", "-".repeat(60));
    for verification in verifications.iter().rev().take(3) {
        println!(
            "  • {} ({})",
            verification.operation,
            format_timestamp(Some(verification.timestamp))
        );
        if let Some(file) = &verification.file {
            println!("    File: {file}, Result: {}", verification.result);
        } else {
            println!("    Result: {}", verification.result);
        }
    }
    println!();
}
