use crate::cli::{try_checkpoint, ProjectContext};
use crate::state::WorkflowManager;
use crate::Result;
use clap::Subcommand;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Subcommand)]
pub enum CritiqueCommands {
    /// Record a critique iteration
    Add {
        /// Reviewer recommendation, e.g. "ACCEPT" or "MAJOR REVISION"
        #[arg(long)]
        recommendation: String,

        /// Path to the critique artifact
        #[arg(long)]
        artifact: Option<String>,

        /// Number of major issues raised
        #[arg(long, default_value_t = 0)]
        major: u32,

        /// Number of minor issues raised
        #[arg(long, default_value_t = 0)]
        minor: u32,
    },
}

pub fn run(command: CritiqueCommands, dir: Option<&Path>) -> Result<()> {
    match command {
        CritiqueCommands::Add {
            recommendation,
            artifact,
            major,
            minor,
        } => add(&recommendation, artifact, major, minor, dir),
    }
}

fn add(
    recommendation: &str,
    artifact: Option<String>,
    major: u32,
    minor: u32,
    dir: Option<&Path>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let manager = WorkflowManager::new(&ctx.manuscript_dir);

    let state =
        manager.add_critique_iteration(recommendation, artifact.clone(), major, minor)?;

    if let Some(artifact) = &artifact {
        let mut metadata = BTreeMap::new();
        metadata.insert("Recommendation".to_string(), recommendation.to_string());
        try_checkpoint(
            &ctx,
            &[artifact.clone()],
            "critique",
            "Record critique iteration",
            &metadata,
        )?;
    }

    let latest = state
        .workflow_status
        .critique
        .latest()
        .ok_or_else(|| anyhow::anyhow!("Critique iteration was not recorded"))?;
    println!(
        "{}",
        format!(
            "✓ Critique v{} recorded: {} ({} major, {} minor)",
            latest.version, latest.recommendation, latest.major_issues, latest.minor_issues
        )
        .green()
    );
    if recommendation.to_uppercase().contains("REVISION") {
        println!("{}", "  Revision requested; revise the flagged sections".yellow());
    }
    Ok(())
}
