use crate::checkpoint::CheckpointManager;
use crate::cli::ProjectContext;
use crate::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

#[derive(Subcommand)]
pub enum CheckpointCommands {
    /// Initialize the isolated checkpoint history
    Init,

    /// Show whether the manuscript has uncommitted changes
    Status,

    /// Print the current checkpoint id
    Current,
}

pub fn run(command: CheckpointCommands, dir: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let manager = CheckpointManager::new();

    match command {
        CheckpointCommands::Init => {
            if manager.initialize_history(&ctx.manuscript_dir)? {
                println!("{}", "✓ Checkpoint history initialized".green());
            } else {
                println!("Checkpoint history already exists");
            }
            println!("  {}", ctx.manuscript_dir.display());
        }
        CheckpointCommands::Status => {
            let status = manager.status(&ctx.manuscript_dir)?;
            if status.has_uncommitted_changes {
                println!("{}", "⚠ Uncommitted manuscript changes".yellow());
            } else {
                println!("{}", "✓ Working tree matches the last checkpoint".green());
            }
        }
        CheckpointCommands::Current => match manager.current(&ctx.manuscript_dir)? {
            Some(id) => println!("{id}"),
            None => println!("No checkpoints yet"),
        },
    }
    Ok(())
}
