use crate::checkpoint::{CheckpointError, CheckpointManager};
use crate::cli::ProjectContext;
use crate::models::SectionRecord;
use crate::state::StateStore;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Initialize a project: state document, manuscript directory, and (unless
/// disabled) the isolated checkpoint history.
pub fn run(
    name: Option<&str>,
    journal: Option<&str>,
    dir: Option<&Path>,
    no_checkpoints: bool,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    std::fs::create_dir_all(&ctx.manuscript_dir)?;

    let project_name = match name {
        Some(name) => name.to_string(),
        None => ctx
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "manuscript".to_string()),
    };

    let store = StateStore::new(&ctx.manuscript_dir);
    let already_initialized = store.read()?.is_some();
    let mut state = store.initialize(&project_name, journal)?;

    if already_initialized {
        println!(
            "{}",
            format!("Project '{}' already initialized", state.project_name).yellow()
        );
    } else if ctx
        .config
        .default_sections
        .iter()
        .map(String::as_str)
        .ne(crate::models::DEFAULT_SECTIONS.iter().copied())
    {
        // Configured section set replaces the built-in defaults
        let drafting = &mut state.workflow_status.drafting;
        drafting.sections = ctx
            .config
            .default_sections
            .iter()
            .map(|name| (name.clone(), SectionRecord::default()))
            .collect();
        drafting.total_sections = drafting.sections.len() as u32;
        store.write(&mut state)?;
    }

    if ctx.config.enable_checkpoints && !no_checkpoints {
        let manager = CheckpointManager::new();
        match manager.initialize_history(&ctx.manuscript_dir) {
            Ok(true) => println!("{}", "✓ Checkpoint history initialized".green()),
            Ok(false) => {}
            Err(e @ CheckpointError::UnsafeTarget { .. })
            | Err(e @ CheckpointError::UnsafeRemote { .. }) => return Err(e.into()),
            Err(e) => eprintln!("{}", format!("⚠ Checkpoint history unavailable: {e}").yellow()),
        }
    }

    println!("{}", "✓ Project initialized".green());
    println!("  Project:    {}", state.project_name);
    if let Some(journal) = &state.target_journal {
        println!("  Journal:    {journal}");
    }
    println!("  Manuscript: {}", ctx.manuscript_dir.display());
    println!("  State:      {}", store.state_path().display());
    Ok(())
}
