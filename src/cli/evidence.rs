use crate::checkpoint::CheckpointManager;
use crate::cli::ProjectContext;
use crate::evidence::resolver::{validate_entries, DoiResolver, IdentifierResolver};
use crate::evidence::{
    detect_prior_run, import_evidence, merge_evidence, EvidenceTable, EVIDENCE_FILE,
};
use crate::models::{ValidationSummary, WorkflowState};
use crate::state::{StateError, WorkflowManager};
use crate::Result;
use chrono::Datelike;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum EvidenceCommands {
    /// Validate the evidence table: resolve identifiers, classify freshness
    Validate {
        /// Evidence table to validate (default: manuscript evidence table)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Skip identifier resolution (no network)
        #[arg(long)]
        no_resolve: bool,

        /// Print the summary without writing the validation table
        #[arg(long)]
        summary_only: bool,
    },

    /// Detect a prior run with completed research
    Detect,

    /// Import evidence from a prior run
    Import {
        /// Prior run directory (default: auto-detected)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Skip identifier re-resolution during import
        #[arg(long)]
        no_validate: bool,

        /// Proceed without the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Merge an imported table with freshly gathered evidence
    Merge {
        /// Imported evidence table
        #[arg(long)]
        old: PathBuf,

        /// Newly gathered evidence table
        #[arg(long)]
        new: PathBuf,

        /// Merged output table
        #[arg(long)]
        output: PathBuf,
    },
}

pub fn run(command: EvidenceCommands, dir: Option<&Path>) -> Result<()> {
    match command {
        EvidenceCommands::Validate {
            csv,
            no_resolve,
            summary_only,
        } => validate(csv.as_deref(), no_resolve, summary_only, dir),
        EvidenceCommands::Detect => detect(dir),
        EvidenceCommands::Import {
            source,
            no_validate,
            yes,
        } => import(source.as_deref(), no_validate, yes, dir),
        EvidenceCommands::Merge { old, new, output } => merge(&old, &new, &output),
    }
}

fn make_resolver(ctx: &ProjectContext) -> Result<DoiResolver> {
    DoiResolver::new(ctx.config.resolver_timeout())
}

fn resolving_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

fn print_summary(summary: &ValidationSummary) {
    println!();
    println!("{}", "Validation Summary".bold());
    println!("{}", "-".repeat(60));
    println!("Total entries: {}", summary.total);
    println!(
        "Identifiers: {} valid, {} invalid, {} unknown, {} not checked",
        summary.identifiers_valid,
        summary.identifiers_invalid,
        summary.identifiers_unknown,
        summary.identifiers_not_checked
    );
    println!("  {} Keep:   {}", "✓".green(), summary.kept);
    println!("  {} Review: {}", "⚠".yellow(), summary.flagged_for_review);
    println!("  {} Remove: {}", "✗".red(), summary.dropped);
}

fn record_verification_if_initialized(
    ctx: &ProjectContext,
    operation: &str,
    file: Option<String>,
    result: &str,
) {
    let manager = WorkflowManager::new(&ctx.manuscript_dir);
    match manager.record_verification(operation, file, result) {
        Ok(_) | Err(StateError::NotInitialized) => {}
        Err(e) => eprintln!("{}", format!("⚠ Could not record verification: {e}").yellow()),
    }
}

fn validate(
    csv: Option<&Path>,
    no_resolve: bool,
    summary_only: bool,
    dir: Option<&Path>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let csv_path = csv
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ctx.manuscript_dir.join(EVIDENCE_FILE));

    let mut table = EvidenceTable::load(&csv_path)?;
    println!("Validating evidence from: {}", csv_path.display());

    let resolver = if no_resolve {
        None
    } else {
        Some(make_resolver(&ctx)?)
    };
    let summary = {
        let spinner = resolver
            .is_some()
            .then(|| resolving_spinner("Resolving identifiers..."));
        let summary = validate_entries(
            &mut table,
            resolver.as_ref().map(|r| r as &dyn IdentifierResolver),
            chrono::Utc::now().year(),
        );
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        summary
    };

    print_summary(&summary);

    if !summary_only {
        let stem = csv_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "evidence".to_string());
        let output = csv_path.with_file_name(format!("{stem}_validation.csv"));
        table.save_validation(&output)?;
        println!();
        println!("Validation results saved to: {}", output.display());
        println!("(the computed columns are rewritten on every run; do not hand-edit them)");
    }

    record_verification_if_initialized(
        &ctx,
        "evidence-validate",
        Some(csv_path.display().to_string()),
        &format!(
            "{} kept, {} review, {} remove",
            summary.kept, summary.flagged_for_review, summary.dropped
        ),
    );

    if summary.dropped > 0 {
        anyhow::bail!(
            "{} entries have identifiers that no longer resolve; review the validation table",
            summary.dropped
        );
    }
    Ok(())
}

fn print_detection(path: &Path, state: &WorkflowState) {
    let research = &state.workflow_status.research;
    println!("{}", "✓ Detected prior run".green().bold());
    println!("  Path:    {}", path.display());
    println!("  Created: {}", state.created_at.format("%Y-%m-%d %H:%M"));
    println!("  Papers:  {}", research.papers_found);
    if let Some(source) = &research.source_run {
        println!("  (that run itself imported from: {source})");
    }
}

fn detect(dir: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    match detect_prior_run(&ctx.manuscript_dir)? {
        Some((path, state)) => {
            print_detection(&path, &state);
            Ok(())
        }
        None => {
            println!("No prior run with completed research found.");
            Ok(())
        }
    }
}

fn import(
    source: Option<&Path>,
    no_validate: bool,
    yes: bool,
    dir: Option<&Path>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;

    let source_dir = match source {
        Some(source) => source.to_path_buf(),
        None => match detect_prior_run(&ctx.manuscript_dir)? {
            Some((path, state)) => {
                print_detection(&path, &state);
                path
            }
            None => {
                println!("No prior run with completed research found.");
                return Ok(());
            }
        },
    };

    // Auto-accept when not attached to a terminal so automation never hangs
    let confirmed = yes
        || !std::io::stdin().is_terminal()
        || Confirm::new()
            .with_prompt("Reuse the evidence from this prior run as a starting point?")
            .default(true)
            .interact()?;
    if !confirmed {
        println!("Import cancelled.");
        return Ok(());
    }

    let resolver = if no_validate {
        None
    } else {
        Some(make_resolver(&ctx)?)
    };
    // Best effort: a prior run without a checkpoint history still imports
    let source_checkpoint = CheckpointManager::new()
        .current(&source_dir)
        .unwrap_or(None);

    let result = {
        let spinner = resolver
            .is_some()
            .then(|| resolving_spinner("Validating imported identifiers..."));
        let result = import_evidence(
            &source_dir,
            &ctx.manuscript_dir,
            resolver.as_ref().map(|r| r as &dyn IdentifierResolver),
            source_checkpoint,
        );
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result?
    };

    print_summary(&result.summary);

    let manager = WorkflowManager::new(&ctx.manuscript_dir);
    match manager.record_import(result.retained(), &source_dir.display().to_string()) {
        Ok(_) | Err(StateError::NotInitialized) => {}
        Err(e) => return Err(e.into()),
    }
    record_verification_if_initialized(
        &ctx,
        "evidence-import",
        Some(EVIDENCE_FILE.to_string()),
        &format!("{} of {} entries imported", result.retained(), result.summary.total),
    );

    println!();
    println!(
        "{}",
        format!(
            "✓ Imported {} of {} entries from {}",
            result.retained(),
            result.summary.total,
            source_dir.display()
        )
        .green()
    );
    if result.summary.flagged_for_review > 0 {
        println!(
            "{}",
            format!(
                "⚠ {} aged entries are flagged for review in the validation table",
                result.summary.flagged_for_review
            )
            .yellow()
        );
    }
    println!("Continue with a fresh literature search, then merge the results.");
    Ok(())
}

fn merge(old: &Path, new: &Path, output: &Path) -> Result<()> {
    let old_table = EvidenceTable::load(old)?;
    let new_table = EvidenceTable::load(new)?;

    let (merged, stats) = merge_evidence(&old_table, &new_table);
    merged.save_clean(output)?;

    println!("{}", "✓ Evidence merged".green());
    println!("  From previous run: {}", stats.from_previous);
    println!("  From new search:   {}", stats.from_new);
    println!("  Duplicates collapsed: {}", stats.duplicates_collapsed);
    println!("  Total entries: {}", stats.total);
    println!("  Saved to: {}", output.display());
    Ok(())
}
