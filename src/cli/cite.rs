use crate::citations::{validate_all, CitationAuditor};
use crate::cli::ProjectContext;
use crate::evidence::{bibliography, EvidenceTable, EVIDENCE_FILE};
use crate::state::{StateError, WorkflowManager};
use crate::Result;
use clap::Subcommand;
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum CiteCommands {
    /// Validate citation keys for a section
    Check {
        /// Section the citations appear in
        section: String,

        /// Citation keys to validate
        #[arg(required = true)]
        keys: Vec<String>,

        /// Assembled manuscript to check for completeness
        #[arg(long)]
        manuscript: Option<PathBuf>,

        /// Bibliography to check for completeness
        #[arg(long)]
        bib: Option<PathBuf>,
    },

    /// Export the citation audit report
    Report {
        /// Output path (default: citation_audit_report.md in the manuscript)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

pub fn run(command: CiteCommands, dir: Option<&Path>) -> Result<()> {
    match command {
        CiteCommands::Check {
            section,
            keys,
            manuscript,
            bib,
        } => check(&section, &keys, manuscript.as_deref(), bib.as_deref(), dir),
        CiteCommands::Report { output } => report(output.as_deref(), dir),
    }
}

fn check(
    section: &str,
    keys: &[String],
    manuscript: Option<&Path>,
    bib: Option<&Path>,
    dir: Option<&Path>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let table = EvidenceTable::load(&ctx.manuscript_dir.join(EVIDENCE_FILE))?;

    let artifact_text = match manuscript {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    let bibliography_keys: Option<BTreeSet<String>> = match bib {
        Some(path) => Some(bibliography::load_keys(path)?),
        None => None,
    };
    let auditor = CitationAuditor::new(ctx.audit_log_path());

    let (success, messages) = validate_all(
        keys,
        section,
        &table,
        artifact_text.as_deref(),
        bibliography_keys.as_ref(),
        Some(&auditor),
    );

    for message in &messages {
        if success {
            println!("{}", format!("⚠ {message}").yellow());
        } else {
            eprintln!("{}", message.red());
        }
    }

    let manager = WorkflowManager::new(&ctx.manuscript_dir);
    let result = if success {
        format!("{} citations valid for {section}", keys.len())
    } else {
        format!("failed for {section}")
    };
    match manager.record_verification("cite-check", None, &result) {
        Ok(_) | Err(StateError::NotInitialized) => {}
        Err(e) => eprintln!("{}", format!("⚠ Could not record verification: {e}").yellow()),
    }

    if success {
        println!(
            "{}",
            format!("✓ All {} citations validated for {section}", keys.len()).green()
        );
        Ok(())
    } else {
        anyhow::bail!("Citation validation failed for {section}")
    }
}

fn report(output: Option<&Path>, dir: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let auditor = CitationAuditor::new(ctx.audit_log_path());

    let output_path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ctx.manuscript_dir.join("citation_audit_report.md"));
    auditor.export_report(&output_path)?;

    println!("{}", "✓ Audit report exported".green());
    println!("  {}", output_path.display());
    Ok(())
}
