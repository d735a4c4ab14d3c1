use crate::citations::completeness::check_completeness;
use crate::cli::{try_checkpoint, ProjectContext};
use crate::evidence::bibliography;
use crate::models::StageStatus;
use crate::state::progress::canonical_section_order;
use crate::state::WorkflowManager;
use crate::Result;
use colored::Colorize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Default assembled manuscript filename
const MANUSCRIPT_FILE: &str = "full_manuscript.md";

/// Concatenate section artifacts into the full manuscript, in canonical
/// section order, and validate citation completeness against the
/// bibliography before anything reaches disk.
pub fn run(output: Option<&Path>, dir: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::resolve(dir)?;
    let manager = WorkflowManager::new(&ctx.manuscript_dir);
    let state = manager.state()?;

    let sections = &state.workflow_status.drafting.sections;
    let mut included: Vec<(String, String)> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    for name in canonical_section_order(sections) {
        let filename = sections
            .get(&name)
            .and_then(|s| s.artifact.clone())
            .unwrap_or_else(|| format!("{name}.md"));
        let path = ctx.manuscript_dir.join(&filename);
        match std::fs::read_to_string(&path) {
            Ok(content) => included.push((name, content.trim().to_string())),
            Err(_) => missing.push(name),
        }
    }

    if included.is_empty() {
        anyhow::bail!(
            "No section files found in {}. Draft sections before assembling",
            ctx.manuscript_dir.display()
        );
    }
    if !missing.is_empty() {
        println!(
            "{}",
            format!("⚠ Missing sections: {}", missing.join(", ")).yellow()
        );
    }

    let mut text = String::from("# Full Manuscript\n\n");
    text.push_str(&format!(
        "**Assembled:** {}\n\n---\n\n",
        chrono::Utc::now().format("%Y-%m-%d")
    ));
    for (name, content) in &included {
        if !content.starts_with("# ") {
            let mut title: Vec<String> = name
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect();
            if title.is_empty() {
                title.push(name.clone());
            }
            text.push_str(&format!("# {}\n\n", title.join(" ")));
        }
        text.push_str(content);
        text.push_str("\n\n---\n\n");
    }

    // Completeness gate: a dangling reference or dead bibliography entry must
    // not reach the final artifact
    let bib_path = ctx.manuscript_dir.join(bibliography::BIBLIOGRAPHY_FILE);
    let bib_keys: BTreeSet<String> = if bib_path.exists() {
        bibliography::load_keys(&bib_path)?
    } else {
        BTreeSet::new()
    };
    check_completeness(&text, &bib_keys)?;

    let output_name = output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| MANUSCRIPT_FILE.to_string());
    let output_path = if Path::new(&output_name).is_absolute() {
        Path::new(&output_name).to_path_buf()
    } else {
        ctx.manuscript_dir.join(&output_name)
    };
    std::fs::write(&output_path, &text)?;

    let word_count = text.split_whitespace().count() as u32;
    manager.record_assembly_counts(
        included.len() as u32,
        missing.len() as u32,
        word_count,
    )?;

    let checkpoint = try_checkpoint(
        &ctx,
        &[output_name.clone()],
        "assembly",
        "Assemble full manuscript",
        &BTreeMap::new(),
    )?;
    manager.update_stage(
        "assembly",
        StageStatus::Completed,
        Some(output_name),
        checkpoint,
    )?;
    manager.record_verification(
        "assemble",
        Some(MANUSCRIPT_FILE.to_string()),
        &format!("{} sections, {} words", included.len(), word_count),
    )?;

    println!("{}", "✓ Manuscript assembled".green());
    println!("  Output:   {}", output_path.display());
    println!("  Sections: {}", included.len());
    println!("  Words:    {word_count}");
    Ok(())
}
