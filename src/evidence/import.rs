//! Prior-run detection and evidence import.
//!
//! A prior run is a sibling manuscript directory whose persisted state shows
//! completed research with a non-zero evidence count. Importing re-validates
//! the prior evidence, drops entries whose identifier no longer resolves,
//! flags aged entries for review, and filters the bibliography down to the
//! retained keys.

use crate::evidence::bibliography;
use crate::evidence::resolver::{validate_entries, IdentifierResolver};
use crate::evidence::table::{EvidenceTable, EVIDENCE_FILE};
use crate::models::{Disposition, ValidationSummary, WorkflowState};
use crate::state::StateStore;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Narrative literature summary filename
pub const LITERATURE_FILE: &str = "literature.md";

/// Validation report written next to the imported evidence
pub const VALIDATION_REPORT_FILE: &str = "literature_evidence_validation.csv";

/// Provenance metadata filename for an import
pub const IMPORT_METADATA_FILE: &str = "literature_evidence_metadata.json";

/// Files a prior run must provide to be importable
const REQUIRED_SOURCE_FILES: &[&str] = &[
    EVIDENCE_FILE,
    bibliography::BIBLIOGRAPHY_FILE,
    LITERATURE_FILE,
];

/// Outcome of one evidence import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub source_dir: PathBuf,
    pub source_checkpoint: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub summary: ValidationSummary,
    pub files_imported: Vec<String>,
}

impl ImportResult {
    /// Entries carried forward (kept plus flagged for review)
    pub fn retained(&self) -> u32 {
        self.summary.kept + self.summary.flagged_for_review
    }
}

/// Provenance metadata persisted alongside the imported evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProvenance {
    pub version: String,
    pub created: DateTime<Utc>,
    pub source_dir: String,
    pub source_checkpoint: Option<String>,
    pub papers_total_in_source: u32,
    pub papers_imported: u32,
    pub papers_need_review: u32,
    pub papers_removed: u32,
    pub files_imported: Vec<String>,
}

/// Find the most recent sibling manuscript directory whose research stage is
/// completed with a non-zero evidence count.
///
/// Candidates are ranked by the state's creation timestamp, newest first;
/// directory names never participate in the ordering.
pub fn detect_prior_run(current_dir: &Path) -> Result<Option<(PathBuf, WorkflowState)>> {
    let current = current_dir
        .canonicalize()
        .unwrap_or_else(|_| current_dir.to_path_buf());
    let Some(parent) = current.parent() else {
        return Ok(None);
    };

    let mut candidates: Vec<(PathBuf, WorkflowState)> = Vec::new();
    for entry in walkdir::WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let sibling = entry.path().to_path_buf();
        if sibling == current {
            continue;
        }

        // An unreadable or malformed sibling state is simply not a candidate
        let Ok(Some(state)) = StateStore::new(&sibling).read() else {
            continue;
        };

        let research = &state.workflow_status.research;
        if research.core.status == crate::models::StageStatus::Completed
            && research.papers_found > 0
        {
            candidates.push((sibling, state));
        }
    }

    candidates.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
    Ok(candidates.into_iter().next())
}

/// Structural precondition for importing: the source must hold an evidence
/// table, a bibliography, and a narrative summary. A missing file is a
/// reported failure, not an error.
pub fn validate_source_evidence(source_dir: &Path) -> (bool, String) {
    let missing: Vec<&str> = REQUIRED_SOURCE_FILES
        .iter()
        .filter(|name| !source_dir.join(name).exists())
        .copied()
        .collect();

    if missing.is_empty() {
        (true, String::new())
    } else {
        (false, format!("missing files: {}", missing.join(", ")))
    }
}

/// Import evidence from `source_dir` into `target_dir`.
///
/// With a resolver, every identifier is re-resolved: dead entries are dropped
/// (`remove`), aged entries flagged (`review`), and the full validation table
/// written next to the clean import. The bibliography is filtered to exactly
/// the retained citation keys.
pub fn import_evidence(
    source_dir: &Path,
    target_dir: &Path,
    resolver: Option<&dyn IdentifierResolver>,
    source_checkpoint: Option<String>,
) -> Result<ImportResult> {
    let (is_valid, reason) = validate_source_evidence(source_dir);
    if !is_valid {
        bail!(
            "Prior run at {} is not importable: {}",
            source_dir.display(),
            reason
        );
    }

    std::fs::create_dir_all(target_dir)
        .with_context(|| format!("Failed to create {}", target_dir.display()))?;

    let mut files_imported = Vec::new();

    std::fs::copy(
        source_dir.join(LITERATURE_FILE),
        target_dir.join(LITERATURE_FILE),
    )
    .context("Failed to copy literature summary")?;
    files_imported.push(LITERATURE_FILE.to_string());

    let mut table = EvidenceTable::load(&source_dir.join(EVIDENCE_FILE))?;
    let summary = validate_entries(&mut table, resolver, Utc::now().year());

    // Full validation results stay reviewable next to the clean import
    table.save_validation(&target_dir.join(VALIDATION_REPORT_FILE))?;
    files_imported.push(VALIDATION_REPORT_FILE.to_string());

    let retained = EvidenceTable::new(
        table
            .entries
            .iter()
            .filter(|e| e.disposition != Disposition::Remove)
            .cloned()
            .collect(),
    );
    retained.save_clean(&target_dir.join(EVIDENCE_FILE))?;
    files_imported.push(EVIDENCE_FILE.to_string());

    bibliography::filter_file(
        &source_dir.join(bibliography::BIBLIOGRAPHY_FILE),
        &target_dir.join(bibliography::BIBLIOGRAPHY_FILE),
        &retained.keys(),
    )?;
    files_imported.push(bibliography::BIBLIOGRAPHY_FILE.to_string());

    let result = ImportResult {
        source_dir: source_dir.to_path_buf(),
        source_checkpoint,
        imported_at: Utc::now(),
        summary,
        files_imported,
    };
    write_provenance(target_dir, &result)?;

    Ok(result)
}

fn write_provenance(target_dir: &Path, result: &ImportResult) -> Result<()> {
    let provenance = ImportProvenance {
        version: "1.0".to_string(),
        created: result.imported_at,
        source_dir: result.source_dir.display().to_string(),
        source_checkpoint: result.source_checkpoint.clone(),
        papers_total_in_source: result.summary.total,
        papers_imported: result.retained(),
        papers_need_review: result.summary.flagged_for_review,
        papers_removed: result.summary.dropped,
        files_imported: result.files_imported.clone(),
    };

    let path = target_dir.join(IMPORT_METADATA_FILE);
    let content =
        serde_json::to_string_pretty(&provenance).context("Failed to serialize provenance")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceEntry, StageStatus, ValidationStatus};
    use tempfile::TempDir;

    struct DenyListResolver {
        dead: Vec<String>,
    }

    impl IdentifierResolver for DenyListResolver {
        fn resolve(&self, identifier: &str) -> ValidationStatus {
            if self.dead.iter().any(|d| d == identifier) {
                ValidationStatus::Invalid
            } else {
                ValidationStatus::Valid
            }
        }
    }

    fn seed_source(dir: &Path, count: usize) -> Vec<String> {
        std::fs::create_dir_all(dir).unwrap();

        let entries: Vec<EvidenceEntry> = (0..count)
            .map(|i| EvidenceEntry {
                doi: Some(format!("10.1234/paper.{i}")),
                citation_key: format!("author{i}2024"),
                citation: format!("Author{i} et al. (2024)"),
                evidence_quote: format!("Quote {i}"),
                ..Default::default()
            })
            .collect();
        let keys: Vec<String> = entries.iter().map(|e| e.citation_key.clone()).collect();

        EvidenceTable::new(entries)
            .save_clean(&dir.join(EVIDENCE_FILE))
            .unwrap();

        let bib: Vec<String> = keys
            .iter()
            .map(|key| format!("@article{{{key},\n  title = {{Paper {key}}}\n}}"))
            .collect();
        std::fs::write(
            dir.join(bibliography::BIBLIOGRAPHY_FILE),
            bib.join("\n\n"),
        )
        .unwrap();
        std::fs::write(dir.join(LITERATURE_FILE), "# Literature\n").unwrap();

        keys
    }

    fn seed_prior_state(dir: &Path, papers: u32) {
        let store = StateStore::new(dir);
        let mut state = store.initialize("prior", None).unwrap();
        state.workflow_status.research.core.status = StageStatus::Completed;
        state.workflow_status.research.papers_found = papers;
        store.write(&mut state).unwrap();
    }

    #[test]
    fn test_validate_source_reports_missing_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("v1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(EVIDENCE_FILE), "doi,citation_key,citation,evidence_quote\n")
            .unwrap();

        let (ok, reason) = validate_source_evidence(&dir);
        assert!(!ok);
        assert!(reason.contains(bibliography::BIBLIOGRAPHY_FILE));
        assert!(reason.contains(LITERATURE_FILE));
        assert!(!reason.contains(EVIDENCE_FILE));
    }

    #[test]
    fn test_import_drops_dead_identifiers_and_filters_bibliography() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("v1");
        let target = temp.path().join("v2");
        seed_source(&source, 20);

        let resolver = DenyListResolver {
            dead: vec![
                "10.1234/paper.3".to_string(),
                "10.1234/paper.7".to_string(),
                "10.1234/paper.15".to_string(),
            ],
        };

        let result = import_evidence(
            &source,
            &target,
            Some(&resolver),
            Some("abc1234".to_string()),
        )
        .unwrap();

        assert_eq!(result.summary.total, 20);
        assert_eq!(result.summary.dropped, 3);
        assert_eq!(result.retained(), 17);

        let imported = EvidenceTable::load(&target.join(EVIDENCE_FILE)).unwrap();
        assert_eq!(imported.len(), 17);
        assert!(!imported.contains_key("author32024"));
        assert!(!imported.contains_key("author72024"));
        assert!(!imported.contains_key("author152024"));

        let bib_keys =
            bibliography::load_keys(&target.join(bibliography::BIBLIOGRAPHY_FILE)).unwrap();
        assert_eq!(bib_keys.len(), 17);
        assert!(!bib_keys.contains("author32024"));

        // Provenance links the import to the source checkpoint
        let metadata: ImportProvenance = serde_json::from_str(
            &std::fs::read_to_string(target.join(IMPORT_METADATA_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(metadata.papers_imported, 17);
        assert_eq!(metadata.papers_removed, 3);
        assert_eq!(metadata.source_checkpoint.as_deref(), Some("abc1234"));
    }

    #[test]
    fn test_import_without_resolver_keeps_everything_recent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("v1");
        let target = temp.path().join("v2");
        seed_source(&source, 5);

        let result = import_evidence(&source, &target, None, None).unwrap();
        assert_eq!(result.summary.dropped, 0);
        assert_eq!(result.retained(), 5);
        assert_eq!(result.summary.identifiers_not_checked, 5);
    }

    #[test]
    fn test_import_fails_on_incomplete_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("v1");
        let target = temp.path().join("v2");
        std::fs::create_dir_all(&source).unwrap();

        let err = import_evidence(&source, &target, None, None).unwrap_err();
        assert!(err.to_string().contains("not importable"));
    }

    #[test]
    fn test_detect_prior_run_picks_newest_by_creation() {
        let temp = TempDir::new().unwrap();
        let current = temp.path().join("v3");
        std::fs::create_dir_all(&current).unwrap();

        let older = temp.path().join("v1");
        let newer = temp.path().join("aa-v2");
        seed_prior_state(&older, 10);
        std::thread::sleep(std::time::Duration::from_millis(10));
        seed_prior_state(&newer, 12);

        let (path, state) = detect_prior_run(&current).unwrap().unwrap();
        // "aa-v2" sorts before "v1" by name; creation time decides anyway
        assert!(path.ends_with("aa-v2"));
        assert_eq!(state.workflow_status.research.papers_found, 12);
    }

    #[test]
    fn test_detect_prior_run_skips_incomplete_research() {
        let temp = TempDir::new().unwrap();
        let current = temp.path().join("v2");
        std::fs::create_dir_all(&current).unwrap();

        // Research completed but zero papers
        let empty = temp.path().join("v0");
        seed_prior_state(&empty, 0);

        // Research never completed
        let unfinished = temp.path().join("v1");
        StateStore::new(&unfinished).initialize("wip", None).unwrap();

        assert!(detect_prior_run(&current).unwrap().is_none());
    }
}
