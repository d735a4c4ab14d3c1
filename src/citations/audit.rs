//! Layer 4: append-only citation audit trail.
//!
//! One JSONL record per citation use, written regardless of validation
//! outcome. The log answers "when and where was this citation introduced";
//! it is never consulted for pass/fail decisions.

use crate::evidence::EvidenceTable;
use crate::models::AuditLogEntry;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

/// Audit log filename within the state directory
pub const AUDIT_LOG_FILE: &str = "citation_audit.jsonl";

/// Context snippets are truncated to this many characters
const CONTEXT_LIMIT: usize = 200;

/// Appends citation-usage records to a JSONL log.
pub struct CitationAuditor {
    log_path: PathBuf,
}

impl CitationAuditor {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn log_path(&self) -> &std::path::Path {
        &self.log_path
    }

    /// Append one usage record. The entry notes whether the citation's
    /// identifier was verified at the time of use.
    pub fn record_usage(
        &self,
        section: &str,
        citation_key: &str,
        context: &str,
        table: &EvidenceTable,
    ) -> Result<()> {
        let identifier_verified = table
            .get(citation_key)
            .and_then(|e| e.doi.as_deref())
            .map(|doi| doi.starts_with("10."))
            .unwrap_or(false);

        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now(),
            section: section.to_string(),
            citation_key: citation_key.to_string(),
            context: context.chars().take(CONTEXT_LIMIT).collect(),
            identifier_verified,
        };

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log {}", self.log_path.display()))?;
        let line = serde_json::to_string(&entry).context("Failed to serialize audit entry")?;
        writeln!(file, "{line}").context("Failed to append audit entry")?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<AuditLogEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.log_path)
            .with_context(|| format!("Failed to read audit log {}", self.log_path.display()))?;

        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let entry: AuditLogEntry =
                serde_json::from_str(line).context("Malformed audit log entry")?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// All recorded uses of one citation, oldest first.
    pub fn history(&self, citation_key: &str) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.citation_key == citation_key)
            .collect())
    }

    /// Write a human-readable report grouped by citation key.
    pub fn export_report(&self, output: &std::path::Path) -> Result<()> {
        let entries = self.read_all()?;

        let mut report = String::from("# Citation Audit Report\n\n");
        report.push_str(&format!("Generated: {}\n\n", chrono::Utc::now().to_rfc3339()));
        report.push_str(&format!("Total citation usages: {}\n\n", entries.len()));
        report.push_str("## Citations by Key\n\n");

        let mut by_key: std::collections::BTreeMap<&str, Vec<&AuditLogEntry>> =
            std::collections::BTreeMap::new();
        for entry in &entries {
            by_key.entry(&entry.citation_key).or_default().push(entry);
        }

        for (key, uses) in by_key {
            let sections: std::collections::BTreeSet<&str> =
                uses.iter().map(|u| u.section.as_str()).collect();
            report.push_str(&format!("### [{key}]\n\n"));
            report.push_str(&format!("- Used {} time(s)\n", uses.len()));
            report.push_str(&format!(
                "- Identifier verified: {}\n",
                uses[0].identifier_verified
            ));
            report.push_str(&format!(
                "- Sections: {}\n\n",
                sections.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }

        std::fs::write(output, report)
            .with_context(|| format!("Failed to write audit report {}", output.display()))?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvidenceEntry;
    use tempfile::TempDir;

    fn table() -> EvidenceTable {
        EvidenceTable::new(vec![
            EvidenceEntry {
                doi: Some("10.1234/a".to_string()),
                citation_key: "smith2020".to_string(),
                citation: "Smith (2020)".to_string(),
                evidence_quote: "quote".to_string(),
                ..Default::default()
            },
            EvidenceEntry {
                doi: Some("https://example.org/not-a-doi".to_string()),
                citation_key: "weird2021".to_string(),
                citation: "Weird (2021)".to_string(),
                evidence_quote: "quote".to_string(),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_records_append_only() {
        let temp = TempDir::new().unwrap();
        let auditor = CitationAuditor::new(temp.path().join("audit.jsonl"));
        let table = table();

        auditor
            .record_usage("introduction", "smith2020", "As shown by Smith", &table)
            .unwrap();
        auditor
            .record_usage("results", "smith2020", "Consistent with", &table)
            .unwrap();
        auditor
            .record_usage("methods", "weird2021", "", &table)
            .unwrap();

        let history = auditor.history("smith2020").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].section, "introduction");
        assert_eq!(history[1].section, "results");
        assert!(history[0].identifier_verified);

        // A non-DOI identifier is recorded as unverified
        let weird = auditor.history("weird2021").unwrap();
        assert!(!weird[0].identifier_verified);
    }

    #[test]
    fn test_context_truncated() {
        let temp = TempDir::new().unwrap();
        let auditor = CitationAuditor::new(temp.path().join("audit.jsonl"));
        let long_context = "x".repeat(500);

        auditor
            .record_usage("discussion", "smith2020", &long_context, &table())
            .unwrap();

        let history = auditor.history("smith2020").unwrap();
        assert_eq!(history[0].context.len(), 200);
    }

    #[test]
    fn test_history_of_unused_key_is_empty() {
        let temp = TempDir::new().unwrap();
        let auditor = CitationAuditor::new(temp.path().join("audit.jsonl"));
        assert!(auditor.history("never2020").unwrap().is_empty());
    }

    #[test]
    fn test_export_report_groups_by_key() {
        let temp = TempDir::new().unwrap();
        let auditor = CitationAuditor::new(temp.path().join("audit.jsonl"));
        let table = table();

        auditor
            .record_usage("introduction", "smith2020", "", &table)
            .unwrap();
        auditor
            .record_usage("discussion", "smith2020", "", &table)
            .unwrap();

        let report_path = temp.path().join("report.md");
        auditor.export_report(&report_path).unwrap();

        let report = std::fs::read_to_string(&report_path).unwrap();
        assert!(report.contains("### [smith2020]"));
        assert!(report.contains("Used 2 time(s)"));
        assert!(report.contains("introduction, discussion") || report.contains("discussion, introduction"));
    }
}
