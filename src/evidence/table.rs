//! Evidence table IO.
//!
//! The evidence table is the one tabular file in the system
//! (`literature_evidence.csv`). The first four columns are required and
//! hand-maintained; the validation columns are computed and rewritten by
//! every validation run.

use crate::models::EvidenceEntry;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// Conventional evidence table filename within the manuscript directory
pub const EVIDENCE_FILE: &str = "literature_evidence.csv";

/// Columns that must be present in any evidence table
pub const REQUIRED_COLUMNS: &[&str] = &["doi", "citation_key", "citation", "evidence_quote"];

const CLEAN_COLUMNS: &[&str] = &[
    "doi",
    "citation_key",
    "citation",
    "evidence_quote",
    "title",
    "year",
    "citation_type",
];

const VALIDATION_COLUMNS: &[&str] = &[
    "doi",
    "citation_key",
    "citation",
    "evidence_quote",
    "title",
    "year",
    "citation_type",
    "doi_status",
    "freshness",
    "disposition",
    "reason",
];

/// In-memory evidence table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceTable {
    pub entries: Vec<EvidenceEntry>,
}

impl EvidenceTable {
    pub fn new(entries: Vec<EvidenceEntry>) -> Self {
        Self { entries }
    }

    /// Load a table, failing on a missing file or missing required columns.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to read evidence table {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header row of {}", path.display()))?
            .clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .copied()
            .collect();
        if !missing.is_empty() {
            bail!(
                "Evidence table {} is missing required columns: {}",
                path.display(),
                missing.join(", ")
            );
        }

        let mut entries = Vec::new();
        for record in reader.deserialize() {
            let entry: EvidenceEntry = record
                .with_context(|| format!("Malformed row in {}", path.display()))?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, citation_key: &str) -> Option<&EvidenceEntry> {
        self.entries.iter().find(|e| e.citation_key == citation_key)
    }

    pub fn contains_key(&self, citation_key: &str) -> bool {
        self.get(citation_key).is_some()
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|e| e.citation_key.clone())
            .collect()
    }

    fn field_row(entry: &EvidenceEntry, with_validation: bool) -> Vec<String> {
        let mut row = vec![
            entry.doi.clone().unwrap_or_default(),
            entry.citation_key.clone(),
            entry.citation.clone(),
            entry.evidence_quote.clone(),
            entry.title.clone().unwrap_or_default(),
            entry.year.map(|y| y.to_string()).unwrap_or_default(),
            entry
                .citation_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        ];
        if with_validation {
            row.push(entry.doi_status.as_str().to_string());
            row.push(entry.freshness.as_str().to_string());
            row.push(entry.disposition.as_str().to_string());
            row.push(entry.reason.clone().unwrap_or_default());
        }
        row
    }

    fn save_with(&self, path: &Path, columns: &[&str], with_validation: bool) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to write evidence table {}", path.display()))?;
        writer.write_record(columns)?;
        for entry in &self.entries {
            writer.write_record(Self::field_row(entry, with_validation))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(())
    }

    /// Write the hand-maintained columns only, dropping computed validation
    /// results.
    pub fn save_clean(&self, path: &Path) -> Result<()> {
        self.save_with(path, CLEAN_COLUMNS, false)
    }

    /// Write all columns including the computed validation results.
    pub fn save_validation(&self, path: &Path) -> Result<()> {
        self.save_with(path, VALIDATION_COLUMNS, true)
    }
}

/// Publication year pulled out of a formatted citation string, preferring the
/// parenthesized form ("Smith et al. (2020)").
pub fn extract_year(citation: &str) -> Option<i32> {
    let parenthesized = Regex::new(r"\((\d{4})\)").ok()?;
    if let Some(caps) = parenthesized.captures(citation) {
        return caps[1].parse().ok();
    }
    let bare = Regex::new(r"\b(\d{4})\b").ok()?;
    bare.captures(citation).and_then(|caps| caps[1].parse().ok())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CitationType, Disposition, Freshness, ValidationStatus};
    use tempfile::TempDir;

    fn entry(key: &str, doi: &str, citation: &str) -> EvidenceEntry {
        EvidenceEntry {
            doi: (!doi.is_empty()).then(|| doi.to_string()),
            citation_key: key.to_string(),
            citation: citation.to_string(),
            evidence_quote: "Supporting quote".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_requires_columns() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("evidence.csv");
        std::fs::write(&path, "doi,citation_key\n10.1/a,smith2020\n").unwrap();

        let err = EvidenceTable::load(&path).unwrap_err();
        assert!(err.to_string().contains("citation"));
        assert!(err.to_string().contains("evidence_quote"));
    }

    #[test]
    fn test_round_trip_clean_columns() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("evidence.csv");

        let mut first = entry("smith2020", "10.1234/abc", "Smith et al. (2020)");
        first.title = Some("A benchmark of things".to_string());
        first.year = Some(2020);
        first.citation_type = Some(CitationType::Benchmark);
        let table = EvidenceTable::new(vec![first, entry("jones2021", "", "Jones (2021)")]);

        table.save_clean(&path).unwrap();
        let back = EvidenceTable::load(&path).unwrap();

        assert_eq!(back.len(), 2);
        let smith = back.get("smith2020").unwrap();
        assert_eq!(smith.doi.as_deref(), Some("10.1234/abc"));
        assert_eq!(smith.year, Some(2020));
        assert_eq!(smith.citation_type, Some(CitationType::Benchmark));
        let jones = back.get("jones2021").unwrap();
        assert_eq!(jones.doi, None);
        assert_eq!(jones.citation_type, None);
    }

    #[test]
    fn test_validation_columns_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("evidence_validation.csv");

        let mut e = entry("smith2015", "10.1/x", "Smith (2015)");
        e.doi_status = ValidationStatus::Valid;
        e.freshness = Freshness::Old;
        e.disposition = Disposition::Review;
        e.reason = Some("Source is 11 years old".to_string());
        let table = EvidenceTable::new(vec![e]);

        table.save_validation(&path).unwrap();
        let back = EvidenceTable::load(&path).unwrap();

        let smith = back.get("smith2015").unwrap();
        assert_eq!(smith.doi_status, ValidationStatus::Valid);
        assert_eq!(smith.freshness, Freshness::Old);
        assert_eq!(smith.disposition, Disposition::Review);
    }

    #[test]
    fn test_keys_and_lookup() {
        let table = EvidenceTable::new(vec![
            entry("smith2020", "10.1/a", "Smith (2020)"),
            entry("jones2021", "10.1/b", "Jones (2021)"),
        ]);
        assert!(table.contains_key("smith2020"));
        assert!(!table.contains_key("doe2019"));
        assert_eq!(
            table.keys().into_iter().collect::<Vec<_>>(),
            vec!["jones2021", "smith2020"]
        );
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("Smith et al. (2020) Deep homology"), Some(2020));
        assert_eq!(extract_year("Smith 2018, Nature"), Some(2018));
        assert_eq!(extract_year("Smith, no year"), None);
        // Parenthesized year wins over other numbers
        assert_eq!(extract_year("Vol 1234, Smith et al. (2019)"), Some(2019));
    }
}
