//! Merging imported evidence with freshly gathered evidence.

use crate::evidence::table::EvidenceTable;
use crate::models::EvidenceEntry;
use serde::Serialize;
use std::collections::HashMap;

/// Counts from one merge operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub from_previous: u32,
    pub from_new: u32,
    pub duplicates_collapsed: u32,
    pub total: u32,
}

/// Merge an imported table with newly gathered evidence.
///
/// Both tables are concatenated, then deduplicated by normalized identifier;
/// when both sides define the same identifier the entry from the *new* table
/// wins (newest evidence supersedes older text for the same source). Entries
/// without an identifier are never collapsed, even when their content is
/// identical.
pub fn merge_evidence(old: &EvidenceTable, new: &EvidenceTable) -> (EvidenceTable, MergeStats) {
    let combined: Vec<(bool, &EvidenceEntry)> = old
        .entries
        .iter()
        .map(|e| (false, e))
        .chain(new.entries.iter().map(|e| (true, e)))
        .collect();

    // Last occurrence of an identifier wins: within one table the later row,
    // across tables the new side.
    let mut last_position: HashMap<String, usize> = HashMap::new();
    for (index, (_, entry)) in combined.iter().enumerate() {
        if let Some(identifier) = entry.identifier() {
            last_position.insert(identifier, index);
        }
    }

    let mut stats = MergeStats::default();
    let mut merged = Vec::new();
    for (index, (is_new, entry)) in combined.iter().enumerate() {
        let keep = match entry.identifier() {
            Some(identifier) => last_position[&identifier] == index,
            None => true,
        };
        if keep {
            merged.push((*entry).clone());
            if *is_new {
                stats.from_new += 1;
            } else {
                stats.from_previous += 1;
            }
        }
    }

    stats.total = merged.len() as u32;
    stats.duplicates_collapsed = (combined.len() - merged.len()) as u32;
    (EvidenceTable::new(merged), stats)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, doi: Option<&str>, quote: &str) -> EvidenceEntry {
        EvidenceEntry {
            doi: doi.map(|d| d.to_string()),
            citation_key: key.to_string(),
            citation: format!("{key} citation"),
            evidence_quote: quote.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_table_wins_on_shared_identifier() {
        let old = EvidenceTable::new(vec![
            entry("smith2020", Some("10.1/a"), "old quote"),
            entry("jones2021", Some("10.1/b"), "kept"),
        ]);
        let new = EvidenceTable::new(vec![entry("smith2020b", Some("10.1/a"), "new quote")]);

        let (merged, stats) = merge_evidence(&old, &new);

        assert_eq!(stats.total, 2);
        assert_eq!(stats.from_previous, 1);
        assert_eq!(stats.from_new, 1);
        assert_eq!(stats.duplicates_collapsed, 1);

        let winner = merged
            .entries
            .iter()
            .find(|e| e.identifier().as_deref() == Some("10.1/a"))
            .unwrap();
        assert_eq!(winner.evidence_quote, "new quote");
    }

    #[test]
    fn test_identifierless_entries_never_collapse() {
        let old = EvidenceTable::new(vec![entry("anon2020", None, "same text")]);
        let new = EvidenceTable::new(vec![entry("anon2020", None, "same text")]);

        let (merged, stats) = merge_evidence(&old, &new);

        assert_eq!(merged.len(), 2);
        assert_eq!(stats.duplicates_collapsed, 0);
    }

    #[test]
    fn test_identifier_normalization_collapses_prefixed_dois() {
        let old = EvidenceTable::new(vec![entry(
            "smith2020",
            Some("https://doi.org/10.1/A"),
            "old",
        )]);
        let new = EvidenceTable::new(vec![entry("smith2020", Some("10.1/a"), "new")]);

        let (merged, stats) = merge_evidence(&old, &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(stats.duplicates_collapsed, 1);
        assert_eq!(merged.entries[0].evidence_quote, "new");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let old = EvidenceTable::new(vec![
            entry("smith2020", Some("10.1/a"), "old"),
            entry("anon", None, "free text"),
        ]);
        let new = EvidenceTable::new(vec![
            entry("smith2020", Some("10.1/a"), "new"),
            entry("lee2024", Some("10.1/c"), "fresh"),
        ]);

        let (first, _) = merge_evidence(&old, &new);
        let (second, _) = merge_evidence(&first, &new);

        // Identifier-bearing entries converge; the identifierless entry from
        // `old` is preserved exactly once because `new` has no such entries
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn test_within_table_last_occurrence_wins() {
        let old = EvidenceTable::new(vec![]);
        let new = EvidenceTable::new(vec![
            entry("smith2020", Some("10.1/a"), "first"),
            entry("smith2020", Some("10.1/a"), "second"),
        ]);

        let (merged, stats) = merge_evidence(&old, &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.entries[0].evidence_quote, "second");
        assert_eq!(stats.duplicates_collapsed, 1);
    }

    #[test]
    fn test_empty_sides() {
        let empty = EvidenceTable::default();
        let filled = EvidenceTable::new(vec![entry("a2020", Some("10.1/a"), "q")]);

        let (merged, stats) = merge_evidence(&empty, &filled);
        assert_eq!(merged.len(), 1);
        assert_eq!(stats.from_previous, 0);
        assert_eq!(stats.from_new, 1);

        let (merged, _) = merge_evidence(&filled, &empty);
        assert_eq!(merged.len(), 1);
    }
}
