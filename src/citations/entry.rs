//! Layer 1: entry validation.
//!
//! A citation is rejected the moment it is introduced if the evidence table
//! has no entry for it, not at assembly time when the context is gone.

use super::CitationError;
use crate::evidence::EvidenceTable;

/// Fail fast if `citation_key` has no evidence entry.
pub fn assert_citable(citation_key: &str, table: &EvidenceTable) -> Result<(), CitationError> {
    if table.contains_key(citation_key) {
        Ok(())
    } else {
        Err(CitationError::NotFound {
            key: citation_key.to_string(),
        })
    }
}

/// Partition keys into those with and without evidence entries.
pub fn split_citable<'a>(
    citation_keys: &'a [String],
    table: &EvidenceTable,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for key in citation_keys {
        if table.contains_key(key) {
            valid.push(key.as_str());
        } else {
            invalid.push(key.as_str());
        }
    }
    (valid, invalid)
}

// =============================================================================
// Tests
// =============================================================================
