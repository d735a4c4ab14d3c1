//! Layer 3: assembly completeness.
//!
//! At assembly time the set of keys cited in the text must exactly equal the
//! set of keys defined in the bibliography. Any asymmetry means a dangling
//! reference or a dead bibliography entry reaching the final artifact, so it
//! is fatal.

use super::CitationError;
use regex::Regex;
use std::collections::BTreeSet;

/// Orphans on each side of the text/bibliography comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletenessReport {
    pub orphaned_in_text: BTreeSet<String>,
    pub orphaned_in_bibliography: BTreeSet<String>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.orphaned_in_text.is_empty() && self.orphaned_in_bibliography.is_empty()
    }
}

/// Every `[author2020]`-style key referenced in manuscript text.
pub fn extract_text_keys(text: &str) -> BTreeSet<String> {
    match Regex::new(r"\[([a-zA-Z]+\d{4}[a-z]?)\]") {
        Ok(re) => re
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

/// Compare in-text keys against bibliography keys without raising.
pub fn completeness_report(text: &str, bibliography_keys: &BTreeSet<String>) -> CompletenessReport {
    let text_keys = extract_text_keys(text);
    CompletenessReport {
        orphaned_in_text: text_keys.difference(bibliography_keys).cloned().collect(),
        orphaned_in_bibliography: bibliography_keys.difference(&text_keys).cloned().collect(),
    }
}

/// Fail with both orphan sets enumerated unless text and bibliography cite
/// exactly the same keys.
pub fn check_completeness(
    text: &str,
    bibliography_keys: &BTreeSet<String>,
) -> Result<(), CitationError> {
    let report = completeness_report(text, bibliography_keys);
    if report.is_complete() {
        Ok(())
    } else {
        Err(CitationError::Mismatch {
            orphaned_in_text: report.orphaned_in_text.into_iter().collect(),
            orphaned_in_bibliography: report.orphaned_in_bibliography.into_iter().collect(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
