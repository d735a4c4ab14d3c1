//! Citation Integrity Validator
//!
//! Four layers, composed but individually invocable:
//! 1. entry validation — reject a citation the moment it lacks evidence
//! 2. section appropriateness — advisory warnings from editorial rules
//! 3. assembly completeness — text and bibliography must cite the same keys
//! 4. audit trail — append-only usage log, never consulted for pass/fail

pub mod audit;
pub mod completeness;
pub mod entry;
pub mod rules;

pub use audit::CitationAuditor;
pub use completeness::{check_completeness, extract_text_keys, CompletenessReport};
pub use entry::assert_citable;
pub use rules::check_section_fit;

use crate::evidence::EvidenceTable;
use std::collections::BTreeSet;

/// Fatal citation-integrity failures. Warnings from the section rules are
/// plain strings, never errors.
#[derive(Debug, thiserror::Error)]
pub enum CitationError {
    #[error(
        "Citation [{key}] has no entry in the evidence table.\n\
         A claim without evidence invites review requests and retraction risk.\n\
         Add the source to the evidence table with a supporting quote, then retry"
    )]
    NotFound { key: String },

    #[error("{}", format_mismatch(orphaned_in_text, orphaned_in_bibliography))]
    Mismatch {
        orphaned_in_text: Vec<String>,
        orphaned_in_bibliography: Vec<String>,
    },
}

fn format_mismatch(orphaned_in_text: &[String], orphaned_in_bibliography: &[String]) -> String {
    let mut message = String::from("Citation mismatch between text and bibliography\n");
    if !orphaned_in_text.is_empty() {
        message.push_str(&format!(
            "Cited in text but missing from the bibliography ({}):\n",
            orphaned_in_text.len()
        ));
        for key in orphaned_in_text {
            message.push_str(&format!("  - [{key}]\n"));
        }
    }
    if !orphaned_in_bibliography.is_empty() {
        message.push_str(&format!(
            "In the bibliography but never cited ({}):\n",
            orphaned_in_bibliography.len()
        ));
        for key in orphaned_in_bibliography {
            message.push_str(&format!("  - [{key}]\n"));
        }
    }
    message.push_str("Add the missing bibliography entries or remove the dead ones");
    message
}

/// Run all validation layers over one set of citation uses.
///
/// Layers 1 and 3 short-circuit on the first fatal error; layer-2 warnings
/// accumulate regardless. When an auditor is configured, layer 4 records
/// every citation use, validation outcome included.
pub fn validate_all(
    keys: &[String],
    section: &str,
    table: &EvidenceTable,
    artifact_text: Option<&str>,
    bibliography_keys: Option<&BTreeSet<String>>,
    auditor: Option<&CitationAuditor>,
) -> (bool, Vec<String>) {
    let mut messages = Vec::new();
    let mut success = true;

    // Layer 1: every key must have evidence
    let missing = keys
        .iter()
        .find_map(|key| entry::assert_citable(key, table).err());

    if let Some(e) = missing {
        messages.push(e.to_string());
        success = false;
    } else {
        // Layer 2: advisory section rules
        messages.extend(rules::check_section_fit(section, keys, table));

        // Layer 3: completeness, when an assembled artifact is in play
        if let (Some(text), Some(bib_keys)) = (artifact_text, bibliography_keys) {
            if let Err(e) = completeness::check_completeness(text, bib_keys) {
                messages.push(e.to_string());
                success = false;
            }
        }
    }

    // Layer 4: forensics, independent of the outcome above
    if let Some(auditor) = auditor {
        for key in keys {
            if let Err(e) = auditor.record_usage(section, key, "", table) {
                messages.push(format!("Audit log write failed: {e}"));
            }
        }
    }

    (success, messages)
}

// =============================================================================
// Tests
// =============================================================================
