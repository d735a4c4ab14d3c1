//! Evidence & Citation Types
//!
//! Row model for the evidence table (`literature_evidence.csv`), the computed
//! validation classifications, and the append-only citation audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Classifications
// =============================================================================

/// Role a cited source plays in the manuscript
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CitationType {
    Seminal,
    Review,
    Recent,
    Tool,
    Protocol,
    Dataset,
    Benchmark,
    #[default]
    Unknown,
}

impl CitationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationType::Seminal => "seminal",
            CitationType::Review => "review",
            CitationType::Recent => "recent",
            CitationType::Tool => "tool",
            CitationType::Protocol => "protocol",
            CitationType::Dataset => "dataset",
            CitationType::Benchmark => "benchmark",
            CitationType::Unknown => "unknown",
        }
    }
}

/// Outcome of resolving an entry's identifier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unknown,
    #[default]
    NotChecked,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
            ValidationStatus::Unknown => "unknown",
            ValidationStatus::NotChecked => "not_checked",
        }
    }
}

/// Age classification of a cited source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Stale,
    Old,
    #[default]
    Unknown,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::Old => "old",
            Freshness::Unknown => "unknown",
        }
    }
}

/// Computed keep/review/remove classification after validation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    Keep,
    Review,
    Remove,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Keep => "keep",
            Disposition::Review => "review",
            Disposition::Remove => "remove",
        }
    }
}

// =============================================================================
// Evidence Entry
// =============================================================================

/// One bibliographic claim-support record.
///
/// The first four fields are the required evidence-table columns; the
/// `doi_status`/`freshness`/`disposition`/`reason` fields are computed by
/// validation and must not be hand-edited between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvidenceEntry {
    /// DOI-like identifier; entries without one are never deduplicated
    #[serde(default)]
    pub doi: Option<String>,

    /// Unique within a project, e.g. "smith2020"
    pub citation_key: String,

    /// Formatted source citation, e.g. "Smith et al. (2020) Deep homology"
    pub citation: String,

    pub evidence_quote: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub citation_type: Option<CitationType>,

    #[serde(default)]
    pub doi_status: ValidationStatus,

    #[serde(default)]
    pub freshness: Freshness,

    #[serde(default)]
    pub disposition: Disposition,

    #[serde(default)]
    pub reason: Option<String>,
}

impl EvidenceEntry {
    /// Identifier normalized for deduplication (prefix-stripped, lowercased)
    pub fn identifier(&self) -> Option<String> {
        self.doi.as_deref().and_then(|d| {
            let cleaned = d
                .trim()
                .trim_start_matches("https://doi.org/")
                .trim_start_matches("http://doi.org/")
                .to_lowercase();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }
}

// =============================================================================
// Validation Summary
// =============================================================================

/// Counts produced by validating an evidence table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationSummary {
    pub total: u32,
    pub kept: u32,
    pub flagged_for_review: u32,
    pub dropped: u32,
    pub identifiers_valid: u32,
    pub identifiers_invalid: u32,
    pub identifiers_unknown: u32,
    pub identifiers_not_checked: u32,
}

// =============================================================================
// Audit Log
// =============================================================================

/// Append-only record of one citation use. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub section: String,
    pub citation_key: String,
    /// First 200 characters of the surrounding text
    pub context: String,
    pub identifier_verified: bool,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_normalization() {
        let entry = EvidenceEntry {
            doi: Some("https://doi.org/10.1234/ABC.5".to_string()),
            citation_key: "smith2020".to_string(),
            ..Default::default()
        };
        assert_eq!(entry.identifier().as_deref(), Some("10.1234/abc.5"));

        let bare = EvidenceEntry {
            doi: Some("10.1234/abc.5".to_string()),
            ..Default::default()
        };
        assert_eq!(bare.identifier(), entry.identifier());

        let empty = EvidenceEntry {
            doi: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(empty.identifier(), None);

        let none = EvidenceEntry::default();
        assert_eq!(none.identifier(), None);
    }

    #[test]
    fn test_classification_serde_names() {
        assert_eq!(
            serde_json::to_string(&ValidationStatus::NotChecked).unwrap(),
            "\"not_checked\""
        );
        assert_eq!(
            serde_json::to_string(&Disposition::Review).unwrap(),
            "\"review\""
        );
        assert_eq!(
            serde_json::from_str::<CitationType>("\"seminal\"").unwrap(),
            CitationType::Seminal
        );
    }
}
