//! Identifier resolution and evidence validation.
//!
//! Resolution is a blocking HTTP call bounded by a short timeout. Network
//! failure degrades to `Unknown` status; it never aborts validation and never
//! touches persisted state.

use crate::evidence::table::{extract_year, EvidenceTable};
use crate::models::{Disposition, Freshness, ValidationStatus, ValidationSummary};
use anyhow::{Context, Result};
use std::time::Duration;

/// Default resolution timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Ages (in years) at which a source stops being fresh / becomes old
const FRESH_UNDER_YEARS: i32 = 5;
const STALE_UNDER_YEARS: i32 = 10;

/// Resolves a bibliographic identifier to a reachability status.
pub trait IdentifierResolver {
    fn resolve(&self, identifier: &str) -> ValidationStatus;
}

/// DOI resolver over the public doi.org redirect service.
pub struct DoiResolver {
    client: reqwest::blocking::Client,
}

impl DoiResolver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build identifier resolution client")?;
        Ok(Self { client })
    }
}

impl IdentifierResolver for DoiResolver {
    fn resolve(&self, identifier: &str) -> ValidationStatus {
        let cleaned = identifier
            .trim()
            .trim_start_matches("https://doi.org/")
            .trim_start_matches("http://doi.org/");
        if cleaned.is_empty() {
            return ValidationStatus::Invalid;
        }

        let url = format!("https://doi.org/{cleaned}");
        match self.client.head(&url).send() {
            Ok(response) if response.status().is_success() => ValidationStatus::Valid,
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                ValidationStatus::Invalid
            }
            // Timeouts, connection errors and odd status codes all degrade to
            // unknown rather than dropping the entry
            _ => ValidationStatus::Unknown,
        }
    }
}

/// Age classification relative to `current_year`.
pub fn classify_freshness(year: i32, current_year: i32) -> Freshness {
    let age = current_year - year;
    if age < FRESH_UNDER_YEARS {
        Freshness::Fresh
    } else if age < STALE_UNDER_YEARS {
        Freshness::Stale
    } else {
        Freshness::Old
    }
}

/// Compute `doi_status`, `freshness`, `disposition` and `reason` for every
/// entry in the table.
///
/// Entries whose identifier no longer resolves are marked `remove`; stale or
/// old entries are flagged `review`. An entry with no parsable year keeps
/// `unknown` freshness and is not flagged on age alone.
pub fn validate_entries(
    table: &mut EvidenceTable,
    resolver: Option<&dyn IdentifierResolver>,
    current_year: i32,
) -> ValidationSummary {
    let mut summary = ValidationSummary {
        total: table.len() as u32,
        ..Default::default()
    };

    for entry in &mut table.entries {
        let mut reasons: Vec<String> = Vec::new();

        entry.doi_status = match (resolver, entry.identifier()) {
            (Some(resolver), Some(identifier)) => resolver.resolve(&identifier),
            _ => ValidationStatus::NotChecked,
        };
        entry.disposition = Disposition::Keep;
        match entry.doi_status {
            ValidationStatus::Valid => summary.identifiers_valid += 1,
            ValidationStatus::Invalid => {
                summary.identifiers_invalid += 1;
                entry.disposition = Disposition::Remove;
                reasons.push("identifier does not resolve".to_string());
            }
            ValidationStatus::Unknown => {
                summary.identifiers_unknown += 1;
                reasons.push("identifier check failed (network)".to_string());
            }
            ValidationStatus::NotChecked => summary.identifiers_not_checked += 1,
        }

        let year = entry.year.or_else(|| extract_year(&entry.citation));
        entry.freshness = match year {
            Some(year) => classify_freshness(year, current_year),
            None => Freshness::Unknown,
        };
        if matches!(entry.freshness, Freshness::Stale | Freshness::Old) {
            if entry.disposition == Disposition::Keep {
                entry.disposition = Disposition::Review;
            }
            if let Some(year) = year {
                reasons.push(format!("source is {} years old", current_year - year));
            }
        }

        entry.reason = if reasons.is_empty() {
            Some("valid".to_string())
        } else {
            Some(reasons.join("; "))
        };

        match entry.disposition {
            Disposition::Keep => summary.kept += 1,
            Disposition::Review => summary.flagged_for_review += 1,
            Disposition::Remove => summary.dropped += 1,
        }
    }

    summary
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvidenceEntry;

    /// Resolver with a fixed answer per identifier, no network involved.
    struct FixedResolver {
        invalid: Vec<&'static str>,
        unknown: Vec<&'static str>,
    }

    impl IdentifierResolver for FixedResolver {
        fn resolve(&self, identifier: &str) -> ValidationStatus {
            if self.invalid.contains(&identifier) {
                ValidationStatus::Invalid
            } else if self.unknown.contains(&identifier) {
                ValidationStatus::Unknown
            } else {
                ValidationStatus::Valid
            }
        }
    }

    fn entry(key: &str, doi: Option<&str>, citation: &str) -> EvidenceEntry {
        EvidenceEntry {
            doi: doi.map(|d| d.to_string()),
            citation_key: key.to_string(),
            citation: citation.to_string(),
            evidence_quote: "quote".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_freshness_thresholds() {
        assert_eq!(classify_freshness(2024, 2026), Freshness::Fresh);
        assert_eq!(classify_freshness(2022, 2026), Freshness::Fresh);
        assert_eq!(classify_freshness(2021, 2026), Freshness::Stale);
        assert_eq!(classify_freshness(2017, 2026), Freshness::Stale);
        assert_eq!(classify_freshness(2016, 2026), Freshness::Old);
        assert_eq!(classify_freshness(1998, 2026), Freshness::Old);
    }

    #[test]
    fn test_dead_identifier_is_dropped() {
        let mut table = EvidenceTable::new(vec![
            entry("smith2024", Some("10.1/alive"), "Smith (2024)"),
            entry("gone2023", Some("10.1/dead"), "Gone (2023)"),
        ]);
        let resolver = FixedResolver {
            invalid: vec!["10.1/dead"],
            unknown: vec![],
        };

        let summary = validate_entries(&mut table, Some(&resolver), 2026);

        assert_eq!(summary.kept, 1);
        assert_eq!(summary.dropped, 1);
        let dead = table.get("gone2023").unwrap();
        assert_eq!(dead.disposition, Disposition::Remove);
        assert_eq!(dead.doi_status, ValidationStatus::Invalid);
        assert!(dead.reason.as_deref().unwrap().contains("does not resolve"));
    }

    #[test]
    fn test_network_failure_degrades_to_unknown() {
        let mut table = EvidenceTable::new(vec![entry(
            "flaky2024",
            Some("10.1/flaky"),
            "Flaky (2024)",
        )]);
        let resolver = FixedResolver {
            invalid: vec![],
            unknown: vec!["10.1/flaky"],
        };

        let summary = validate_entries(&mut table, Some(&resolver), 2026);

        // Unknown keeps the entry
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.identifiers_unknown, 1);
        let flaky = table.get("flaky2024").unwrap();
        assert_eq!(flaky.disposition, Disposition::Keep);
    }

    #[test]
    fn test_old_sources_flagged_for_review_not_dropped() {
        let mut table = EvidenceTable::new(vec![
            entry("classic2010", Some("10.1/classic"), "Classic et al. (2010)"),
            entry("mid2019", Some("10.1/mid"), "Mid (2019)"),
        ]);
        let resolver = FixedResolver {
            invalid: vec![],
            unknown: vec![],
        };

        let summary = validate_entries(&mut table, Some(&resolver), 2026);

        assert_eq!(summary.flagged_for_review, 2);
        assert_eq!(summary.dropped, 0);
        assert_eq!(
            table.get("classic2010").unwrap().freshness,
            Freshness::Old
        );
        assert_eq!(table.get("mid2019").unwrap().freshness, Freshness::Stale);
    }

    #[test]
    fn test_missing_year_stays_unknown() {
        let mut table =
            EvidenceTable::new(vec![entry("undated", Some("10.1/u"), "Undated source")]);
        let resolver = FixedResolver {
            invalid: vec![],
            unknown: vec![],
        };

        validate_entries(&mut table, Some(&resolver), 2026);

        let e = table.get("undated").unwrap();
        assert_eq!(e.freshness, Freshness::Unknown);
        assert_eq!(e.disposition, Disposition::Keep);
    }

    #[test]
    fn test_no_resolver_marks_not_checked() {
        let mut table = EvidenceTable::new(vec![entry(
            "smith2024",
            Some("10.1/a"),
            "Smith (2024)",
        )]);

        let summary = validate_entries(&mut table, None, 2026);

        assert_eq!(summary.identifiers_not_checked, 1);
        assert_eq!(
            table.get("smith2024").unwrap().doi_status,
            ValidationStatus::NotChecked
        );
    }

    #[test]
    fn test_entry_year_field_preferred_over_citation_text() {
        let mut e = entry("smith", Some("10.1/a"), "Smith (1999)");
        e.year = Some(2025);
        let mut table = EvidenceTable::new(vec![e]);

        validate_entries(&mut table, None, 2026);
        assert_eq!(table.entries[0].freshness, Freshness::Fresh);
    }
}
