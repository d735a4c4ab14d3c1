//! Layer 2: section-appropriateness rules.
//!
//! Editorial heuristics, not hard constraints: this layer only ever emits
//! warnings. The citation-type inference is a standalone function so the
//! keyword heuristic can be swapped or tested without the rule table.

use crate::evidence::table::extract_year;
use crate::evidence::EvidenceTable;
use crate::models::{CitationType, EvidenceEntry};
use chrono::Datelike;

/// Expectations for one manuscript section
struct SectionRule {
    section: &'static str,
    max_citations: Option<usize>,
    allowed: &'static [CitationType],
    forbidden: &'static [CitationType],
    reason: &'static str,
}

const SECTION_RULES: &[SectionRule] = &[
    SectionRule {
        section: "abstract",
        max_citations: Some(2),
        allowed: &[CitationType::Seminal],
        forbidden: &[],
        reason: "abstracts should be self-contained; citations are rarely appropriate",
    },
    SectionRule {
        section: "introduction",
        max_citations: None,
        allowed: &[
            CitationType::Seminal,
            CitationType::Review,
            CitationType::Recent,
            CitationType::Tool,
        ],
        forbidden: &[],
        reason: "broad background; most citation types fit",
    },
    SectionRule {
        section: "methods",
        max_citations: None,
        allowed: &[
            CitationType::Tool,
            CitationType::Protocol,
            CitationType::Dataset,
        ],
        forbidden: &[CitationType::Review],
        reason: "should cite the tools, datasets and protocols actually used",
    },
    SectionRule {
        section: "results",
        max_citations: None,
        allowed: &[CitationType::Recent, CitationType::Benchmark],
        forbidden: &[CitationType::Review],
        reason: "should compare against other studies and benchmarks",
    },
    SectionRule {
        section: "discussion",
        max_citations: None,
        allowed: &[
            CitationType::Seminal,
            CitationType::Review,
            CitationType::Recent,
            CitationType::Tool,
        ],
        forbidden: &[],
        reason: "broad interpretation; most citation types fit",
    },
];

const TOOL_KEYWORDS: &[&str] = &["software", "tool", "pipeline", "package", "algorithm"];
const REVIEW_KEYWORDS: &[&str] = &["review", "survey", "overview", "perspectives"];
const PROTOCOL_KEYWORDS: &[&str] = &["protocol", "method", "procedure", "workflow"];
const DATASET_KEYWORDS: &[&str] = &["database", "dataset", "repository", "collection"];
const BENCHMARK_KEYWORDS: &[&str] = &["benchmark", "comparison", "evaluation"];

/// Infer a citation type from title keywords and recency.
///
/// Title keywords win over recency; failing both, sources newer than five
/// years default to `recent` and older than ten to `seminal`.
pub fn infer_citation_type(
    title: Option<&str>,
    year: Option<i32>,
    current_year: i32,
) -> CitationType {
    if let Some(title) = title {
        let lowered = title.to_lowercase();
        let keyword_sets = [
            (TOOL_KEYWORDS, CitationType::Tool),
            (REVIEW_KEYWORDS, CitationType::Review),
            (PROTOCOL_KEYWORDS, CitationType::Protocol),
            (DATASET_KEYWORDS, CitationType::Dataset),
            (BENCHMARK_KEYWORDS, CitationType::Benchmark),
        ];
        for (keywords, citation_type) in keyword_sets {
            if keywords.iter().any(|k| lowered.contains(k)) {
                return citation_type;
            }
        }
    }

    match year {
        Some(year) if year >= current_year - 5 => CitationType::Recent,
        Some(year) if year < current_year - 10 => CitationType::Seminal,
        _ => CitationType::Unknown,
    }
}

fn effective_type(
    entry: &EvidenceEntry,
    current_year: i32,
    infer: &dyn Fn(Option<&str>, Option<i32>, i32) -> CitationType,
) -> CitationType {
    match entry.citation_type {
        Some(t) if t != CitationType::Unknown => t,
        _ => {
            let year = entry.year.or_else(|| extract_year(&entry.citation));
            infer(entry.title.as_deref(), year, current_year)
        }
    }
}

/// Check citations against the fixed rule table using the default inference.
pub fn check_section_fit(
    section: &str,
    citation_keys: &[String],
    table: &EvidenceTable,
) -> Vec<String> {
    check_section_fit_with(
        section,
        citation_keys,
        table,
        chrono::Utc::now().year(),
        &infer_citation_type,
    )
}

/// Check citations with a caller-supplied type inference. Sections without a
/// rule entry produce no warnings.
pub fn check_section_fit_with(
    section: &str,
    citation_keys: &[String],
    table: &EvidenceTable,
    current_year: i32,
    infer: &dyn Fn(Option<&str>, Option<i32>, i32) -> CitationType,
) -> Vec<String> {
    let section_lower = section.to_lowercase();
    let Some(rule) = SECTION_RULES.iter().find(|r| r.section == section_lower) else {
        return Vec::new();
    };

    let mut warnings = Vec::new();

    if let Some(max) = rule.max_citations {
        if citation_keys.len() > max {
            warnings.push(format!(
                "{section} has {} citations but should have at most {max}: {}",
                citation_keys.len(),
                rule.reason
            ));
        }
    }

    for key in citation_keys {
        let Some(entry) = table.get(key) else {
            continue;
        };
        let citation_type = effective_type(entry, current_year, infer);
        if citation_type == CitationType::Unknown {
            continue;
        }

        if rule.forbidden.contains(&citation_type) {
            warnings.push(format!(
                "Citation [{key}] appears to be {}, which does not belong in {section}: {}",
                citation_type.as_str(),
                rule.reason
            ));
        } else if !rule.allowed.is_empty() && !rule.allowed.contains(&citation_type) {
            let expected: Vec<&str> = rule.allowed.iter().map(|t| t.as_str()).collect();
            warnings.push(format!(
                "Citation [{key}] appears to be {}, but {section} typically uses: {}",
                citation_type.as_str(),
                expected.join(", ")
            ));
        }
    }

    warnings
}

// =============================================================================
// Tests
// =============================================================================
