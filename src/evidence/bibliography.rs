//! Bibliography file handling.
//!
//! Entries are `@type{key, ...}` blocks keyed by citation key. Parsing is
//! deliberately shallow: the import pipeline only needs the key of each block
//! and the block text itself.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// Conventional bibliography filename within the manuscript directory
pub const BIBLIOGRAPHY_FILE: &str = "literature_citations.bib";

/// Split bibliography content into `(citation_key, entry_text)` blocks.
pub fn parse_entries(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_entry = false;

    for line in content.lines() {
        if line.starts_with('@') {
            if let Some(entry) = finish_entry(&current) {
                entries.push(entry);
            }
            current = vec![line];
            in_entry = true;
        } else if in_entry {
            current.push(line);
            if line.trim() == "}" {
                if let Some(entry) = finish_entry(&current) {
                    entries.push(entry);
                }
                current.clear();
                in_entry = false;
            }
        }
    }
    if let Some(entry) = finish_entry(&current) {
        entries.push(entry);
    }

    entries
}

fn finish_entry(lines: &[&str]) -> Option<(String, String)> {
    let first = lines.first()?;
    let key = first.split('{').nth(1)?.split(',').next()?.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), lines.join("\n")))
}

/// All citation keys defined in bibliography content.
pub fn extract_keys(content: &str) -> BTreeSet<String> {
    match Regex::new(r"@\w+\{([^,]+),") {
        Ok(re) => re
            .captures_iter(content)
            .map(|caps| caps[1].trim().to_string())
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

/// Citation keys defined in a bibliography file.
pub fn load_keys(path: &Path) -> Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bibliography {}", path.display()))?;
    Ok(extract_keys(&content))
}

/// Keep only the entries whose key is in `keys`.
pub fn filter_content(content: &str, keys: &BTreeSet<String>) -> String {
    let kept: Vec<String> = parse_entries(content)
        .into_iter()
        .filter(|(key, _)| keys.contains(key))
        .map(|(_, entry)| entry)
        .collect();
    kept.join("\n\n")
}

/// Copy a bibliography from `source` to `target`, retaining only `keys`.
pub fn filter_file(source: &Path, target: &Path, keys: &BTreeSet<String>) -> Result<()> {
    let content = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read bibliography {}", source.display()))?;
    std::fs::write(target, filter_content(&content, keys))
        .with_context(|| format!("Failed to write bibliography {}", target.display()))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
