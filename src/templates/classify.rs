//! Diff classifier: ranks catalog templates against a change.
//!
//! Pure scoring over the static catalog: each changed path matching one
//! of an entry's globs, and each of its keywords present in the diff
//! text, contributes that entry's weight. Output is sorted by score
//! descending with ties broken by catalog declaration order, and is
//! never empty — an unmatched change yields the fallback template at
//! confidence zero.

use glob::Pattern;
use serde::Serialize;

use super::{catalog, fallback, CatalogEntry};

/// One ranked template suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Template file name, e.g. `"security.md"`.
    pub template: String,

    /// Human-readable change-type label.
    pub label: String,

    /// Share of the total matched evidence, in `(0, 1]`; exactly `0`
    /// only for the fallback suggestion.
    pub confidence: f64,
}

/// Ranks all matching templates for a set of changed paths and diff text.
///
/// Always returns at least one suggestion.
pub fn classify(changed_paths: &[String], diff_text: &str) -> Vec<Suggestion> {
    let diff_lower = diff_text.to_ascii_lowercase();

    let scores: Vec<(&'static CatalogEntry, u32)> = catalog()
        .iter()
        .map(|entry| (entry, score(entry, changed_paths, &diff_lower)))
        .filter(|(_, score)| *score > 0)
        .collect();

    if scores.is_empty() {
        let entry = fallback();
        return vec![Suggestion {
            template: entry.name.to_string(),
            label: entry.label.to_string(),
            confidence: 0.0,
        }];
    }

    let total: u32 = scores.iter().map(|(_, s)| s).sum();

    // Stable sort keeps catalog declaration order on equal scores.
    let mut ranked = scores;
    ranked.sort_by(|(_, a), (_, b)| b.cmp(a));

    ranked
        .into_iter()
        .map(|(entry, score)| Suggestion {
            template: entry.name.to_string(),
            label: entry.label.to_string(),
            confidence: f64::from(score) / f64::from(total),
        })
        .collect()
}

/// Weighted evidence for one catalog entry.
fn score(entry: &CatalogEntry, changed_paths: &[String], diff_lower: &str) -> u32 {
    let path_hits = changed_paths
        .iter()
        .filter(|path| matches_any_glob(entry.path_globs, path))
        .count() as u32;

    let keyword_hits = entry
        .keywords
        .iter()
        .filter(|keyword| diff_lower.contains(*keyword))
        .count() as u32;

    (path_hits + keyword_hits) * entry.weight
}

/// Invalid patterns never match (fail-closed, not fail-open).
fn matches_any_glob(globs: &[&str], path: &str) -> bool {
    globs.iter().any(|g| match Pattern::new(g) {
        Ok(pattern) => pattern.matches(path),
        Err(_) => false,
    })
}
