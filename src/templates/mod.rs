//! Pull-request template catalog and change classification.
//!
//! The catalog is a static, read-only list of change-type categories,
//! each carrying matching rules (path globs and diff keywords), a
//! weight, and the template body itself. Declaration order doubles as
//! tie-break priority, with the general-purpose feature template
//! serving as the fallback when nothing matches.

use serde::{Deserialize, Serialize};

pub mod classify;

pub use classify::{classify, Suggestion};

/// One entry in the template catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    /// Template file name, e.g. `"bug.md"`.
    pub name: &'static str,

    /// Human-readable change-type label.
    pub label: &'static str,

    /// Glob patterns; a changed path matching any of them is evidence
    /// for this template.
    pub path_globs: &'static [&'static str],

    /// Lowercase keywords; each one present in the diff text is
    /// evidence for this template.
    pub keywords: &'static [&'static str],

    /// Score contributed per matched rule.
    pub weight: u32,

    /// The template markdown itself.
    pub body: &'static str,
}

/// The full catalog, in tie-break priority order.
static CATALOG: [CatalogEntry; 7] = [
    CatalogEntry {
        name: "bug.md",
        label: "Bug Fix",
        path_globs: &[],
        keywords: &["fix", "bug", "crash", "regression", "panic"],
        weight: 2,
        body: include_str!("../../templates/bug.md"),
    },
    CatalogEntry {
        name: "feature.md",
        label: "Feature",
        path_globs: &[],
        keywords: &["feature", "implement", "support for"],
        weight: 1,
        body: include_str!("../../templates/feature.md"),
    },
    CatalogEntry {
        name: "docs.md",
        label: "Documentation",
        path_globs: &["docs/**", "**/*.md", "*.md"],
        keywords: &["readme", "documentation", "typo"],
        weight: 2,
        body: include_str!("../../templates/docs.md"),
    },
    CatalogEntry {
        name: "refactor.md",
        label: "Refactor",
        path_globs: &[],
        keywords: &["refactor", "rename", "cleanup", "extract", "simplify"],
        weight: 2,
        body: include_str!("../../templates/refactor.md"),
    },
    CatalogEntry {
        name: "test.md",
        label: "Test",
        path_globs: &["tests/**", "**/tests/**", "**/*_test.*", "**/test_*.*"],
        keywords: &["coverage", "assert", "test case"],
        weight: 2,
        body: include_str!("../../templates/test.md"),
    },
    CatalogEntry {
        name: "performance.md",
        label: "Performance",
        path_globs: &["benches/**"],
        keywords: &["performance", "optimize", "benchmark", "latency", "allocation"],
        weight: 2,
        body: include_str!("../../templates/performance.md"),
    },
    CatalogEntry {
        name: "security.md",
        label: "Security",
        path_globs: &["security/**", "**/auth/**", "**/*crypto*"],
        keywords: &["cve", "vulnerability", "security", "sanitize", "injection", "secret"],
        weight: 3,
        body: include_str!("../../templates/security.md"),
    },
];

/// Template recommended when no rule matches at all.
pub const FALLBACK_TEMPLATE: &str = "feature.md";

/// The static template catalog, in declaration (priority) order.
pub fn catalog() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Looks up a catalog entry by template file name.
pub fn entry(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.name == name)
}

/// The fallback entry; always present in the catalog.
pub fn fallback() -> &'static CatalogEntry {
    entry(FALLBACK_TEMPLATE).unwrap_or(&CATALOG[0])
}

/// Maps a caller-stated change type ("bug", "fix", "docs", ...) to a
/// template, falling back to the general feature template for
/// unrecognized types.
pub fn suggest_for_change_type(change_type: &str) -> &'static CatalogEntry {
    let name = match change_type.to_ascii_lowercase().as_str() {
        "bug" | "fix" => "bug.md",
        "feature" | "enhancement" => "feature.md",
        "docs" | "documentation" => "docs.md",
        "refactor" | "cleanup" => "refactor.md",
        "test" | "testing" => "test.md",
        "performance" | "optimization" => "performance.md",
        "security" => "security.md",
        _ => FALLBACK_TEMPLATE,
    };
    entry(name).unwrap_or_else(fallback)
}

/// Catalog entry projection for the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateView {
    pub filename: String,
    pub r#type: String,
    pub content: String,
}

impl From<&CatalogEntry> for TemplateView {
    fn from(entry: &CatalogEntry) -> TemplateView {
        TemplateView {
            filename: entry.name.to_string(),
            r#type: entry.label.to_string(),
            content: entry.body.to_string(),
        }
    }
}
