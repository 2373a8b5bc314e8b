//! Dependency extraction from Python project manifests.
//!
//! Two source shapes are supported: plain requirements files (one
//! declaration per line) and structured TOML manifests with a `project`
//! table. Extraction is pure text-in, records-out; no filesystem access
//! happens here.

mod pyproject;
mod requirements;

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Dependency;

pub use pyproject::extract_pyproject;
pub use requirements::extract_requirements;

/// Which extractor applies to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Requirements,
    PyProject,
}

/// Requirement declaration: package name, optional extras bracket,
/// then everything else (the constraint expression).
static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)(?:\[[^\]]*\])?\s*(.*)$").expect("valid regex")
});

/// Split a requirement string into `(name, constraint, constraint_offset)`.
///
/// The offset is the byte position of the constraint text within the
/// input, before trimming. Returns `None` when the text does not start
/// with a valid package name.
pub(crate) fn split_requirement(text: &str) -> Option<(&str, &str, usize)> {
    let caps = REQUIREMENT_RE.captures(text)?;
    let name = caps.get(1)?;
    let rest = caps.get(2)?;
    Some((name.as_str(), rest.as_str().trim(), rest.start()))
}

/// Decide which extractor applies, from the file name and content.
///
/// A basename like `requirements*.txt` wins outright; otherwise the
/// content must parse as TOML with a `project` table.
pub fn detect_file_kind(file_name: &str, content: &str) -> Option<FileKind> {
    let basename = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    if basename.starts_with("requirements") && basename.ends_with(".txt") {
        return Some(FileKind::Requirements);
    }

    if pyproject::has_project_table(content) {
        return Some(FileKind::PyProject);
    }

    None
}

/// Extract dependency records from a document of a known kind.
pub fn extract(kind: FileKind, content: &str) -> Vec<Dependency> {
    match kind {
        FileKind::Requirements => extract_requirements(content),
        FileKind::PyProject => extract_pyproject(content),
    }
}
