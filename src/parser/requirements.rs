//! Extraction from plain requirements files.

use crate::types::{Dependency, Section};

use super::split_requirement;

/// Extract one dependency record per declaration line.
///
/// Lines are indexed from zero. Comment lines, blank lines and pip
/// directives (`-r`, `--index-url`, ...) produce no record. Environment
/// markers and inline comments are cut off before the constraint is read.
pub fn extract_requirements(content: &str) -> Vec<Dependency> {
    content
        .lines()
        .enumerate()
        .filter_map(|(line_idx, raw_line)| parse_line(raw_line, line_idx))
        .collect()
}

fn parse_line(raw_line: &str, line_idx: usize) -> Option<Dependency> {
    let trimmed = raw_line.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
        return None;
    }

    // Environment marker, then inline comment.
    let without_marker = match trimmed.find(';') {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    };
    let declaration = match without_marker.find('#') {
        Some(idx) => without_marker[..idx].trim_end(),
        None => without_marker,
    };

    if declaration.is_empty() {
        return None;
    }

    let (name, constraint, constraint_offset) = split_requirement(declaration)?;

    let indent = raw_line.len() - raw_line.trim_start().len();
    let start_column = if constraint.is_empty() {
        indent + declaration.len()
    } else {
        indent + constraint_offset
    };

    Some(Dependency {
        package_name: name.to_string(),
        version_specifier: constraint.to_string(),
        section: Section::PlainRequirement,
        extra: None,
        path: Vec::new(),
        line: line_idx,
        start_column,
        end_column: raw_line.len(),
    })
}
