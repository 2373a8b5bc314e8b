//! Extraction from structured TOML manifests.
//!
//! The TOML value tree carries no source positions, so each requirement
//! string is located again by scanning the raw text for the quoted
//! literal inside the right table. A record whose line cannot be
//! recovered is dropped rather than emitted with a bogus position.

use std::sync::LazyLock;

use regex::Regex;
use toml::Value;
use tracing::warn;

use crate::types::{Dependency, Section};

use super::split_requirement;

/// `key = [...]` inside the optional-dependencies table.
static GROUP_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9._-]+)\s*=").expect("valid regex"));

/// Whether the content is TOML with a `project` table.
pub(crate) fn has_project_table(content: &str) -> bool {
    matches!(
        toml::from_str::<Value>(content),
        Ok(value) if value.get("project").is_some_and(Value::is_table)
    )
}

/// Extract dependency records from `project.dependencies` and
/// `project.optional-dependencies`.
pub fn extract_pyproject(content: &str) -> Vec<Dependency> {
    let Ok(root) = toml::from_str::<Value>(content) else {
        return Vec::new();
    };
    let Some(project) = root.get("project") else {
        return Vec::new();
    };

    let lines: Vec<&str> = content.lines().collect();
    let mut deps = Vec::new();

    if let Some(requirements) = project.get("dependencies").and_then(Value::as_array) {
        for requirement in requirements.iter().filter_map(Value::as_str) {
            if let Some(dep) =
                build_dependency(&lines, requirement, SectionTarget::Dependencies)
            {
                deps.push(dep);
            }
        }
    }

    if let Some(groups) = project
        .get("optional-dependencies")
        .and_then(Value::as_table)
    {
        for (group, requirements) in groups {
            let Some(requirements) = requirements.as_array() else {
                continue;
            };
            for requirement in requirements.iter().filter_map(Value::as_str) {
                if let Some(dep) =
                    build_dependency(&lines, requirement, SectionTarget::OptionalGroup(group))
                {
                    deps.push(dep);
                }
            }
        }
    }

    deps
}

#[derive(Clone, Copy)]
enum SectionTarget<'a> {
    Dependencies,
    OptionalGroup(&'a str),
}

fn build_dependency(
    lines: &[&str],
    requirement: &str,
    target: SectionTarget<'_>,
) -> Option<Dependency> {
    let (name, constraint, _) = split_requirement(requirement)?;

    let Some(line_idx) = find_requirement_line(lines, requirement, target) else {
        warn!(requirement, "could not locate requirement in source text");
        return None;
    };
    let line = lines[line_idx];

    let (section, extra, path) = match target {
        SectionTarget::Dependencies => (
            Section::Dependencies,
            None,
            vec![
                "project".to_string(),
                "dependencies".to_string(),
                name.to_string(),
            ],
        ),
        SectionTarget::OptionalGroup(group) => (
            Section::OptionalDependencies,
            Some(group.to_string()),
            vec![
                "project".to_string(),
                "optional-dependencies".to_string(),
                group.to_string(),
                name.to_string(),
            ],
        ),
    };

    Some(Dependency {
        package_name: name.to_string(),
        version_specifier: constraint.to_string(),
        section,
        extra,
        path,
        line: line_idx,
        start_column: line.find(name).unwrap_or(0),
        end_column: line.len(),
    })
}

/// Recover the source line holding a requirement string.
///
/// Tracks the current `[header]` and, inside the optional-dependencies
/// table, the current group key, then looks for the quoted literal. If
/// no line in the right table matches, falls back to the first quoted
/// occurrence anywhere.
fn find_requirement_line(
    lines: &[&str],
    requirement: &str,
    target: SectionTarget<'_>,
) -> Option<usize> {
    let double_quoted = format!("\"{requirement}\"");
    let single_quoted = format!("'{requirement}'");

    let mut section = String::new();
    let mut group: Option<String> = None;
    let mut fallback = None;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            section = trimmed.trim_matches(['[', ']']).trim().to_string();
            if !section.contains("optional-dependencies") {
                group = None;
            }
            continue;
        }

        if section == "project.optional-dependencies" {
            if let Some(caps) = GROUP_KEY_RE.captures(trimmed) {
                group = Some(caps[1].to_string());
            }
        }

        if !line.contains(&double_quoted) && !line.contains(&single_quoted) {
            continue;
        }

        if fallback.is_none() {
            fallback = Some(idx);
        }

        let accepted = match target {
            SectionTarget::Dependencies => {
                section == "project" || section == "project.dependencies"
            }
            SectionTarget::OptionalGroup(extra) => {
                section == format!("project.optional-dependencies.{extra}")
                    || (section == "project.optional-dependencies"
                        && group.as_deref() == Some(extra))
            }
        };
        if accepted {
            return Some(idx);
        }
    }

    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[project]
name = "demo"
version = "0.1.0"
dependencies = [
    "requests>=2.28.0",
    "click",
]

[project.optional-dependencies]
dev = ["pytest>=7.0", "black==23.1.0"]
docs = [
    "sphinx~=6.1",
]

[tool.black]
line-length = 88
"#;

    #[test]
    fn extracts_main_dependencies_with_positions() {
        let deps = extract_pyproject(MANIFEST);
        let requests = deps.iter().find(|d| d.package_name == "requests").unwrap();

        assert_eq!(requests.version_specifier, ">=2.28.0");
        assert_eq!(requests.section, Section::Dependencies);
        assert_eq!(requests.extra, None);
        assert_eq!(requests.line, 4);
        assert_eq!(requests.start_column, 5);
        assert_eq!(requests.end_column, "    \"requests>=2.28.0\",".len());
        assert_eq!(
            requests.path,
            vec!["project", "dependencies", "requests"]
        );
    }

    #[test]
    fn extracts_bare_names_with_empty_specifier() {
        let deps = extract_pyproject(MANIFEST);
        let click = deps.iter().find(|d| d.package_name == "click").unwrap();

        assert_eq!(click.version_specifier, "");
        assert_eq!(click.line, 5);
    }

    #[test]
    fn extracts_optional_groups_with_extra_names() {
        let deps = extract_pyproject(MANIFEST);

        let pytest = deps.iter().find(|d| d.package_name == "pytest").unwrap();
        assert_eq!(pytest.section, Section::OptionalDependencies);
        assert_eq!(pytest.extra.as_deref(), Some("dev"));
        assert_eq!(pytest.line, 9);
        assert_eq!(
            pytest.path,
            vec!["project", "optional-dependencies", "dev", "pytest"]
        );

        let sphinx = deps.iter().find(|d| d.package_name == "sphinx").unwrap();
        assert_eq!(sphinx.extra.as_deref(), Some("docs"));
        assert_eq!(sphinx.line, 11);
    }

    #[test]
    fn duplicate_literals_resolve_to_the_right_group() {
        let manifest = r#"[project]
name = "demo"
dependencies = []

[project.optional-dependencies]
dev = ["pytest>=7.0"]
test = ["pytest>=7.0"]
"#;
        let deps = extract_pyproject(manifest);
        assert_eq!(deps.len(), 2);

        let dev = deps.iter().find(|d| d.extra.as_deref() == Some("dev")).unwrap();
        let test = deps
            .iter()
            .find(|d| d.extra.as_deref() == Some("test"))
            .unwrap();
        assert_eq!(dev.line, 5);
        assert_eq!(test.line, 6);
    }

    #[test]
    fn dotted_group_headers_are_recognized() {
        let manifest = r#"[project]
name = "demo"

[project.optional-dependencies.dev]
"#;
        // Dotted sub-tables of optional-dependencies are not arrays, so
        // nothing is extracted, but the header must not poison scanning.
        assert!(extract_pyproject(manifest).is_empty());
    }

    #[test]
    fn invalid_toml_and_missing_table_yield_nothing() {
        assert!(extract_pyproject("not = valid = toml").is_empty());
        assert!(extract_pyproject("[tool.black]\nline-length = 88\n").is_empty());
        assert!(!has_project_table("[tool.black]\nline-length = 88\n"));
        assert!(has_project_table("[project]\nname = \"x\"\n"));
    }

    #[test]
    fn non_string_array_entries_are_skipped() {
        let manifest = r#"[project]
name = "demo"
dependencies = ["requests>=2.28.0", 42]
"#;
        let deps = extract_pyproject(manifest);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].package_name, "requests");
    }
}
