use std::fmt;

use serde::{Deserialize, Serialize};

/// Which part of the source document a dependency was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// One declaration per line (requirements.txt style).
    PlainRequirement,
    /// `project.dependencies` array in a structured manifest.
    Dependencies,
    /// `project.optional-dependencies` table in a structured manifest.
    OptionalDependencies,
}

/// A dependency as extracted from a document, with its exact source position.
///
/// Records are created fresh on every parse pass and never mutated;
/// `line`/columns index into the exact text the extractor was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Package name as written (matches `^[A-Za-z0-9][A-Za-z0-9._-]*$`).
    pub package_name: String,
    /// Raw constraint text, e.g. `>=2.28.0,<3` (may be empty).
    pub version_specifier: String,
    pub section: Section,
    /// Optional-dependency group name, when declared under one.
    pub extra: Option<String>,
    /// Structural keys leading to this record in a structured manifest.
    pub path: Vec<String>,
    /// 0-based row in the source text.
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

/// Release metadata fetched from the registry for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVersions {
    pub package_name: String,
    /// Version strings exactly as published.
    pub versions: Vec<String>,
    pub summary: Option<String>,
    /// Milliseconds since the UNIX epoch at fetch time.
    pub fetched_at: i64,
}

/// Outcome of resolving a constraint expression against a version list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    pub found: bool,
    pub version: Option<String>,
}

impl ResolveResult {
    pub fn some(version: String) -> Self {
        Self {
            found: true,
            version: Some(version),
        }
    }

    pub fn none() -> Self {
        Self {
            found: false,
            version: None,
        }
    }
}

/// Magnitude of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    Patch,
    Minor,
    Major,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateType::Patch => write!(f, "patch"),
            UpdateType::Minor => write!(f, "minor"),
            UpdateType::Major => write!(f, "major"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Classification of an available upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAnalysis {
    pub current_version: String,
    pub latest_version: String,
    pub update_type: UpdateType,
    pub is_breaking_change: bool,
    pub risk_level: RiskLevel,
}
