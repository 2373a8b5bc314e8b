//! Version intelligence for Python dependency declarations.
//!
//! Extracts dependencies (with exact source positions) from plain
//! requirements files and `pyproject.toml`, fetches published versions
//! from a PyPI-compatible registry through a bounded, fair request
//! gate, caches the results with a TTL and a debounced snapshot, and
//! classifies available updates by magnitude and risk.

pub mod analyzer;
pub mod cache;
pub mod checker;
pub mod config;
pub mod error;
pub mod parser;
pub mod registry;
pub mod types;
pub mod version;

pub use analyzer::analyze_version_update;
pub use cache::{CacheManager, JsonFileStore, SnapshotStore};
pub use checker::{CancelFlag, CheckOptions, DependencyStatus, check_dependency};
pub use error::{CacheError, FetchError};
pub use parser::{FileKind, detect_file_kind, extract};
pub use registry::PyPiClient;
pub use types::{Dependency, PackageVersions, ResolveResult, Section, VersionAnalysis};
pub use version::{Constraint, ConstraintOp, compare_versions, parse_version, resolve, satisfies};
