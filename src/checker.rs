//! Per-dependency update checking.
//!
//! The checker owns no state of its own; the registry client and cache
//! are passed in so callers decide their lifetimes and sharing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::analyzer::analyze_version_update;
use crate::cache::CacheManager;
use crate::config::DEFAULT_CACHE_TTL_MINUTES;
use crate::error::FetchError;
use crate::registry::PyPiClient;
use crate::types::{Dependency, VersionAnalysis};
use crate::version::{compare_versions, extract_version_number, resolve};

/// Tuning knobs for a check pass.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub ttl_minutes: u64,
    pub include_prerelease: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            include_prerelease: false,
        }
    }
}

/// Cooperative cancellation token shared across a check pass.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of checking one dependency.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyStatus {
    /// The installed constraint already points at the best version.
    UpToDate { current: String },
    /// A newer compatible version exists.
    UpdateAvailable {
        resolved: String,
        analysis: VersionAnalysis,
    },
    /// The registry knows the package but nothing satisfies the constraint.
    NoCompatibleVersion,
    /// The registry has never heard of the package.
    NotFound,
    /// The registry could not be reached or answered garbage.
    ConnectionFailed,
    /// The pass was cancelled before this dependency finished.
    Cancelled,
}

/// Check one dependency against the registry, preferring cached metadata.
pub async fn check_dependency(
    dependency: &Dependency,
    client: &PyPiClient,
    cache: &CacheManager,
    options: &CheckOptions,
    cancel: &CancelFlag,
) -> DependencyStatus {
    if cancel.is_cancelled() {
        return DependencyStatus::Cancelled;
    }

    let package = cache.get(&dependency.package_name, options.ttl_minutes);
    let package = match package {
        Some(hit) => {
            debug!(package = %dependency.package_name, "cache hit");
            hit
        }
        None => {
            if cancel.is_cancelled() {
                return DependencyStatus::Cancelled;
            }
            match client.fetch_versions(&dependency.package_name).await {
                Ok(fetched) => {
                    cache.set(&dependency.package_name, fetched.clone());
                    fetched
                }
                Err(FetchError::NotFound(_)) => return DependencyStatus::NotFound,
                Err(FetchError::Network(_) | FetchError::Parse(_)) => {
                    return DependencyStatus::ConnectionFailed;
                }
            }
        }
    };

    let resolved = resolve(
        &package.versions,
        &dependency.version_specifier,
        options.include_prerelease,
    );
    let Some(resolved) = resolved.version else {
        return DependencyStatus::NoCompatibleVersion;
    };

    let current = extract_version_number(&dependency.version_specifier);
    if current.is_empty() {
        // No pinned baseline to compare against; report the resolved
        // version as an upgrade from nothing.
        return DependencyStatus::UpdateAvailable {
            analysis: analyze_version_update("0.0.0", &resolved),
            resolved,
        };
    }

    if compare_versions(&current, &resolved) == std::cmp::Ordering::Less {
        DependencyStatus::UpdateAvailable {
            analysis: analyze_version_update(&current, &resolved),
            resolved,
        }
    } else {
        DependencyStatus::UpToDate { current }
    }
}
