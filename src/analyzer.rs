//! Update magnitude classification.

use crate::types::{RiskLevel, UpdateType, VersionAnalysis};
use crate::version::parse_version;

/// Classify the jump from an installed version to a resolved one.
///
/// Only the first two numeric components decide the magnitude; patch
/// differences of any size stay low risk. Pre-release tags play no part
/// here.
pub fn analyze_version_update(current_version: &str, latest_version: &str) -> VersionAnalysis {
    let current = parse_version(current_version);
    let latest = parse_version(latest_version);

    let (update_type, is_breaking_change, risk_level) = if latest.parts[0] != current.parts[0] {
        (UpdateType::Major, true, RiskLevel::High)
    } else if latest.parts[1] != current.parts[1] {
        (UpdateType::Minor, false, RiskLevel::Medium)
    } else {
        (UpdateType::Patch, false, RiskLevel::Low)
    };

    VersionAnalysis {
        current_version: current_version.to_string(),
        latest_version: latest_version.to_string(),
        update_type,
        is_breaking_change,
        risk_level,
    }
}
