//! Version parsing, ordering and constraint resolution.
//!
//! Versions are reduced to a three-component numeric tuple plus a
//! pre-release flag. Invalid text degrades to an all-zero tuple rather
//! than failing; nothing in this module returns an error.

use std::cmp::Ordering;

use crate::types::ResolveResult;

/// A version reduced to its numeric prefix.
///
/// Ordering among pre-release labels of the same numeric version is not
/// defined: two pre-releases of `1.0.0` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVersion {
    pub parts: [u64; 3],
    pub has_prerelease: bool,
}

/// Constraint operator of a single `(operator, version)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `~=` (compatible release)
    Compatible,
    /// `^` (caret, poetry/pdm style)
    Caret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub version: String,
}

/// Parse a version string into a normalized numeric tuple.
///
/// Each dot segment contributes its leading digit run; up to three
/// segments are incorporated and shorter versions are right-padded with
/// zeros. Any alphabetic tag after the numeric prefix (`1.0.0-alpha`,
/// `2.1.0rc1`, `1.0.0.dev1`) marks a pre-release and stops incorporation.
pub fn parse_version(s: &str) -> ParsedVersion {
    let mut parts = [0u64; 3];
    let mut count = 0;
    let mut has_prerelease = false;

    for segment in s.trim().split('.') {
        let digit_end = segment
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(segment.len());

        if count < 3 && digit_end > 0 {
            parts[count] = segment[..digit_end].parse().unwrap_or(0);
            count += 1;
        }

        if digit_end < segment.len() {
            // A tag only counts as a pre-release marker after a numeric
            // prefix; text with no leading number degrades to [0,0,0]
            // without being flagged.
            if count > 0 && segment[digit_end..].chars().any(|c| c.is_ascii_alphabetic()) {
                has_prerelease = true;
            }
            break;
        }
    }

    ParsedVersion { parts, has_prerelease }
}

fn cmp_parsed(a: ParsedVersion, b: ParsedVersion) -> Ordering {
    match a.parts.cmp(&b.parts) {
        Ordering::Equal => match (a.has_prerelease, b.has_prerelease) {
            // A pre-release sorts before the final release of the same
            // numeric version.
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        },
        ord => ord,
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    cmp_parsed(parse_version(a), parse_version(b))
}

/// Parse a comma-separated constraint expression into its AND-ed pairs.
///
/// Unparseable parts are skipped, never raised. A bare version with no
/// operator is treated as a pin.
pub fn parse_constraints(expr: &str) -> Vec<Constraint> {
    const OPS: [(&str, ConstraintOp); 8] = [
        ("==", ConstraintOp::Eq),
        ("!=", ConstraintOp::Ne),
        (">=", ConstraintOp::Ge),
        ("<=", ConstraintOp::Le),
        ("~=", ConstraintOp::Compatible),
        ("^", ConstraintOp::Caret),
        (">", ConstraintOp::Gt),
        ("<", ConstraintOp::Lt),
    ];

    expr.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            for (token, op) in OPS {
                if let Some(rest) = part.strip_prefix(token) {
                    let version = rest.trim();
                    if version.is_empty() {
                        return None;
                    }
                    return Some(Constraint {
                        op,
                        version: version.to_string(),
                    });
                }
            }
            if part.starts_with(|c: char| c.is_ascii_digit()) {
                return Some(Constraint {
                    op: ConstraintOp::Eq,
                    version: part.to_string(),
                });
            }
            None
        })
        .collect()
}

/// Check whether a version satisfies every constraint in the set.
pub fn satisfies(version: &str, constraints: &[Constraint]) -> bool {
    let v = parse_version(version);

    constraints.iter().all(|constraint| {
        let c = parse_version(&constraint.version);
        match constraint.op {
            ConstraintOp::Eq => v.parts == c.parts,
            ConstraintOp::Ne => v.parts != c.parts,
            ConstraintOp::Ge => cmp_parsed(v, c) != Ordering::Less,
            ConstraintOp::Le => cmp_parsed(v, c) != Ordering::Greater,
            ConstraintOp::Gt => cmp_parsed(v, c) == Ordering::Greater,
            ConstraintOp::Lt => cmp_parsed(v, c) == Ordering::Less,
            // Compatible release: same major.minor, patch may move forward.
            ConstraintOp::Compatible => {
                v.parts[0] == c.parts[0] && v.parts[1] == c.parts[1] && v.parts[2] >= c.parts[2]
            }
            // Caret: same major, anything at or above the constraint.
            ConstraintOp::Caret => {
                v.parts[0] == c.parts[0] && cmp_parsed(v, c) != Ordering::Less
            }
        }
    })
}

/// Resolve the best published version satisfying a constraint expression.
///
/// Pre-releases are dropped unless `include_prerelease` is set, and even
/// then a stable release outranks a pre-release of the same or lower
/// numeric version.
pub fn resolve(
    available_versions: &[String],
    constraint_expr: &str,
    include_prerelease: bool,
) -> ResolveResult {
    let constraints = parse_constraints(constraint_expr);

    let mut survivors: Vec<&String> = available_versions
        .iter()
        .filter(|v| satisfies(v, &constraints))
        .filter(|v| include_prerelease || !parse_version(v).has_prerelease)
        .collect();

    survivors.sort_by(|a, b| compare_versions(b, a));

    match survivors.first() {
        Some(best) => ResolveResult::some((*best).clone()),
        None => ResolveResult::none(),
    }
}

/// Strip quotes, operators and whitespace from a specifier, leaving the
/// bare version number (`"  == 1.2.3 "` becomes `1.2.3`).
pub fn extract_version_number(specifier: &str) -> String {
    let trimmed = specifier.trim();
    let unquoted = trimmed.trim_matches(|c| c == '"' || c == '\'');
    let bare = unquoted.trim_start_matches(|c: char| "=<>!~^".contains(c));
    bare.trim().to_string()
}
