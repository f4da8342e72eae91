//! Deterministic semver calculation from conventional commits.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commit::{CommitCategory, ParsedCommit};

/// Type of version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    Patch,
    Minor,
    Major,
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BumpType::Patch => "patch",
            BumpType::Minor => "minor",
            BumpType::Major => "major",
        })
    }
}

/// Which path produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    /// Derived from conventional commit types.
    Conventional,
    /// Proposed by the completion provider.
    Ai,
    /// The completion path failed; derived from commit types instead.
    Fallback,
}

/// The next version and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSuggestion {
    pub version: Version,
    pub reason: String,
    pub source: SuggestionSource,
}

const REASON_BREAKING: &str = "Breaking changes detected";
const REASON_FEATURES: &str = "New features added";
const REASON_FIXES: &str = "Bug fixes";
const REASON_DEFAULT: &str = "Bug fixes and minor changes";

/// Largest accepted version component (2^53 - 1), so a bump always fits.
pub const MAX_VERSION_COMPONENT: u64 = (1 << 53) - 1;

/// Parse a user-supplied current version, tolerating a leading `v` or `=`.
///
/// Anything unparseable, or with a component above
/// [`MAX_VERSION_COMPONENT`], is treated as `0.0.0`.
pub fn parse_current_version(current: Option<&str>) -> Version {
    let Some(raw) = current.map(str::trim).filter(|s| !s.is_empty()) else {
        return Version::new(0, 0, 0);
    };

    let stripped = raw.trim_start_matches(['v', 'V', '=']).trim();
    match Version::parse(stripped) {
        Ok(version)
            if [version.major, version.minor, version.patch]
                .iter()
                .all(|n| *n <= MAX_VERSION_COMPONENT) =>
        {
            version
        }
        Ok(_) => {
            debug!(version = raw, "Ignoring out-of-range current version");
            Version::new(0, 0, 0)
        }
        Err(e) => {
            debug!(version = raw, error = %e, "Ignoring invalid current version");
            Version::new(0, 0, 0)
        }
    }
}

/// Determine the bump type from a list of commits.
pub fn determine_bump_type(commits: &[ParsedCommit]) -> BumpType {
    if commits.iter().any(|c| c.is_breaking) {
        BumpType::Major
    } else if commits
        .iter()
        .any(|c| c.category_type() == Some(CommitCategory::Feat))
    {
        BumpType::Minor
    } else {
        BumpType::Patch
    }
}

/// Apply a bump. Pre-release and build metadata are dropped.
///
/// Components saturate at `u64::MAX`; [`parse_current_version`] keeps
/// inputs far below that.
pub fn apply_bump(base: &Version, bump: BumpType) -> Version {
    match bump {
        BumpType::Major => Version::new(base.major.saturating_add(1), 0, 0),
        BumpType::Minor => Version::new(base.major, base.minor.saturating_add(1), 0),
        BumpType::Patch => Version::new(base.major, base.minor, base.patch.saturating_add(1)),
    }
}

fn reason_for(commits: &[ParsedCommit], bump: BumpType) -> &'static str {
    match bump {
        BumpType::Major => REASON_BREAKING,
        BumpType::Minor => REASON_FEATURES,
        BumpType::Patch
            if commits
                .iter()
                .any(|c| c.category_type() == Some(CommitCategory::Fix)) =>
        {
            REASON_FIXES
        }
        BumpType::Patch => REASON_DEFAULT,
    }
}

/// Suggest the next version from commit types alone. Never fails.
///
/// - any breaking change: major
/// - any `feat`: minor
/// - otherwise: patch
pub fn suggest_next_version(current: Option<&str>, commits: &[ParsedCommit]) -> VersionSuggestion {
    let base = parse_current_version(current);
    let bump = determine_bump_type(commits);

    VersionSuggestion {
        version: apply_bump(&base, bump),
        reason: reason_for(commits, bump).to_string(),
        source: SuggestionSource::Conventional,
    }
}
