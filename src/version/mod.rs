//! Next-version inference.

pub mod bump;
pub mod llm_bump;

pub use bump::{
    BumpType, MAX_VERSION_COMPONENT, SuggestionSource, VersionSuggestion, apply_bump,
    determine_bump_type, parse_current_version, suggest_next_version,
};
pub use llm_bump::{suggest_version, suggest_version_with_provider};
