//! gitlog - turns version-control commits into human-readable changelogs.
//!
//! # Overview
//!
//! Commits are parsed as conventional commits and grouped by category.
//! Commits without a type are checked for quality, and vague ones
//! are rewritten from their diffs before a single completion call writes the
//! changelog. Next-version suggestions are deterministic, with a completion
//! fallback for histories that use no conventional types at all.
//!
//! History comes from a [`history::HistoryProvider`] (GitHub or a local
//! clone) and text from a [`llm::CompletionProvider`] (any
//! OpenAI-compatible chat-completions endpoint).

pub mod cache;
pub mod changelog;
pub mod commit;
pub mod config;
pub mod enrich;
pub mod error;
pub mod git;
pub mod github;
pub mod history;
pub mod llm;
pub mod version;

// Re-export commonly used types
pub use cache::{Fingerprint, GenerationCache};
pub use changelog::{
    ChangelogComposer, ChangelogFormat, ChangelogResult, GenerateRequest, OutputLanguage,
    generate_changelog, publish_changelog,
};
pub use commit::{CommitCategory, ParsedCommit, RawCommit, parse_conventional_commits};
pub use config::Settings;
pub use error::{CompletionError, GenerateError, GitError, GitHubError, HistoryError, InputError};
pub use history::{HistoryProvider, RepoId};
pub use llm::{CompletionProvider, ProviderConfig};
pub use version::{BumpType, VersionSuggestion, suggest_next_version, suggest_version};
