//! Changelog synthesis, formats, contributor attribution and publishing.

pub mod compose;
pub mod contributors;
pub mod format;
pub mod publish;
pub mod template;

pub use compose::{
    ChangelogComposer, ChangelogResult, Credentials, GenerateRequest, GenerationReport,
    generate_changelog,
};
pub use contributors::{contributor_logins, contributors_list, contributors_section};
pub use format::{ChangelogFormat, OutputLanguage};
pub use publish::{CHANGELOG_PATH, PublishOutcome, publish_changelog, publish_commit_message};
pub use template::render_template;
