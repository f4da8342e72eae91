//! Commit records, conventional-commit parsing and categorization.

pub mod category;
pub mod parser;
pub mod raw;

pub use category::{Categorized, CommitCategory, categorize, categorize_by, category_of};
pub use parser::{ParsedCommit, parse_commit_message, parse_conventional_commits};
pub use raw::{CommitAuthor, RawCommit};
