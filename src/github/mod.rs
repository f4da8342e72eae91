//! GitHub API operations using octocrab.

pub mod auth;
pub mod history;
pub mod remote;

pub use auth::get_github_token;
pub use history::GitHubHistory;
pub use remote::parse_github_remote;
