//! Contributor attribution built from commit authors.
//!
//! Computed locally from the raw commits, never by the model, so a bad
//! completion cannot drop or invent a contributor.

use crate::commit::RawCommit;

use super::format::OutputLanguage;

/// Author logins, deduplicated, in order of first appearance.
pub fn contributor_logins(commits: &[RawCommit]) -> Vec<&str> {
    let mut logins: Vec<&str> = Vec::new();
    for login in commits.iter().filter_map(RawCommit::login) {
        if !logins.contains(&login) {
            logins.push(login);
        }
    }
    logins
}

/// One `  - [@login](https://github.com/login)` line per contributor.
pub fn contributors_list(commits: &[RawCommit]) -> String {
    contributor_logins(commits)
        .iter()
        .map(|login| format!("  - [@{0}](https://github.com/{0})", login))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `## <heading>` followed by the contributor list, or `None` when no commit
/// has a linked login.
pub fn contributors_section(commits: &[RawCommit], language: &OutputLanguage) -> Option<String> {
    let list = contributors_list(commits);
    if list.is_empty() {
        return None;
    }
    Some(format!("## {}\n{}", language.contributors_heading(), list))
}
