//! GitHub token discovery.
//!
//! Order:
//! 1. `gh auth token` (gh CLI)
//! 2. `GITHUB_TOKEN`
//! 3. `GH_TOKEN`

use std::env;
use std::process::Command;

use tracing::debug;

use crate::error::GitHubError;

const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Get a GitHub token from the gh CLI or the environment.
pub fn get_github_token() -> Result<String, GitHubError> {
    if let Some(token) = get_token_from_gh_cli() {
        debug!("Using GitHub token from gh CLI");
        return Ok(token);
    }

    token_from_env().ok_or(GitHubError::AuthenticationFailed)
}

/// First non-empty token among the supported environment variables.
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS.iter().find_map(|var| {
        env::var(var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn get_token_from_gh_cli() -> Option<String> {
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;

    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_github_token_preferred_over_gh_token() {
        temp_env::with_vars(
            [("GITHUB_TOKEN", Some("ghp_primary")), ("GH_TOKEN", Some("ghp_secondary"))],
            || assert_eq!(token_from_env().as_deref(), Some("ghp_primary")),
        );
    }

    #[test]
    #[serial]
    fn test_empty_github_token_is_skipped() {
        temp_env::with_vars(
            [("GITHUB_TOKEN", Some("")), ("GH_TOKEN", Some("ghp_secondary"))],
            || assert_eq!(token_from_env().as_deref(), Some("ghp_secondary")),
        );
    }

    #[test]
    #[serial]
    fn test_no_env_token() {
        temp_env::with_vars_unset(["GITHUB_TOKEN", "GH_TOKEN"], || {
            assert_eq!(token_from_env(), None);
        });
    }
}
