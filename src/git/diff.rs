//! Per-commit patches from a local repository.

use git2::{Oid, Patch, Repository};
use tracing::warn;

use crate::error::GitError;
use crate::history::render_file_diff;

/// Render a commit's changes against its first parent as `File:` blocks.
///
/// Root commits are diffed against the empty tree. Binary files render the
/// no-patch placeholder.
pub fn commit_diff(repo: &Repository, sha: &str) -> Result<String, GitError> {
    let oid = Oid::from_str(sha)
        .map_err(|e| GitError::ReferenceNotFound(sha.to_string(), e))?;
    let commit = repo
        .find_commit(oid)
        .map_err(|e| GitError::ReferenceNotFound(sha.to_string(), e))?;

    let tree = commit.tree().map_err(GitError::DiffFailed)?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree().map_err(GitError::DiffFailed)?),
        Err(_) => None,
    };

    let diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
        .map_err(GitError::DiffFailed)?;

    let mut blocks = Vec::new();
    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        let name = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let patch = if delta.flags().is_binary() {
            None
        } else {
            Patch::from_diff(&diff, idx)
                .map_err(GitError::DiffFailed)?
                .and_then(|mut p| hunks_text(&mut p, &name))
        };

        blocks.push(render_file_diff(&name, patch.as_deref()));
    }

    Ok(blocks.join("\n\n"))
}

/// Hunk headers and lines of one file's patch, without the `diff --git` preamble.
fn hunks_text(patch: &mut Patch<'_>, name: &str) -> Option<String> {
    let mut text = String::new();

    let printed = patch.print(&mut |_delta, _hunk, line| {
        let content = String::from_utf8_lossy(line.content());
        match line.origin() {
            '+' | '-' | ' ' => {
                text.push(line.origin());
                text.push_str(&content);
            }
            'H' => text.push_str(&content),
            _ => {}
        }
        true
    });

    if let Err(e) = printed {
        warn!("Failed to render patch for {}: {}", name, e);
        return None;
    }

    let text = text.trim_end().to_string();
    (!text.is_empty()).then_some(text)
}
