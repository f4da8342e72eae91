//! Tag enumeration.

use git2::Repository;
use tracing::{debug, warn};

use crate::error::GitError;
use crate::history::Tag;

/// All tags, each resolved to the commit it points at.
///
/// Annotated tags are peeled to their target commit. Tags that do not point
/// at a commit (e.g. a tagged tree) are skipped.
pub fn list_tags(repo: &Repository) -> Result<Vec<Tag>, GitError> {
    let mut tags = Vec::new();

    repo.tag_foreach(|oid, name_bytes| {
        let Ok(full_name) = std::str::from_utf8(name_bytes) else {
            warn!("Skipping tag with OID {} - name is not valid UTF-8", oid);
            return true;
        };
        let name = full_name.strip_prefix("refs/tags/").unwrap_or(full_name);

        match repo
            .find_object(oid, None)
            .and_then(|object| object.peel_to_commit())
        {
            Ok(commit) => tags.push(Tag {
                name: name.to_string(),
                sha: commit.id().to_string(),
            }),
            Err(e) => debug!(tag = %name, error = %e, "Tag does not point at a commit"),
        }
        true
    })
    .map_err(GitError::RevwalkError)?;

    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tags)
}
