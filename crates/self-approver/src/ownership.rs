//! Branch ownership
//!
//! The owner of a branch is whoever authored its oldest commit not on the
//! base. Later commits (merges from base, bot autofixes) do not change it.

use gh_client::GitHubClient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OwnershipError {
    /// Head has no commits that base lacks
    #[error("no commits between base and head")]
    NoCommits,

    /// The first diverging commit is not linked to a GitHub account
    #[error("first commit author is not a GitHub user")]
    UnknownAuthor { sha: String },

    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

/// Login of the author of the first commit on `head_sha` that is not on `base_sha`
pub async fn resolve_owner(
    client: &dyn GitHubClient,
    owner: &str,
    repo: &str,
    base_sha: &str,
    head_sha: &str,
) -> Result<String, OwnershipError> {
    let commits = client
        .compare_commits(owner, repo, base_sha, head_sha)
        .await?;

    let first = commits.into_iter().next().ok_or(OwnershipError::NoCommits)?;
    log::debug!(
        "First commit of {}...{} is {} by {:?}",
        base_sha,
        head_sha,
        first.sha,
        first.author_login
    );

    first
        .author_login
        .ok_or(OwnershipError::UnknownAuthor { sha: first.sha })
}
