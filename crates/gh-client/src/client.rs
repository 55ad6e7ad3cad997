//! GitHub client trait
//!
//! This module defines the core `GitHubClient` trait that all client
//! implementations must satisfy. Every call goes to the platform: nothing is
//! cached, so branch protection and review changes are observed on the very
//! next event.

use crate::types::{
    Branch, CheckRun, CheckRunUpdate, CheckStatus, Commit, ProtectionPolicy, PullRequest, Review,
    ReviewEvent,
};
use async_trait::async_trait;

/// GitHub API client trait
///
/// Defines the read and write surface the approval engine needs.
/// Implementations can hit the API directly or be in-memory fakes for tests.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow sharing across
/// webhook request tasks.
///
/// # Example
///
/// ```rust,ignore
/// use gh_client::GitHubClient;
///
/// async fn is_protected(client: &dyn GitHubClient) -> anyhow::Result<bool> {
///     Ok(client.fetch_branch("heitorpolidoro", "self-approver", "master").await?.protected)
/// }
/// ```
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetch a branch by name
    async fn fetch_branch(&self, owner: &str, repo: &str, branch: &str) -> anyhow::Result<Branch>;

    /// Fetch the pull request review rules of a protected branch
    ///
    /// Returns `Ok(None)` when the branch has no protection or the protection
    /// has no pull request review rule.
    async fn fetch_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> anyhow::Result<Option<ProtectionPolicy>>;

    /// Commits reachable from `head` but not from `base`, oldest first
    ///
    /// Only the first page of the comparison is returned, which always holds
    /// the oldest commits.
    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> anyhow::Result<Vec<Commit>>;

    /// Fetch a single pull request by number
    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest>;

    /// Pull requests whose head is the given commit
    async fn fetch_pull_requests_for_commit(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<PullRequest>>;

    /// Reviews of a pull request in chronological order
    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>>;

    /// Create a review on a pull request
    ///
    /// # Arguments
    ///
    /// * `owner` - Repository owner
    /// * `repo` - Repository name
    /// * `pr_number` - Pull request number
    /// * `event` - Review event
    /// * `body` - Optional review comment body
    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Fetch CI check runs for a specific commit, in platform order
    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>>;

    /// Fetch combined commit status
    ///
    /// This uses the legacy Status API which some CI systems still use
    /// (as opposed to the newer Checks API).
    async fn fetch_commit_status(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<CheckStatus>;

    /// Create a check run on a commit
    async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        head_sha: &str,
        update: &CheckRunUpdate,
    ) -> anyhow::Result<CheckRun>;

    /// Edit an existing check run
    async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> anyhow::Result<CheckRun>;
}
