//! Octocrab-based GitHub API client
//!
//! Direct implementation of the `GitHubClient` trait using the octocrab library.
//! This client makes real API calls without any caching. Typed octocrab
//! handlers are used wherever octocrab has one; raw `get`/`post` requests are
//! left for branches, branch protection, review creation and combined status.

use crate::client::GitHubClient;
use crate::types::{
    Branch, CheckConclusion, CheckRun, CheckRunOutput, CheckRunStatus, CheckRunUpdate, CheckState,
    CheckStatus, Commit, CommitStatus, ProtectionPolicy, PullRequest, PullRequestState, Review,
    ReviewEvent, ReviewState,
};
use async_trait::async_trait;
use log::debug;
use octocrab::commits::PullRequestTarget;
use octocrab::params::checks as check_params;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PER_PAGE: u8 = 100;

/// Direct GitHub API client using octocrab
///
/// The octocrab instance decides who the calls are made as. The service
/// builds one per GitHub App installation through `ClientManager`.
#[derive(Debug, Clone)]
pub struct OctocrabClient {
    octocrab: Arc<Octocrab>,
}

impl OctocrabClient {
    /// Create a new client with the given octocrab instance
    pub fn new(octocrab: Arc<Octocrab>) -> Self {
        Self { octocrab }
    }
}

#[derive(Debug, Deserialize)]
struct ProtectionResponse {
    required_pull_request_reviews: Option<ReviewRules>,
}

#[derive(Debug, Deserialize)]
struct ReviewRules {
    #[serde(default)]
    require_code_owner_reviews: bool,
    #[serde(default)]
    required_approving_review_count: u32,
}

#[derive(Debug, Serialize)]
struct NewReview<'a> {
    event: ReviewEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn fetch_branch(&self, owner: &str, repo: &str, branch: &str) -> anyhow::Result<Branch> {
        debug!("Fetching branch {}/{}:{}", owner, repo, branch);

        // octocrab only lists branches, there is no typed single-branch route
        let route = format!("/repos/{}/{}/branches/{}", owner, repo, branch);
        let branch: octocrab::models::repos::Branch =
            self.octocrab.get(route, None::<&()>).await?;

        Ok(Branch {
            name: branch.name,
            head_sha: branch.commit.sha,
            protected: branch.protected,
        })
    }

    async fn fetch_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> anyhow::Result<Option<ProtectionPolicy>> {
        debug!("Fetching protection of {}/{}:{}", owner, repo, branch);

        let route = format!("/repos/{}/{}/branches/{}/protection", owner, repo, branch);
        let response: ProtectionResponse = match self.octocrab.get(route, None::<&()>).await {
            Ok(response) => response,
            // GitHub answers 404 "Branch not protected"
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                debug!("Branch {} has no protection", branch);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(response
            .required_pull_request_reviews
            .map(|rules| ProtectionPolicy {
                require_code_owner_reviews: rules.require_code_owner_reviews,
                required_approving_review_count: rules.required_approving_review_count,
            }))
    }

    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> anyhow::Result<Vec<Commit>> {
        debug!("Comparing {}/{} {}...{}", owner, repo, base, head);

        let comparison = self
            .octocrab
            .commits(owner, repo)
            .compare(base, head)
            .send()
            .await?;

        Ok(comparison
            .commits
            .into_iter()
            .map(|c| Commit {
                sha: c.sha,
                author_login: c.author.map(|a| a.login),
            })
            .collect())
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest> {
        debug!("Fetching PR #{} in {}/{}", pr_number, owner, repo);

        let pr = self.octocrab.pulls(owner, repo).get(pr_number).await?;

        Ok(convert_pull_request(&pr))
    }

    async fn fetch_pull_requests_for_commit(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<PullRequest>> {
        debug!("Fetching PRs for {}/{} @ {}", owner, repo, commit_sha);

        let commits = self.octocrab.commits(owner, repo);
        let mut prs = Vec::new();
        let mut page_num = 1u32;

        loop {
            let page = commits
                .associated_pull_requests(PullRequestTarget::Sha(commit_sha.to_string()))
                .per_page(PER_PAGE)
                .page(page_num)
                .send()
                .await?;
            let has_next = page.next.is_some();

            prs.extend(page.items.iter().map(convert_pull_request));

            if !has_next {
                break;
            }
            page_num += 1;
        }

        debug!("Found {} PRs for {}", prs.len(), commit_sha);
        Ok(prs)
    }

    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>> {
        debug!("Fetching reviews of PR #{} in {}/{}", pr_number, owner, repo);

        let pulls = self.octocrab.pulls(owner, repo);
        let mut reviews = Vec::new();
        let mut page_num = 1u32;

        loop {
            let page = pulls
                .list_reviews(pr_number)
                .per_page(PER_PAGE)
                .page(page_num)
                .send()
                .await?;
            let has_next = page.next.is_some();

            reviews.extend(page.items.into_iter().map(|r| Review {
                id: r.id.into_inner(),
                author: r.user.map(|u| u.login),
                state: convert_review_state(r.state.as_ref()),
                submitted_at: r.submitted_at,
            }));

            if !has_next {
                break;
            }
            page_num += 1;
        }

        Ok(reviews)
    }

    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> anyhow::Result<()> {
        debug!(
            "Creating {:?} review on PR #{} in {}/{}",
            event, pr_number, owner, repo
        );

        // The typed route only exists on the deprecated `pull_number()` builder
        let route = format!("/repos/{}/{}/pulls/{}/reviews", owner, repo, pr_number);
        let review: octocrab::models::pulls::Review = self
            .octocrab
            .post(route, Some(&NewReview { event, body }))
            .await?;

        debug!("Created review {} on PR #{}", review.id, pr_number);
        Ok(())
    }

    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>> {
        debug!(
            "Fetching check runs for {}/{} @ {}",
            owner, repo, commit_sha
        );

        let checks = self.octocrab.checks(owner, repo);
        let mut runs = Vec::new();
        let mut page_num = 1u32;

        loop {
            let page = checks
                .list_check_runs_for_git_ref(commit_sha.to_string().into())
                .per_page(PER_PAGE)
                .page(page_num)
                .send()
                .await?;
            let total = page.total_count;
            let page_len = page.check_runs.len();

            runs.extend(page.check_runs.into_iter().map(convert_check_run));

            if !has_more_check_runs(runs.len(), total, page_len) {
                break;
            }
            page_num += 1;
        }

        debug!("Found {} check runs for {}", runs.len(), commit_sha);
        Ok(runs)
    }

    async fn fetch_commit_status(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<CheckStatus> {
        debug!(
            "Fetching commit status for {}/{} @ {}",
            owner, repo, commit_sha
        );

        // Use raw GET request since octocrab's Reference type doesn't support commit SHAs
        let route = format!("/repos/{}/{}/commits/{}/status", owner, repo, commit_sha);
        let status: octocrab::models::CombinedStatus =
            self.octocrab.get(route, None::<&()>).await?;

        let state = convert_status_state(&status.state);
        let statuses = status
            .statuses
            .into_iter()
            .map(|s| CommitStatus {
                context: s.context.unwrap_or_else(|| "unknown".to_string()),
                state: convert_status_state(&s.state),
            })
            .collect();

        Ok(CheckStatus {
            state,
            total_count: status.total_count as u64,
            statuses,
        })
    }

    async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        head_sha: &str,
        update: &CheckRunUpdate,
    ) -> anyhow::Result<CheckRun> {
        debug!(
            "Creating check run {:?} on {}/{} @ {}",
            name, owner, repo, head_sha
        );

        let checks = self.octocrab.checks(owner, repo);
        let mut request = checks
            .create_check_run(name, head_sha)
            .status(to_run_status(update.status))
            .output(to_run_output(&update.output));
        if let Some(conclusion) = update.conclusion {
            request = request.conclusion(to_run_conclusion(conclusion));
        }

        Ok(convert_check_run(request.send().await?))
    }

    async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> anyhow::Result<CheckRun> {
        debug!(
            "Updating check run {} on {}/{} to {}",
            check_run_id,
            owner,
            repo,
            update.status.as_str()
        );

        let checks = self.octocrab.checks(owner, repo);
        let mut request = checks
            .update_check_run(check_run_id.into())
            .status(to_run_status(update.status))
            .output(to_run_output(&update.output));
        if let Some(conclusion) = update.conclusion {
            request = request.conclusion(to_run_conclusion(conclusion));
        }

        Ok(convert_check_run(request.send().await?))
    }
}

/// octocrab's check run listing carries a total count instead of a next page link
fn has_more_check_runs(fetched: usize, total_count: u64, last_page_len: usize) -> bool {
    last_page_len > 0 && (fetched as u64) < total_count
}

/// Convert octocrab PullRequest to our PullRequest type
fn convert_pull_request(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        state: convert_pull_request_state(pr.state.as_ref()),
        base_branch: pr.base.ref_field.clone(),
        head_branch: pr.head.ref_field.clone(),
        head_sha: pr.head.sha.clone(),
    }
}

fn convert_check_run(run: octocrab::models::checks::CheckRun) -> CheckRun {
    CheckRun {
        id: run.id.into_inner(),
        status: convert_check_run_status(run.started_at.is_some(), run.completed_at.is_some()),
        conclusion: run.conclusion.as_deref().map(convert_conclusion_string),
        name: run.name,
    }
}

fn convert_pull_request_state(state: Option<&octocrab::models::IssueState>) -> PullRequestState {
    match state {
        Some(octocrab::models::IssueState::Open) => PullRequestState::Open,
        _ => PullRequestState::Closed,
    }
}

/// Convert an octocrab review state to our enum
fn convert_review_state(state: Option<&octocrab::models::pulls::ReviewState>) -> ReviewState {
    use octocrab::models::pulls::ReviewState as ORS;
    match state {
        Some(ORS::Approved) => ReviewState::Approved,
        Some(ORS::ChangesRequested) => ReviewState::ChangesRequested,
        Some(ORS::Dismissed) => ReviewState::Dismissed,
        Some(ORS::Pending) => ReviewState::Pending,
        _ => ReviewState::Commented,
    }
}

/// octocrab's check run model carries timestamps instead of a status
fn convert_check_run_status(started: bool, completed: bool) -> CheckRunStatus {
    if completed {
        CheckRunStatus::Completed
    } else if started {
        CheckRunStatus::InProgress
    } else {
        CheckRunStatus::Queued
    }
}

/// Convert conclusion string from GitHub API to our enum
fn convert_conclusion_string(conclusion: &str) -> CheckConclusion {
    match conclusion.to_lowercase().as_str() {
        "success" => CheckConclusion::Success,
        "failure" => CheckConclusion::Failure,
        "neutral" => CheckConclusion::Neutral,
        "cancelled" => CheckConclusion::Cancelled,
        "skipped" => CheckConclusion::Skipped,
        "timed_out" => CheckConclusion::TimedOut,
        "action_required" => CheckConclusion::ActionRequired,
        "stale" => CheckConclusion::Stale,
        _ => CheckConclusion::Neutral,
    }
}

/// Convert octocrab StatusState to our CheckState
fn convert_status_state(state: &octocrab::models::StatusState) -> CheckState {
    match state {
        octocrab::models::StatusState::Success => CheckState::Success,
        octocrab::models::StatusState::Pending => CheckState::Pending,
        octocrab::models::StatusState::Failure => CheckState::Failure,
        octocrab::models::StatusState::Error => CheckState::Error,
        _ => CheckState::Pending,
    }
}

fn to_run_status(status: CheckRunStatus) -> check_params::CheckRunStatus {
    match status {
        CheckRunStatus::Queued => check_params::CheckRunStatus::Queued,
        CheckRunStatus::InProgress => check_params::CheckRunStatus::InProgress,
        CheckRunStatus::Completed => check_params::CheckRunStatus::Completed,
    }
}

fn to_run_conclusion(conclusion: CheckConclusion) -> check_params::CheckRunConclusion {
    match conclusion {
        CheckConclusion::Success => check_params::CheckRunConclusion::Success,
        CheckConclusion::Failure => check_params::CheckRunConclusion::Failure,
        CheckConclusion::Neutral => check_params::CheckRunConclusion::Neutral,
        CheckConclusion::Cancelled => check_params::CheckRunConclusion::Cancelled,
        CheckConclusion::Skipped => check_params::CheckRunConclusion::Skipped,
        CheckConclusion::TimedOut => check_params::CheckRunConclusion::TimedOut,
        CheckConclusion::ActionRequired => check_params::CheckRunConclusion::ActionRequired,
        CheckConclusion::Stale => check_params::CheckRunConclusion::Stale,
    }
}

fn to_run_output(output: &CheckRunOutput) -> check_params::CheckRunOutput {
    check_params::CheckRunOutput {
        title: output.title.clone(),
        summary: output.summary.clone(),
        text: output.text.clone(),
        annotations: Vec::new(),
        images: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_conclusion_string() {
        assert_eq!(convert_conclusion_string("success"), CheckConclusion::Success);
        assert_eq!(convert_conclusion_string("SUCCESS"), CheckConclusion::Success);
        assert_eq!(convert_conclusion_string("failure"), CheckConclusion::Failure);
        assert_eq!(convert_conclusion_string("timed_out"), CheckConclusion::TimedOut);
        assert_eq!(
            convert_conclusion_string("action_required"),
            CheckConclusion::ActionRequired
        );
        assert_eq!(convert_conclusion_string("unknown"), CheckConclusion::Neutral);
    }

    #[test]
    fn test_convert_review_state() {
        use octocrab::models::pulls::ReviewState as ORS;

        assert_eq!(
            convert_review_state(Some(&ORS::Approved)),
            ReviewState::Approved
        );
        assert_eq!(
            convert_review_state(Some(&ORS::Dismissed)),
            ReviewState::Dismissed
        );
        assert_eq!(
            convert_review_state(Some(&ORS::ChangesRequested)),
            ReviewState::ChangesRequested
        );
        assert_eq!(convert_review_state(None), ReviewState::Commented);
    }

    #[test]
    fn test_convert_pull_request_state() {
        use octocrab::models::IssueState;

        assert_eq!(
            convert_pull_request_state(Some(&IssueState::Open)),
            PullRequestState::Open
        );
        assert_eq!(
            convert_pull_request_state(Some(&IssueState::Closed)),
            PullRequestState::Closed
        );
        assert_eq!(convert_pull_request_state(None), PullRequestState::Closed);
    }

    #[test]
    fn test_check_runs_pagination_stops() {
        // 230 runs at 100 per page
        assert!(has_more_check_runs(100, 230, 100));
        assert!(has_more_check_runs(200, 230, 100));
        assert!(!has_more_check_runs(230, 230, 30));
        // a short listing never asks again
        assert!(!has_more_check_runs(3, 3, 3));
        // runs vanishing between pages
        assert!(!has_more_check_runs(100, 230, 0));
    }

    #[test]
    fn test_convert_check_run_status() {
        assert_eq!(convert_check_run_status(false, false), CheckRunStatus::Queued);
        assert_eq!(convert_check_run_status(true, false), CheckRunStatus::InProgress);
        assert_eq!(convert_check_run_status(true, true), CheckRunStatus::Completed);
    }

    #[test]
    fn test_check_run_output_params() {
        let output = CheckRunOutput {
            title: "Self Approver".to_string(),
            summary: "Pull Request #1 approved".to_string(),
            text: None,
        };

        let json = serde_json::to_value(to_run_output(&output)).unwrap();
        assert_eq!(json["title"], "Self Approver");
        assert_eq!(json["summary"], "Pull Request #1 approved");
        assert!(json.get("text").is_none());
        assert!(json.get("annotations").is_none());
        assert_eq!(
            serde_json::to_value(to_run_conclusion(CheckConclusion::Success)).unwrap(),
            "success"
        );
        assert_eq!(
            serde_json::to_value(to_run_status(CheckRunStatus::InProgress)).unwrap(),
            "in_progress"
        );
    }

    #[test]
    fn test_new_review_body() {
        let body = NewReview {
            event: ReviewEvent::Approve,
            body: Some("Approved by Self Approver"),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["event"], "APPROVE");
        assert_eq!(json["body"], "Approved by Self Approver");
    }
}
