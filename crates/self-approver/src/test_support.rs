//! In-memory GitHub used by the engine and server tests

use async_trait::async_trait;
use gh_client::{
    Branch, CheckConclusion, CheckRun, CheckRunOutput, CheckRunStatus, CheckRunUpdate, CheckState,
    CheckStatus, ClientProvider, Commit, CommitStatus, GitHubClient, ProtectionPolicy,
    PullRequest, PullRequestState, Review, ReviewEvent, ReviewState,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::events::{
    Account, CheckSuite, CheckSuiteEvent, Installation, PullRequestRef, Repository,
};

pub const OWNER: &str = "heitorpolidoro";
pub const REPO: &str = "self-approver";
pub const HEAD_SHA: &str = "head-sha";
pub const BASE_SHA: &str = "base-sha";
pub const INDICATOR: &str = "Self Approver";
pub const APPROVAL_MESSAGE: &str = "Approved by Self Approver";
pub const BOT: &str = "self-approver[bot]";
pub const INSTALLATION: u64 = 1;

/// A review submitted through the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedReview {
    pub pr_number: u64,
    pub event: ReviewEvent,
    pub body: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub branches: HashMap<String, Branch>,
    pub protections: HashMap<String, ProtectionPolicy>,
    pub compare: Vec<Commit>,
    pub pulls: HashMap<u64, PullRequest>,
    pub commit_pulls: Vec<u64>,
    pub reviews: HashMap<u64, Vec<Review>>,
    pub check_runs: Vec<CheckRun>,
    pub outputs: HashMap<u64, CheckRunOutput>,
    pub combined_state: Option<CheckState>,
    pub statuses: Vec<CommitStatus>,
    pub submitted: Vec<SubmittedReview>,
    /// Login the mock records as author of submitted reviews
    pub reviewer: String,
    pub fail_reviews: bool,
    /// Installation ids clients were requested for
    pub installations: Vec<u64>,
    next_id: u64,
}

/// Mock client for testing
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    pub state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Branch `feature` by `heitorpolidoro` into protected `master`
    /// (code-owner review, one approval), no reviews, green checks and a
    /// green legacy status
    pub fn scenario() -> Self {
        let client = Self::default();
        {
            let mut state = client.state.lock().unwrap();
            state.next_id = 100;
            state.reviewer = BOT.to_string();
            state.branches.insert(
                "master".to_string(),
                Branch {
                    name: "master".to_string(),
                    head_sha: BASE_SHA.to_string(),
                    protected: true,
                },
            );
            state.branches.insert(
                "feature".to_string(),
                Branch {
                    name: "feature".to_string(),
                    head_sha: HEAD_SHA.to_string(),
                    protected: false,
                },
            );
            state.protections.insert(
                "master".to_string(),
                ProtectionPolicy {
                    require_code_owner_reviews: true,
                    required_approving_review_count: 1,
                },
            );
            state.compare = vec![Commit {
                sha: "c1".to_string(),
                author_login: Some(OWNER.to_string()),
            }];
            state.pulls.insert(1, pull_request(1));
            state.commit_pulls = vec![1];
            state.check_runs = vec![check_run(1, "build", Some(CheckConclusion::Success))];
            state.combined_state = Some(CheckState::Success);
            state.statuses = vec![CommitStatus {
                context: "ci/legacy".to_string(),
                state: CheckState::Success,
            }];
        }
        client
    }

    pub fn with<F: FnOnce(&mut MockState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn installations(&self) -> Vec<u64> {
        self.state.lock().unwrap().installations.clone()
    }

    pub fn submitted(&self) -> Vec<SubmittedReview> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn indicator(&self) -> Option<(CheckRun, Option<CheckRunOutput>)> {
        let state = self.state.lock().unwrap();
        state
            .check_runs
            .iter()
            .find(|run| run.name == INDICATOR)
            .map(|run| (run.clone(), state.outputs.get(&run.id).cloned()))
    }
}

pub fn pull_request(number: u64) -> PullRequest {
    PullRequest {
        number,
        state: PullRequestState::Open,
        base_branch: "master".to_string(),
        head_branch: "feature".to_string(),
        head_sha: HEAD_SHA.to_string(),
    }
}

pub fn check_run(id: u64, name: &str, conclusion: Option<CheckConclusion>) -> CheckRun {
    CheckRun {
        id,
        name: name.to_string(),
        status: if conclusion.is_some() {
            CheckRunStatus::Completed
        } else {
            CheckRunStatus::InProgress
        },
        conclusion,
    }
}

pub fn review(author: &str, state: ReviewState) -> Review {
    Review {
        id: 1,
        author: Some(author.to_string()),
        state,
        submitted_at: None,
    }
}

pub fn repository(owner: &str) -> Repository {
    Repository {
        name: REPO.to_string(),
        full_name: format!("{}/{}", owner, REPO),
        owner: Account {
            login: owner.to_string(),
        },
    }
}

pub fn check_suite_event(action: &str, conclusion: Option<&str>, prs: &[u64]) -> CheckSuiteEvent {
    CheckSuiteEvent {
        action: action.to_string(),
        check_suite: CheckSuite {
            head_sha: HEAD_SHA.to_string(),
            conclusion: conclusion.map(str::to_string),
            pull_requests: prs
                .iter()
                .map(|number| PullRequestRef { number: *number })
                .collect(),
        },
        repository: repository(OWNER),
        installation: Installation { id: INSTALLATION },
    }
}

impl ClientProvider for MockClient {
    fn client_for(&self, installation_id: u64) -> anyhow::Result<Arc<dyn GitHubClient>> {
        self.state.lock().unwrap().installations.push(installation_id);
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl GitHubClient for MockClient {
    async fn fetch_branch(&self, _owner: &str, _repo: &str, branch: &str) -> anyhow::Result<Branch> {
        self.state
            .lock()
            .unwrap()
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Branch not found: {}", branch))
    }

    async fn fetch_branch_protection(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
    ) -> anyhow::Result<Option<ProtectionPolicy>> {
        Ok(self.state.lock().unwrap().protections.get(branch).copied())
    }

    async fn compare_commits(
        &self,
        _owner: &str,
        _repo: &str,
        _base: &str,
        _head: &str,
    ) -> anyhow::Result<Vec<Commit>> {
        Ok(self.state.lock().unwrap().compare.clone())
    }

    async fn fetch_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .get(&pr_number)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("PR not found"))
    }

    async fn fetch_pull_requests_for_commit(
        &self,
        _owner: &str,
        _repo: &str,
        _commit_sha: &str,
    ) -> anyhow::Result<Vec<PullRequest>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .commit_pulls
            .iter()
            .filter_map(|number| state.pulls.get(number).cloned())
            .collect())
    }

    async fn fetch_reviews(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reviews
            .get(&pr_number)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_review(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_reviews {
            anyhow::bail!("API rate limit exceeded");
        }
        state.submitted.push(SubmittedReview {
            pr_number,
            event,
            body: body.map(str::to_string),
        });
        let reviewer = state.reviewer.clone();
        state
            .reviews
            .entry(pr_number)
            .or_default()
            .push(review(&reviewer, ReviewState::Approved));
        Ok(())
    }

    async fn fetch_check_runs(
        &self,
        _owner: &str,
        _repo: &str,
        _commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>> {
        Ok(self.state.lock().unwrap().check_runs.clone())
    }

    async fn fetch_commit_status(
        &self,
        _owner: &str,
        _repo: &str,
        _commit_sha: &str,
    ) -> anyhow::Result<CheckStatus> {
        let state = self.state.lock().unwrap();
        Ok(CheckStatus {
            state: state.combined_state.unwrap_or(CheckState::Pending),
            total_count: state.statuses.len() as u64,
            statuses: state.statuses.clone(),
        })
    }

    async fn create_check_run(
        &self,
        _owner: &str,
        _repo: &str,
        name: &str,
        _head_sha: &str,
        update: &CheckRunUpdate,
    ) -> anyhow::Result<CheckRun> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let run = CheckRun {
            id: state.next_id,
            name: name.to_string(),
            status: update.status,
            conclusion: update.conclusion,
        };
        state.check_runs.push(run.clone());
        state.outputs.insert(run.id, update.output.clone());
        Ok(run)
    }

    async fn update_check_run(
        &self,
        _owner: &str,
        _repo: &str,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> anyhow::Result<CheckRun> {
        let mut state = self.state.lock().unwrap();
        let run = state
            .check_runs
            .iter_mut()
            .find(|run| run.id == check_run_id)
            .ok_or_else(|| anyhow::anyhow!("Check run not found"))?;
        run.status = update.status;
        run.conclusion = update.conclusion;
        let run = run.clone();
        state.outputs.insert(check_run_id, update.output.clone());
        Ok(run)
    }
}
