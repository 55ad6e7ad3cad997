//! Approval decision engine
//!
//! Reacts to check-suite and status events. For each pull request on the
//! head commit it decides whether the branch owner's own work may be approved
//! and, if so, submits one approving review.
//!
//! # Flow
//!
//! ```text
//! check_suite requested ──► indicator in_progress (snapshot of sibling checks)
//!
//! check_suite completed ─┐
//! status                 ├─► suite green? ──► per PR: checks, open, protected,
//!                        ┘                    policy, owner, reviews ──► approve
//!                                                                        indicator completed
//! ```
//!
//! Every evaluation reads platform state fresh, through the client of the
//! GitHub App installation the event was delivered for. The engine itself
//! holds no mutable state.

use std::fmt;
use std::sync::Arc;

use gh_client::{ClientProvider, GitHubClient, PullRequestState, ReviewEvent};
use log::{debug, info, warn};
use self_approver_config::AppConfig;

use crate::checks::{all_checks_green, describe_check_runs, statuses_green};
use crate::events::{CheckSuiteEvent, Installation, Repository, StatusEvent, WebhookEvent};
use crate::indicator::ProgressIndicator;
use crate::ownership::{resolve_owner, OwnershipError};
use crate::policy::is_auto_approvable;
use crate::reviews::{review_status, ReviewStatus};

const SUCCESS: &str = "success";

/// Names and messages the engine writes to GitHub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Name of the progress indicator check run
    pub check_run_name: String,
    /// Body of the approving review
    pub approval_message: String,
    /// Login the engine's own reviews are authored under
    pub reviewer: Option<String>,
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            check_run_name: config.check_run_name.clone(),
            approval_message: config.approval_message.clone(),
            reviewer: None,
        }
    }
}

/// Outcome of evaluating one pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// An approving review was submitted
    Approved { pr: u64 },
    /// Not eligible, with the reason reported to the log
    Rejected { pr: u64, reason: String },
    /// Base branch protection is not the single code-owner review shape
    Skipped { pr: u64 },
}

/// Decisions taken for one event, in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub decisions: Vec<Decision>,
}

impl BatchOutcome {
    pub fn approved(&self) -> Vec<u64> {
        self.decisions
            .iter()
            .filter_map(|decision| match decision {
                Decision::Approved { pr } => Some(*pr),
                _ => None,
            })
            .collect()
    }

    pub fn rejections(&self) -> Vec<&str> {
        self.decisions
            .iter()
            .filter_map(|decision| match decision {
                Decision::Rejected { reason, .. } => Some(reason.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Log all rejections, then all approvals
    pub fn report(&self) {
        for reason in self.rejections() {
            info!("Not approving - {}", reason);
        }
        for decision in &self.decisions {
            if let Decision::Skipped { pr } = decision {
                debug!("Pull Request #{} base branch protection does not allow self approval", pr);
            }
        }
        for pr in self.approved() {
            info!("Pull Request #{} approved", pr);
        }
    }
}

/// A batch stopped by a platform error, with the decisions taken before it
///
/// Attached as context to the error returned by the event handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInterrupted {
    /// Pull request whose evaluation failed
    pub pr: u64,
    pub completed: BatchOutcome,
}

impl fmt::Display for BatchInterrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Evaluation stopped at Pull Request #{} after {} decision(s)",
            self.pr,
            self.completed.decisions.len()
        )
    }
}

/// The approval decision engine
///
/// Constructed once at startup and shared by all webhook requests.
pub struct ApprovalEngine {
    clients: Arc<dyn ClientProvider>,
    settings: EngineSettings,
}

impl ApprovalEngine {
    pub fn new(clients: Arc<dyn ClientProvider>, settings: EngineSettings) -> Self {
        Self { clients, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Dispatch an event to its handler
    pub async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<BatchOutcome> {
        match event {
            WebhookEvent::CheckSuiteRequested(event) => {
                self.check_suite_requested(event).await?;
                Ok(BatchOutcome::default())
            }
            WebhookEvent::CheckSuiteCompleted(event) => self.check_suite_completed(event).await,
            WebhookEvent::Status(event) => self.status(event).await,
        }
    }

    fn client_for(&self, installation: &Installation) -> anyhow::Result<Arc<dyn GitHubClient>> {
        debug!("Using client of installation {}", installation.id);
        self.clients.client_for(installation.id)
    }

    /// Put the indicator in progress with a snapshot of the other checks
    pub async fn check_suite_requested(&self, event: &CheckSuiteEvent) -> anyhow::Result<()> {
        let client = self.client_for(&event.installation)?;
        let repository = &event.repository;
        let head_sha = &event.check_suite.head_sha;
        info!(
            "Check suite requested for {} @ {}",
            repository.full_name, head_sha
        );

        let owner = &repository.owner.login;
        let check_runs = client
            .fetch_check_runs(owner, &repository.name, head_sha)
            .await?;
        let combined = client
            .fetch_commit_status(owner, &repository.name, head_sha)
            .await?;

        let siblings: Vec<_> = check_runs
            .iter()
            .filter(|run| run.name != self.settings.check_run_name)
            .cloned()
            .collect();
        let mut text = describe_check_runs(&siblings);
        for status in &combined.statuses {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&format!("{}: {}", status.context, status.state.as_str()));
        }

        ProgressIndicator::new(
            client.as_ref(),
            repository,
            head_sha,
            &self.settings.check_run_name,
        )
        .mark_in_progress(
            &check_runs,
            format!("Combined status: {}", combined.state.as_str()),
            text,
        )
        .await?;
        Ok(())
    }

    /// Evaluate every pull request attached to a completed check suite
    pub async fn check_suite_completed(&self, event: &CheckSuiteEvent) -> anyhow::Result<BatchOutcome> {
        let client = self.client_for(&event.installation)?;
        let suite = &event.check_suite;
        let numbers: Vec<u64> = suite.pull_requests.iter().map(|pr| pr.number).collect();
        self.evaluate(
            client.as_ref(),
            &event.repository,
            &suite.head_sha,
            suite.conclusion.as_deref(),
            numbers,
        )
        .await
    }

    /// Evaluate the pull requests of a commit whose legacy status changed
    pub async fn status(&self, event: &StatusEvent) -> anyhow::Result<BatchOutcome> {
        let client = self.client_for(&event.installation)?;
        let repository = &event.repository;
        let pulls = client
            .fetch_pull_requests_for_commit(&repository.owner.login, &repository.name, &event.sha)
            .await?;
        let numbers = pulls.iter().map(|pr| pr.number).collect();
        self.evaluate(
            client.as_ref(),
            repository,
            &event.sha,
            Some(event.state.as_str()),
            numbers,
        )
        .await
    }

    async fn evaluate(
        &self,
        client: &dyn GitHubClient,
        repository: &Repository,
        head_sha: &str,
        trigger_conclusion: Option<&str>,
        pr_numbers: Vec<u64>,
    ) -> anyhow::Result<BatchOutcome> {
        if trigger_conclusion != Some(SUCCESS) {
            info!(
                "Not approving - {} @ {} concluded {}",
                repository.full_name,
                head_sha,
                trigger_conclusion.unwrap_or("without conclusion")
            );
            return Ok(BatchOutcome::default());
        }
        if pr_numbers.is_empty() {
            info!(
                "No pull requests for {} @ {}",
                repository.full_name, head_sha
            );
            return Ok(BatchOutcome::default());
        }

        let owner = &repository.owner.login;
        let check_runs = client
            .fetch_check_runs(owner, &repository.name, head_sha)
            .await?;
        let combined = client
            .fetch_commit_status(owner, &repository.name, head_sha)
            .await?;
        let checks_green = all_checks_green(&check_runs, &self.settings.check_run_name)
            && statuses_green(&combined);

        let mut outcome = BatchOutcome::default();
        for pr_number in pr_numbers {
            match self
                .decide(client, repository, head_sha, pr_number, checks_green)
                .await
            {
                Ok(decision) => outcome.decisions.push(decision),
                Err(e) => {
                    warn!("Evaluation of Pull Request #{} failed: {:#}", pr_number, e);
                    outcome.report();
                    return Err(e.context(BatchInterrupted {
                        pr: pr_number,
                        completed: outcome,
                    }));
                }
            }
        }

        outcome.report();
        Ok(outcome)
    }

    /// Run the decision procedure for one pull request
    async fn decide(
        &self,
        client: &dyn GitHubClient,
        repository: &Repository,
        head_sha: &str,
        pr_number: u64,
        checks_green: bool,
    ) -> anyhow::Result<Decision> {
        let reject = |reason: String| Decision::Rejected {
            pr: pr_number,
            reason,
        };
        let owner = &repository.owner.login;
        let repo = &repository.name;

        if !checks_green {
            return Ok(reject(format!(
                "Pull Request #{} not all checks are success",
                pr_number
            )));
        }

        let pr = client.fetch_pull_request(owner, repo, pr_number).await?;
        if pr.state != PullRequestState::Open {
            return Ok(reject(format!("Pull Request #{} {}", pr_number, pr.state)));
        }

        let base = client.fetch_branch(owner, repo, &pr.base_branch).await?;
        if !base.protected {
            return Ok(reject(format!(
                "Pull Request #{} base branch not protected",
                pr_number
            )));
        }

        let policy = client
            .fetch_branch_protection(owner, repo, &base.name)
            .await?;
        if !is_auto_approvable(policy.as_ref()) {
            return Ok(Decision::Skipped { pr: pr_number });
        }

        let branch_owner =
            match resolve_owner(client, owner, repo, &base.head_sha, &pr.head_sha).await {
                Ok(login) => login,
                Err(OwnershipError::Api(e)) => return Err(e),
                Err(e) => return Ok(reject(format!("Pull Request #{} {}", pr_number, e))),
            };
        if !branch_owner.eq_ignore_ascii_case(owner) {
            return Ok(reject(format!(
                "The branch \"{}\" owner, \"{}\", is not the same as the repository owner, \"{}\"",
                pr.head_branch, branch_owner, owner
            )));
        }

        let reviews = client.fetch_reviews(owner, repo, pr_number).await?;
        let approved_by = |login: &str| review_status(&reviews, login) == ReviewStatus::Approved;
        let already_approved = approved_by(&branch_owner)
            || self.settings.reviewer.as_deref().is_some_and(approved_by);
        if already_approved {
            return Ok(reject(format!("Pull Request #{} already approved", pr_number)));
        }

        client
            .create_review(
                owner,
                repo,
                pr_number,
                ReviewEvent::Approve,
                Some(&self.settings.approval_message),
            )
            .await?;

        ProgressIndicator::new(client, repository, head_sha, &self.settings.check_run_name)
            .mark_approved(pr_number)
            .await?;

        Ok(Decision::Approved { pr: pr_number })
    }
}
