//! Progress indicator
//!
//! The engine reports its own progress through one check run per head
//! commit, found by name. If the platform holds duplicates, the first one in
//! platform order is used.

use gh_client::{
    CheckConclusion, CheckRun, CheckRunOutput, CheckRunStatus, CheckRunUpdate, GitHubClient,
};
use log::warn;

use crate::events::Repository;

/// First check run named `name`, in platform order
pub fn find_indicator<'a>(check_runs: &'a [CheckRun], name: &str) -> Option<&'a CheckRun> {
    let mut matches = check_runs.iter().filter(|run| run.name == name);
    let first = matches.next()?;
    let duplicates = matches.count();
    if duplicates > 0 {
        warn!(
            "Found {} check runs named {:?}, using #{}",
            duplicates + 1,
            name,
            first.id
        );
    }
    Some(first)
}

/// Handle on the indicator check run of one head commit
pub struct ProgressIndicator<'a> {
    client: &'a dyn GitHubClient,
    repository: &'a Repository,
    head_sha: &'a str,
    name: &'a str,
}

impl<'a> ProgressIndicator<'a> {
    pub fn new(
        client: &'a dyn GitHubClient,
        repository: &'a Repository,
        head_sha: &'a str,
        name: &'a str,
    ) -> Self {
        Self {
            client,
            repository,
            head_sha,
            name,
        }
    }

    /// Show the indicator as running, with a snapshot of the sibling checks
    ///
    /// `check_runs` is the current check-run set of the head commit and is
    /// used to find an existing indicator.
    pub async fn mark_in_progress(
        &self,
        check_runs: &[CheckRun],
        summary: String,
        text: String,
    ) -> anyhow::Result<CheckRun> {
        let update = CheckRunUpdate {
            status: CheckRunStatus::InProgress,
            conclusion: None,
            output: self.output(summary, Some(text)),
        };
        let existing = find_indicator(check_runs, self.name).map(|run| run.id);
        self.upsert(existing, &update).await
    }

    /// Complete the indicator as successful, naming the approved pull request
    pub async fn mark_approved(&self, pr_number: u64) -> anyhow::Result<CheckRun> {
        let check_runs = self
            .client
            .fetch_check_runs(&self.repository.owner.login, &self.repository.name, self.head_sha)
            .await?;
        let update = CheckRunUpdate {
            status: CheckRunStatus::Completed,
            conclusion: Some(CheckConclusion::Success),
            output: self.output(format!("Pull Request #{} approved", pr_number), None),
        };
        let existing = find_indicator(&check_runs, self.name).map(|run| run.id);
        self.upsert(existing, &update).await
    }

    fn output(&self, summary: String, text: Option<String>) -> CheckRunOutput {
        CheckRunOutput {
            title: self.name.to_string(),
            summary,
            text,
        }
    }

    async fn upsert(&self, existing: Option<u64>, update: &CheckRunUpdate) -> anyhow::Result<CheckRun> {
        let owner = &self.repository.owner.login;
        let repo = &self.repository.name;
        match existing {
            Some(id) => self.client.update_check_run(owner, repo, id, update).await,
            None => {
                self.client
                    .create_check_run(owner, repo, self.name, self.head_sha, update)
                    .await
            }
        }
    }
}
