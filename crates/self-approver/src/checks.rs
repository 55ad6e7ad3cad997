//! CI aggregation over the check runs and legacy statuses of a commit

use gh_client::{CheckConclusion, CheckRun, CheckState, CheckStatus};

/// True when every check run except `exclude_name` concluded with success
///
/// Runs that have not concluded yet count as failing. A commit with no
/// other check runs is green.
pub fn all_checks_green(check_runs: &[CheckRun], exclude_name: &str) -> bool {
    check_runs
        .iter()
        .filter(|run| run.name != exclude_name)
        .all(|run| run.conclusion == Some(CheckConclusion::Success))
}

/// True when the commit has no legacy statuses or their combined state is success
pub fn statuses_green(status: &CheckStatus) -> bool {
    status.total_count == 0 || status.state == CheckState::Success
}

/// One line per check run: `name: status (conclusion)`
pub fn describe_check_runs(check_runs: &[CheckRun]) -> String {
    check_runs
        .iter()
        .map(|run| {
            format!(
                "{}: {} ({})",
                run.name,
                run.status.as_str(),
                run.conclusion.map(|c| c.as_str()).unwrap_or("none")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
