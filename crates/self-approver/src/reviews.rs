//! Review state of a pull request relative to its branch owner

use gh_client::{Review, ReviewState};

/// Where the owner's reviews leave the pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    /// The owner never approved
    None,
    /// The owner's latest decisive review is an approval
    Approved,
    /// The owner's approval was dismissed and nothing newer replaced it
    Dismissed,
}

/// Classify `reviews` (chronological) by the latest decisive state from `owner`
///
/// Only approvals and dismissals move the state; comments and change requests
/// from the owner leave it where it was. Logins compare case-insensitively.
pub fn review_status(reviews: &[Review], owner: &str) -> ReviewStatus {
    reviews
        .iter()
        .filter(|review| {
            review
                .author
                .as_deref()
                .is_some_and(|author| author.eq_ignore_ascii_case(owner))
        })
        .fold(ReviewStatus::None, |status, review| match review.state {
            ReviewState::Approved => ReviewStatus::Approved,
            ReviewState::Dismissed => ReviewStatus::Dismissed,
            _ => status,
        })
}
