//! Branch protection gate
//!
//! The engine submits a single review, so it only acts on branches whose
//! protection asks for exactly one approving review and a code-owner review.

use gh_client::ProtectionPolicy;

/// Whether the protection of a base branch allows auto-approval
///
/// `None` (no protection, or no review rule) is never auto-approvable.
pub fn is_auto_approvable(policy: Option<&ProtectionPolicy>) -> bool {
    match policy {
        Some(policy) => {
            policy.require_code_owner_reviews && policy.required_approving_review_count == 1
        }
        None => false,
    }
}
