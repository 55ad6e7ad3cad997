//! Self approver
//!
//! Approves pull requests on behalf of the repository owner once CI is green,
//! so branches protected by a single required code-owner review can merge
//! without a human clicking "Approve".
//!
//! - [`engine`] decides per pull request and submits the approval
//! - [`policy`], [`ownership`], [`reviews`] and [`checks`] are the individual gates
//! - [`indicator`] keeps the engine's own check run up to date
//! - [`events`] and [`server`] turn webhook deliveries into engine calls

pub mod checks;
pub mod engine;
pub mod events;
pub mod indicator;
pub mod logger;
pub mod ownership;
pub mod policy;
pub mod reviews;
pub mod server;

#[cfg(test)]
mod test_support;

pub use engine::{ApprovalEngine, BatchInterrupted, BatchOutcome, Decision, EngineSettings};
pub use events::{WebhookError, WebhookEvent};
