//! GitHub API client for the approval engine
//!
//! This crate provides a trait-based GitHub API client. The engine only talks
//! to `dyn GitHubClient`, so tests can swap in an in-memory implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              GitHubClient trait                  │
//! │  - fetch_branch() / fetch_branch_protection()    │
//! │  - compare_commits()                             │
//! │  - fetch_reviews() / create_review()             │
//! │  - fetch_check_runs() / update_check_run()       │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ┌─────────────────┐
//!              │ OctocrabClient  │
//!              │ (direct API)    │
//!              └─────────────────┘
//!                        ▲
//!                        │ one per installation
//!              ┌─────────────────┐
//!              │ ClientManager   │
//!              │ (GitHub App)    │
//!              └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_client::{ClientManager, ClientProvider};
//!
//! # async fn example(private_key_pem: &str) -> anyhow::Result<()> {
//! let manager = ClientManager::for_app(12345, private_key_pem, None)?;
//! let client = manager.client_for(67890)?;
//! let branch = client.fetch_branch("owner", "repo", "master").await?;
//! println!("{} protected: {}", branch.name, branch.protected);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod client_manager;
pub mod octocrab_client;
pub mod types;

pub use client::GitHubClient;
pub use client_manager::{ClientManager, ClientProvider};
pub use octocrab_client::OctocrabClient;
pub use types::{
    Branch, CheckConclusion, CheckRun, CheckRunOutput, CheckRunStatus, CheckRunUpdate, CheckState,
    CheckStatus, Commit, CommitStatus, ProtectionPolicy, PullRequest, PullRequestState, Review,
    ReviewEvent, ReviewState,
};

// Re-export octocrab so consumers don't need to depend on it directly
pub use octocrab;
