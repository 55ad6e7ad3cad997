//! Typed webhook events
//!
//! The `X-GitHub-Event` header picks the payload shape. Only the fields the
//! engine reads are modelled; everything else in the payload is ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while turning a webhook delivery into a `WebhookEvent`
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The delivery has no `X-GitHub-Event` header
    #[error("Missing X-GitHub-Event header")]
    MissingEventHeader,

    /// The body does not match the payload shape of its event
    #[error("Invalid {event} payload: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

/// Repository the event belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name without owner (e.g., "self-approver")
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub owner: Account,
}

/// GitHub App installation the delivery was sent for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuite {
    pub head_sha: String,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

/// `check_suite` delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuiteEvent {
    pub action: String,
    pub check_suite: CheckSuite,
    pub repository: Repository,
    pub installation: Installation,
}

/// Legacy `status` delivery from the commit Status API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub sha: String,
    pub state: String,
    pub repository: Repository,
    pub installation: Installation,
}

/// Events the engine reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A check suite was requested or re-requested
    CheckSuiteRequested(CheckSuiteEvent),
    /// A check suite finished
    CheckSuiteCompleted(CheckSuiteEvent),
    /// A commit status changed
    Status(StatusEvent),
}

impl WebhookEvent {
    /// Parse a delivery from its event name and JSON body
    ///
    /// Returns `Ok(None)` for events and actions the engine does not handle.
    pub fn parse(event_name: &str, body: &[u8]) -> Result<Option<Self>, WebhookError> {
        let invalid = |source| WebhookError::InvalidPayload {
            event: event_name.to_string(),
            source,
        };

        match event_name {
            "check_suite" => {
                let event: CheckSuiteEvent = serde_json::from_slice(body).map_err(invalid)?;
                Ok(match event.action.as_str() {
                    "requested" | "rerequested" => Some(WebhookEvent::CheckSuiteRequested(event)),
                    "completed" => Some(WebhookEvent::CheckSuiteCompleted(event)),
                    _ => None,
                })
            }
            "status" => {
                let event: StatusEvent = serde_json::from_slice(body).map_err(invalid)?;
                Ok(Some(WebhookEvent::Status(event)))
            }
            _ => Ok(None),
        }
    }

    pub fn repository(&self) -> &Repository {
        match self {
            WebhookEvent::CheckSuiteRequested(event) | WebhookEvent::CheckSuiteCompleted(event) => {
                &event.repository
            }
            WebhookEvent::Status(event) => &event.repository,
        }
    }

    /// Id of the installation whose token answers this event
    pub fn installation_id(&self) -> u64 {
        match self {
            WebhookEvent::CheckSuiteRequested(event) | WebhookEvent::CheckSuiteCompleted(event) => {
                event.installation.id
            }
            WebhookEvent::Status(event) => event.installation.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repository() -> serde_json::Value {
        json!({
            "name": "self-approver",
            "full_name": "heitorpolidoro/self-approver",
            "owner": { "login": "heitorpolidoro", "id": 1 },
            "private": false
        })
    }

    fn check_suite_body(action: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "action": action,
            "check_suite": {
                "id": 42,
                "head_sha": "abc123",
                "head_branch": "feature",
                "status": "completed",
                "conclusion": "success",
                "app": { "id": 7, "slug": "self-approver", "name": "Self Approver" },
                "pull_requests": [{ "number": 1, "url": "https://api.github.com/x" }]
            },
            "repository": repository(),
            "installation": { "id": 99, "node_id": "MDIz" },
            "sender": { "login": "heitorpolidoro" }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_check_suite_actions() {
        let event = WebhookEvent::parse("check_suite", &check_suite_body("completed")).unwrap();
        match event {
            Some(WebhookEvent::CheckSuiteCompleted(event)) => {
                assert_eq!(event.check_suite.head_sha, "abc123");
                assert_eq!(event.check_suite.conclusion.as_deref(), Some("success"));
                assert_eq!(event.check_suite.pull_requests, vec![PullRequestRef { number: 1 }]);
                assert_eq!(event.repository.owner.login, "heitorpolidoro");
                assert_eq!(event.installation.id, 99);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        for action in ["requested", "rerequested"] {
            let event = WebhookEvent::parse("check_suite", &check_suite_body(action)).unwrap();
            assert!(matches!(event, Some(WebhookEvent::CheckSuiteRequested(_))));
        }
    }

    #[test]
    fn test_parse_status_event() {
        let body = serde_json::to_vec(&json!({
            "sha": "abc123",
            "state": "success",
            "context": "ci/legacy",
            "branches": [{ "name": "feature", "commit": { "sha": "abc123" } }],
            "repository": repository(),
            "installation": { "id": 99 }
        }))
        .unwrap();

        let event = WebhookEvent::parse("status", &body).unwrap().unwrap();
        assert_eq!(event.repository().full_name, "heitorpolidoro/self-approver");
        assert_eq!(event.installation_id(), 99);
        match event {
            WebhookEvent::Status(status) => {
                assert_eq!(status.sha, "abc123");
                assert_eq!(status.state, "success");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unhandled_events_are_ignored() {
        assert!(WebhookEvent::parse("ping", b"{}").unwrap().is_none());
        assert!(WebhookEvent::parse("pull_request", b"not even json")
            .unwrap()
            .is_none());
        assert!(WebhookEvent::parse("check_suite", &check_suite_body("deleted"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalid_payload() {
        let err = WebhookEvent::parse("check_suite", b"{\"action\": \"completed\"}").unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload { .. }));
        assert!(err.to_string().starts_with("Invalid check_suite payload"));
    }

    #[test]
    fn test_delivery_without_installation_is_invalid() {
        let body = serde_json::to_vec(&json!({
            "sha": "abc123",
            "state": "success",
            "repository": repository()
        }))
        .unwrap();

        let err = WebhookEvent::parse("status", &body).unwrap_err();
        assert!(err.to_string().contains("installation"));
    }
}
