//! Issue domain events.

use chrono::{DateTime, Utc};
use common::CommentId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{ApplyTo, DomainEvent};

use super::{Comment, Issue, IssueState};

/// Events that can occur on an issue aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IssueEvent {
    IssueOpened(IssueOpened),

    /// A comment was left on the issue.
    IssueCommented(IssueCommented),

    IssueClosed(IssueClosed),
}

impl DomainEvent for IssueEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IssueEvent::IssueOpened(_) => "IssueOpened",
            IssueEvent::IssueCommented(_) => "IssueCommented",
            IssueEvent::IssueClosed(_) => "IssueClosed",
        }
    }
}

impl ApplyTo<Issue> for IssueEvent {
    fn apply_to(&self, issue: &mut Issue) {
        match self {
            IssueEvent::IssueOpened(event) => event.apply_to(issue),
            IssueEvent::IssueCommented(event) => event.apply_to(issue),
            IssueEvent::IssueClosed(event) => event.apply_to(issue),
        }
    }
}

impl IssueEvent {
    pub fn issue_opened(title: impl Into<String>) -> Self {
        IssueEvent::IssueOpened(IssueOpened {
            title: title.into(),
            opened_at: Utc::now(),
        })
    }

    /// Records a comment under a freshly generated [`CommentId`].
    pub fn issue_commented(message: impl Into<String>) -> Self {
        IssueEvent::IssueCommented(IssueCommented {
            comment_id: CommentId::new(),
            message: message.into(),
        })
    }

    pub fn issue_closed(reason: Option<String>) -> Self {
        IssueEvent::IssueClosed(IssueClosed {
            reason,
            closed_at: Utc::now(),
        })
    }
}

/// The issue was opened with a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueOpened {
    pub title: String,
    pub opened_at: DateTime<Utc>,
}

impl ApplyTo<Issue> for IssueOpened {
    fn apply_to(&self, issue: &mut Issue) {
        issue.open(self.title.clone(), self.opened_at);
    }
}

/// A comment was recorded on the issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCommented {
    /// Identity of the comment this event creates.
    pub comment_id: CommentId,

    pub message: String,
}

impl ApplyTo<Issue> for IssueCommented {
    /// Adds the comment unless one with the same id is already present.
    fn apply_to(&self, issue: &mut Issue) {
        issue.add_comment(Comment::new(self.comment_id, self.message.clone()));
    }
}

/// The issue was closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueClosed {
    pub reason: Option<String>,
    pub closed_at: DateTime<Utc>,
}

impl ApplyTo<Issue> for IssueClosed {
    fn apply_to(&self, issue: &mut Issue) {
        issue.set_state(IssueState::Closed);
    }
}
