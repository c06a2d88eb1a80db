//! Issue commands.
//!
//! Each command decides, from the issue's current state, which events to
//! produce. None of them mutates the issue.

use common::AggregateId;

use crate::command::Command;

use super::{Issue, IssueError, IssueEvent};

/// Command to open an issue under a title.
#[derive(Debug, Clone)]
pub struct OpenIssue {
    pub issue_id: AggregateId,
    pub title: String,
}

impl OpenIssue {
    pub fn new(issue_id: AggregateId, title: impl Into<String>) -> Self {
        Self {
            issue_id,
            title: title.into(),
        }
    }

    /// Opens a new issue with a generated id.
    pub fn titled(title: impl Into<String>) -> Self {
        Self::new(AggregateId::new(), title)
    }
}

impl Command for OpenIssue {
    type Aggregate = Issue;

    fn command_type() -> &'static str {
        "OpenIssue"
    }

    fn aggregate_id(&self) -> AggregateId {
        self.issue_id
    }

    fn execute_on(&self, issue: &Issue) -> Result<Vec<IssueEvent>, IssueError> {
        if issue.is_opened() {
            return Err(IssueError::AlreadyOpened);
        }

        let title = self.title.trim();
        if title.is_empty() {
            return Err(IssueError::TitleRequired);
        }

        Ok(vec![IssueEvent::issue_opened(title)])
    }
}

/// Command to leave a comment on an issue.
#[derive(Debug, Clone)]
pub struct CommentIssue {
    pub issue_id: AggregateId,
    pub message: String,
}

impl CommentIssue {
    pub fn new(issue_id: AggregateId, message: impl Into<String>) -> Self {
        Self {
            issue_id,
            message: message.into(),
        }
    }
}

impl Command for CommentIssue {
    type Aggregate = Issue;

    fn command_type() -> &'static str {
        "CommentIssue"
    }

    fn aggregate_id(&self) -> AggregateId {
        self.issue_id
    }

    /// A blank or all-whitespace message records nothing and is not an error.
    fn execute_on(&self, issue: &Issue) -> Result<Vec<IssueEvent>, IssueError> {
        if self.message.trim().is_empty() {
            return Ok(vec![]);
        }

        if !issue.state().can_comment() {
            return Err(IssueError::Closed);
        }

        Ok(vec![IssueEvent::issue_commented(self.message.clone())])
    }
}

/// Command to close an issue.
#[derive(Debug, Clone)]
pub struct CloseIssue {
    pub issue_id: AggregateId,

    /// Optional explanation kept on the event.
    pub reason: Option<String>,
}

impl CloseIssue {
    pub fn new(issue_id: AggregateId, reason: Option<String>) -> Self {
        Self { issue_id, reason }
    }
}

impl Command for CloseIssue {
    type Aggregate = Issue;

    fn command_type() -> &'static str {
        "CloseIssue"
    }

    fn aggregate_id(&self) -> AggregateId {
        self.issue_id
    }

    /// Closing an issue that is already closed produces no events.
    fn execute_on(&self, issue: &Issue) -> Result<Vec<IssueEvent>, IssueError> {
        if issue.is_closed() {
            return Ok(vec![]);
        }

        let reason = self
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_owned);

        Ok(vec![IssueEvent::issue_closed(reason)])
    }
}
