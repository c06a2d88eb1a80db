//! Issue service providing a simplified API for issue operations.

use common::AggregateId;
use event_store::EventStore;

use crate::aggregate::Entity;
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::repository::{EventSourcedRepository, Repository};

use super::{CloseIssue, CommentIssue, Issue, OpenIssue};

/// Service for managing issues.
///
/// Wraps a [`CommandHandler`] over an event-sourced repository so callers
/// only deal with commands and issues.
pub struct IssueService<S: EventStore> {
    handler: CommandHandler<EventSourcedRepository<S, Issue>>,
}

impl<S: EventStore> IssueService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(EventSourcedRepository::new(store)),
        }
    }

    pub fn handler(&self) -> &CommandHandler<EventSourcedRepository<S, Issue>> {
        &self.handler
    }

    /// Returns the underlying event store.
    pub fn store(&self) -> &S {
        self.handler.repository().store()
    }

    #[tracing::instrument(skip(self))]
    pub async fn open_issue(&self, cmd: OpenIssue) -> Result<CommandResult<Issue>, DomainError> {
        let result = self.handler.handle_new(cmd).await?;
        tracing::info!(issue_id = %result.aggregate.id(), "issue opened");
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn comment_issue(
        &self,
        cmd: CommentIssue,
    ) -> Result<CommandResult<Issue>, DomainError> {
        self.handler.handle(cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn close_issue(&self, cmd: CloseIssue) -> Result<CommandResult<Issue>, DomainError> {
        self.handler.handle(cmd).await
    }

    /// Loads an issue by ID.
    ///
    /// Returns None if the issue doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_issue(&self, issue_id: AggregateId) -> Result<Option<Issue>, DomainError> {
        match self.handler.repository().find(issue_id).await {
            Ok(issue) => Ok(Some(issue)),
            Err(DomainError::AggregateNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Ids of every opened issue, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_issue_ids(&self) -> Result<Vec<AggregateId>, DomainError> {
        let opened = self.store().get_events_by_type("IssueOpened").await?;
        Ok(opened.into_iter().map(|e| e.aggregate_id).collect())
    }
}
