//! Commands and the generic command handler.

use std::time::Instant;

use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::repository::Repository;

/// Events produced by aggregate `A`.
pub type EventOf<A> = <A as Aggregate>::Event;

/// Error raised by aggregate `A` when a command is rejected.
pub type ErrorOf<A> = <A as Aggregate>::Error;

/// An intended state change, together with the decision logic that turns it
/// into events.
///
/// `execute_on` is a pure function of the command's fields and the
/// aggregate's current state: it never mutates the aggregate and performs no
/// I/O. Returning an empty list means there is nothing to record.
pub trait Command: std::fmt::Debug + Send + Sync {
    type Aggregate: Aggregate;

    /// Stable command name used in logs and metrics.
    fn command_type() -> &'static str;

    /// The aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    fn execute_on(
        &self,
        aggregate: &Self::Aggregate,
    ) -> Result<Vec<EventOf<Self::Aggregate>>, ErrorOf<Self::Aggregate>>;
}

/// Outcome of a handled command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after the new events were applied.
    pub aggregate: A,

    /// The events that were committed, in production order.
    pub events: Vec<A::Event>,

    /// Aggregate version after the save.
    pub new_version: Version,
}

/// Loads an aggregate, runs a command against it and saves the result.
///
/// Because commands carry their own decision logic, one handler serves every
/// command of every aggregate the repository can load.
pub struct CommandHandler<R> {
    repository: R,
}

impl<R> CommandHandler<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Handles a command against an existing aggregate.
    ///
    /// Fails with [`DomainError::AggregateNotFound`] if the repository does
    /// not know the target.
    #[tracing::instrument(
        skip(self, command),
        fields(command = C::command_type(), aggregate_id = %command.aggregate_id())
    )]
    pub async fn handle<C>(&self, command: C) -> Result<CommandResult<C::Aggregate>, DomainError>
    where
        C: Command,
        R: Repository<C::Aggregate>,
        DomainError: From<ErrorOf<C::Aggregate>>,
    {
        let aggregate = self.repository.find(command.aggregate_id()).await?;
        self.run(aggregate, &command).await
    }

    /// Handles a command that brings a new aggregate into existence.
    ///
    /// The aggregate starts empty; saving it fails with a concurrency
    /// conflict if a stream with the same id already exists.
    #[tracing::instrument(
        skip(self, command),
        fields(command = C::command_type(), aggregate_id = %command.aggregate_id())
    )]
    pub async fn handle_new<C>(
        &self,
        command: C,
    ) -> Result<CommandResult<C::Aggregate>, DomainError>
    where
        C: Command,
        R: Repository<C::Aggregate>,
        DomainError: From<ErrorOf<C::Aggregate>>,
    {
        let aggregate = <C::Aggregate as Aggregate>::with_id(command.aggregate_id());
        self.run(aggregate, &command).await
    }

    async fn run<C>(
        &self,
        mut aggregate: C::Aggregate,
        command: &C,
    ) -> Result<CommandResult<C::Aggregate>, DomainError>
    where
        C: Command,
        R: Repository<C::Aggregate>,
        DomainError: From<ErrorOf<C::Aggregate>>,
    {
        let started = Instant::now();
        let command_type = C::command_type();

        if let Err(err) = aggregate.execute(command) {
            metrics::counter!("commands_rejected_total", "command" => command_type).increment(1);
            tracing::warn!(error = %err, "command rejected");
            return Err(err.into());
        }

        let events = self.repository.save(&mut aggregate).await?;

        metrics::counter!("commands_handled_total", "command" => command_type).increment(1);
        metrics::counter!("events_committed_total", "command" => command_type)
            .increment(events.len() as u64);
        metrics::histogram!("command_duration_seconds", "command" => command_type)
            .record(started.elapsed().as_secs_f64());

        if events.is_empty() {
            tracing::debug!("command produced no events");
        } else {
            tracing::debug!(events = events.len(), version = %aggregate.version(), "events committed");
        }

        Ok(CommandResult {
            new_version: aggregate.version(),
            aggregate,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{CloseIssue, CommentIssue, Issue, IssueError, IssueEvent, OpenIssue};
    use crate::repository::EventSourcedRepository;
    use event_store::{EventStoreError, InMemoryEventStore};

    fn handler(
        store: &InMemoryEventStore,
    ) -> CommandHandler<EventSourcedRepository<InMemoryEventStore, Issue>> {
        CommandHandler::new(EventSourcedRepository::new(store.clone()))
    }

    async fn opened(
        handler: &CommandHandler<EventSourcedRepository<InMemoryEventStore, Issue>>,
    ) -> AggregateId {
        let id = AggregateId::new();
        handler
            .handle_new(OpenIssue::new(id, "Search returns stale results"))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn handle_new_persists_the_first_event() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);
        let id = AggregateId::new();

        let result = handler
            .handle_new(OpenIssue::new(id, "Search returns stale results"))
            .await
            .unwrap();

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.aggregate.title(), Some("Search returns stale results"));
        assert!(!result.aggregate.has_uncommitted_events());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn same_handler_serves_every_command() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);
        let id = opened(&handler).await;

        handler
            .handle(CommentIssue::new(id, "Seen on staging too"))
            .await
            .unwrap();
        let result = handler.handle(CloseIssue::new(id, None)).await.unwrap();

        assert_eq!(result.new_version, Version::new(3));
        assert!(result.aggregate.is_closed());
        assert_eq!(result.aggregate.comment_count(), 1);
    }

    #[tokio::test]
    async fn unknown_aggregate_is_not_found() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);

        let result = handler
            .handle(CommentIssue::new(AggregateId::new(), "Hello?"))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::AggregateNotFound {
                aggregate_type: "Issue",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn rejected_command_persists_nothing() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);
        let id = opened(&handler).await;
        handler.handle(CloseIssue::new(id, None)).await.unwrap();

        let result = handler.handle(CommentIssue::new(id, "Reopen please")).await;

        assert!(matches!(result, Err(DomainError::Issue(IssueError::Closed))));
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn no_op_command_keeps_the_version() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);
        let id = opened(&handler).await;

        let result = handler.handle(CommentIssue::new(id, "   ")).await.unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn creating_twice_conflicts() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);
        let id = opened(&handler).await;

        let result = handler.handle_new(OpenIssue::new(id, "Duplicate")).await;

        assert!(matches!(
            result,
            Err(DomainError::EventStore(
                EventStoreError::ConcurrencyConflict { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn committed_events_match_what_was_produced() {
        let store = InMemoryEventStore::new();
        let handler = handler(&store);
        let id = opened(&handler).await;

        let result = handler
            .handle(CommentIssue::new(id, "Any updates on this?"))
            .await
            .unwrap();

        let [IssueEvent::IssueCommented(event)] = result.events.as_slice() else {
            panic!("expected a single IssueCommented event");
        };
        assert_eq!(event.message, "Any updates on this?");
        assert!(result.aggregate.comment(event.comment_id).is_some());
    }
}
