//! Core aggregate, entity and domain event traits.

use std::fmt::Debug;
use std::hash::Hash;

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

use crate::command::Command;

/// An object defined by its identity rather than its attributes.
///
/// The identifier is assigned at construction and never changes.
pub trait Entity {
    type Id: Copy + Eq + Hash + Debug + std::fmt::Display;

    fn id(&self) -> Self::Id;
}

/// A fact that happened in the domain.
///
/// Events are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    /// Stable name used for storage and filtering.
    fn event_type(&self) -> &'static str;
}

/// The state change an event causes on an aggregate.
///
/// Implementations must be deterministic: the same event applied to the same
/// state always yields the same state. Re-applying an event is not guaranteed
/// to be idempotent.
pub trait ApplyTo<A> {
    fn apply_to(&self, aggregate: &mut A);
}

/// Ordered buffer of events produced by an aggregate but not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvents<E> {
    events: Vec<E>,
}

impl<E> PendingEvents<E> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: E) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.events.iter()
    }

    /// Returns every buffered event in production order and leaves the
    /// buffer empty.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Extend<E> for PendingEvents<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl<'a, E> IntoIterator for &'a PendingEvents<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// An event-sourced consistency boundary.
///
/// State changes only through events. Deciding what happened belongs to the
/// command ([`Command::execute_on`]), remembering it belongs to the event
/// ([`ApplyTo::apply_to`]) and persisting it belongs to a repository, which
/// drains the aggregate with [`Aggregate::commit`].
///
/// An aggregate is either clean or has uncommitted events: `execute` moves it
/// to the latter when at least one event is produced, `commit` always moves it
/// back to clean.
pub trait Aggregate: Entity<Id = AggregateId> + Send + Sync + Sized {
    type Event: DomainEvent + ApplyTo<Self>;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Name of the aggregate kind, used to tag stored events.
    fn aggregate_type() -> &'static str;

    /// Creates an aggregate with the given identity and no history.
    fn with_id(id: AggregateId) -> Self;

    /// Version of the last persisted event that is reflected in this state.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn pending_events(&self) -> &PendingEvents<Self::Event>;

    fn pending_events_mut(&mut self) -> &mut PendingEvents<Self::Event>;

    /// Applies an already recorded event without buffering it.
    ///
    /// Used when rebuilding an aggregate from its history.
    fn apply(&mut self, event: &Self::Event) {
        event.apply_to(self);
    }

    fn apply_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Self::Event>)
    where
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
        }
    }

    /// Runs a command against the current state.
    ///
    /// Every produced event is appended to the pending buffer and then
    /// applied, in production order. A command that produces no events is a
    /// valid outcome. Returns the number of events produced.
    fn execute<C>(&mut self, command: &C) -> Result<usize, Self::Error>
    where
        C: Command<Aggregate = Self>,
    {
        let events = command.execute_on(self)?;
        let produced = events.len();
        for event in events {
            self.pending_events_mut().push(event.clone());
            self.apply(&event);
        }
        Ok(produced)
    }

    /// Drains the uncommitted events, oldest first.
    fn commit(&mut self) -> Vec<Self::Event> {
        self.pending_events_mut().take()
    }

    fn has_uncommitted_events(&self) -> bool {
        !self.pending_events().is_empty()
    }
}

/// Aggregates whose state can be stored as a snapshot.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Number of events between two snapshots.
    fn snapshot_interval() -> u64 {
        100
    }

    /// Whether moving from `previous` to the current version crossed a
    /// snapshot boundary.
    fn should_snapshot(&self, previous: Version) -> bool {
        let interval = Self::snapshot_interval();
        interval > 0 && self.version().as_u64() / interval > previous.as_u64() / interval
    }
}
