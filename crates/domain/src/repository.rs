//! Loading and saving aggregates.

use std::marker::PhantomData;

use async_trait::async_trait;
use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, Version};

use crate::aggregate::{Aggregate, DomainEvent, Entity, SnapshotCapable};
use crate::error::DomainError;

/// Storage of aggregates by identity.
#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Loads the aggregate with the given id.
    ///
    /// Fails with [`DomainError::AggregateNotFound`] if it has no history.
    async fn find(&self, id: AggregateId) -> Result<A, DomainError>;

    /// Commits the aggregate's pending events and persists them.
    ///
    /// Returns the committed events. On failure the events are put back into
    /// the pending buffer.
    async fn save(&self, aggregate: &mut A) -> Result<Vec<A::Event>, DomainError>;
}

/// Repository that stores aggregates as event streams.
///
/// Saves are guarded by optimistic concurrency: the append expects the
/// stream to still be at the version the aggregate was loaded at.
pub struct EventSourcedRepository<S, A> {
    store: S,
    _phantom: PhantomData<fn() -> A>,
}

impl<S, A> EventSourcedRepository<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn build_envelopes(
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut version = current_version;
        events
            .iter()
            .map(|event| -> Result<EventEnvelope, DomainError> {
                version = version.next();
                let envelope = EventEnvelope::builder()
                    .aggregate_id(aggregate_id)
                    .aggregate_type(A::aggregate_type())
                    .event_type(event.event_type())
                    .version(version)
                    .payload(event)?
                    .build()?;
                Ok(envelope)
            })
            .collect()
    }

    async fn persist(&self, aggregate: &mut A, events: &[A::Event]) -> Result<(), DomainError> {
        let current = aggregate.version();
        let envelopes = Self::build_envelopes(aggregate.id(), current, events)?;

        let options = if current == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current)
        };

        let new_version = self.store.append(envelopes, options).await?;
        aggregate.set_version(new_version);

        if aggregate.should_snapshot(current) {
            self.snapshot(aggregate).await;
        }

        Ok(())
    }

    /// Snapshots are an optimization; a failure is logged and otherwise ignored.
    async fn snapshot(&self, aggregate: &A) {
        let result = match Snapshot::from_state(
            aggregate.id(),
            A::aggregate_type(),
            aggregate.version(),
            aggregate,
        ) {
            Ok(snapshot) => self.store.save_snapshot(snapshot).await.map_err(DomainError::from),
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(()) => tracing::debug!(
                aggregate_id = %aggregate.id(),
                version = %aggregate.version(),
                "snapshot saved"
            ),
            Err(err) => tracing::warn!(
                aggregate_id = %aggregate.id(),
                error = %err,
                "failed to save snapshot"
            ),
        }
    }
}

#[async_trait]
impl<S, A> Repository<A> for EventSourcedRepository<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    async fn find(&self, id: AggregateId) -> Result<A, DomainError> {
        let (snapshot, envelopes) = self.store.load_aggregate(id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => {
                let mut aggregate: A = snapshot.restore()?;
                aggregate.set_version(snapshot.version);
                aggregate
            }
            None if envelopes.is_empty() => {
                return Err(DomainError::AggregateNotFound {
                    aggregate_type: A::aggregate_type(),
                    aggregate_id: id,
                });
            }
            None => A::with_id(id),
        };

        let replayed = envelopes.len();
        for envelope in envelopes {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(&event);
            aggregate.set_version(envelope.version);
        }

        tracing::debug!(
            aggregate_id = %id,
            replayed,
            version = %aggregate.version(),
            "aggregate loaded"
        );
        Ok(aggregate)
    }

    async fn save(&self, aggregate: &mut A) -> Result<Vec<A::Event>, DomainError> {
        let events = aggregate.commit();
        if events.is_empty() {
            return Ok(events);
        }

        match self.persist(aggregate, &events).await {
            Ok(()) => Ok(events),
            Err(err) => {
                aggregate.pending_events_mut().extend(events);
                Err(err)
            }
        }
    }
}
