use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{AppendOptions, EventStore, validate_events_for_append};
use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version};

#[derive(Default)]
struct Inner {
    /// Every event in insertion order.
    log: Vec<EventEnvelope>,
    /// Positions in `log` per aggregate, in version order.
    streams: HashMap<AggregateId, Vec<usize>>,
    snapshots: HashMap<AggregateId, Snapshot>,
}

impl Inner {
    fn stream(&self, aggregate_id: AggregateId) -> impl Iterator<Item = &EventEnvelope> {
        self.streams
            .get(&aggregate_id)
            .into_iter()
            .flatten()
            .map(|&index| &self.log[index])
    }

    fn version_of(&self, aggregate_id: AggregateId) -> Version {
        self.streams
            .get(&aggregate_id)
            .map(|positions| Version::new(positions.len() as u64))
            .unwrap_or_default()
    }
}

/// Event store held entirely in memory.
///
/// Cloning yields another handle to the same storage. Appends take a single
/// write lock, so a batch is either fully visible or not at all.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events across all aggregates.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }

    /// Drops all events and snapshots.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.log.clear();
        inner.streams.clear();
        inner.snapshots.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let mut inner = self.inner.write().await;
        let current = inner.version_of(aggregate_id);

        if let Some(expected) = options.expected_version
            && expected != current
        {
            tracing::debug!(%aggregate_id, %expected, %current, "rejecting append: stale version");
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current,
            });
        }

        if events[0].version != current.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: events[0].version,
                actual: current,
            });
        }

        let start = inner.log.len();
        let count = events.len();
        inner.log.extend(events);
        inner
            .streams
            .entry(aggregate_id)
            .or_default()
            .extend(start..start + count);

        Ok(inner.version_of(aggregate_id))
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner.stream(aggregate_id).cloned().collect())
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .stream(aggregate_id)
            .filter(|e| e.version >= from_version)
            .cloned()
            .collect())
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .log
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .contains_key(&aggregate_id)
            .then(|| inner.version_of(aggregate_id)))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.snapshots.insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        let inner = self.inner.read().await;
        Ok(inner.snapshots.get(&aggregate_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;

    fn event(aggregate_id: AggregateId, version: u64, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Issue")
            .event_type(event_type)
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_to_new_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(
                vec![event(id, 1, "IssueOpened"), event(id, 2, "IssueCommented")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(2));
        assert_eq!(store.event_count().await, 2);
        assert_eq!(store.get_events_for_aggregate(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, 1, "IssueOpened")], AppendOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .append(vec![event(id, 2, "IssueCommented")], AppendOptions::expect_new())
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { expected, actual, .. })
                if expected == Version::initial() && actual == Version::first()
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn batch_must_continue_the_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, 1, "IssueOpened")], AppendOptions::new())
            .await
            .unwrap();

        let result = store
            .append(vec![event(id, 1, "IssueCommented")], AppendOptions::new())
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn matching_expected_version_succeeds() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, 1, "IssueOpened")], AppendOptions::expect_new())
            .await
            .unwrap();

        let version = store
            .append(
                vec![event(id, 2, "IssueCommented")],
                AppendOptions::expect_version(Version::first()),
            )
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));
    }

    #[tokio::test]
    async fn events_from_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(
                vec![
                    event(id, 1, "IssueOpened"),
                    event(id, 2, "IssueCommented"),
                    event(id, 3, "IssueClosed"),
                ],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let tail = store
            .get_events_for_aggregate_from_version(id, Version::new(2))
            .await
            .unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].version, Version::new(2));
        assert_eq!(tail[1].event_type, "IssueClosed");
    }

    #[tokio::test]
    async fn events_by_type_span_aggregates() {
        let store = InMemoryEventStore::new();
        let first = AggregateId::new();
        let second = AggregateId::new();
        store
            .append(vec![event(first, 1, "IssueOpened")], AppendOptions::new())
            .await
            .unwrap();
        store
            .append(vec![event(second, 1, "IssueOpened")], AppendOptions::new())
            .await
            .unwrap();
        store
            .append(vec![event(first, 2, "IssueCommented")], AppendOptions::new())
            .await
            .unwrap();

        let opened = store.get_events_by_type("IssueOpened").await.unwrap();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].aggregate_id, first);
        assert_eq!(opened[1].aggregate_id, second);
    }

    #[tokio::test]
    async fn aggregate_version_and_existence() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        assert_eq!(store.get_aggregate_version(id).await.unwrap(), None);
        assert!(!store.aggregate_exists(id).await.unwrap());

        store
            .append(
                vec![event(id, 1, "IssueOpened"), event(id, 2, "IssueCommented")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            store.get_aggregate_version(id).await.unwrap(),
            Some(Version::new(2))
        );
        assert!(store.aggregate_exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn load_aggregate_skips_events_covered_by_snapshot() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(
                vec![
                    event(id, 1, "IssueOpened"),
                    event(id, 2, "IssueCommented"),
                    event(id, 3, "IssueCommented"),
                ],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .save_snapshot(Snapshot::new(
                id,
                "Issue",
                Version::new(2),
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        let (snapshot, events) = store.load_aggregate(id).await.unwrap();
        assert_eq!(snapshot.unwrap().version, Version::new(2));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, Version::new(3));
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, 1, "IssueOpened")], AppendOptions::new())
            .await
            .unwrap();

        store.clear().await;

        assert_eq!(store.event_count().await, 0);
        assert!(store.get_snapshot(id).await.unwrap().is_none());
    }
}
