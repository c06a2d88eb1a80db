//! Event storage for event-sourced aggregates.
//!
//! Events are stored as [`EventEnvelope`]s: a JSON payload plus the stream
//! metadata (aggregate, version, timestamp) needed to replay them in order.
//! [`InMemoryEventStore`] is the bundled [`EventStore`] implementation.

pub mod error;
pub mod event;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt};
