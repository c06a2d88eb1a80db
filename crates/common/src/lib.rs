//! Identifiers shared by the event store, the domain and the HTTP layer.

pub mod types;

pub use types::{AggregateId, CommentId, IdParseError};
