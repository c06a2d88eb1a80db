//! Domain layer of the issue tracker.
//!
//! Aggregates are mutated only through events. A [`Command`] decides which
//! events to produce against the current state, each event knows how to
//! apply itself ([`ApplyTo`]), and the aggregate keeps them in a
//! [`PendingEvents`] buffer until a [`Repository`] commits and persists them.
//! Because the decision logic lives on the commands, a single
//! [`CommandHandler`] serves every command type.

pub mod aggregate;
pub mod command;
pub mod error;
pub mod issue;
pub mod repository;

pub use aggregate::{Aggregate, ApplyTo, DomainEvent, Entity, PendingEvents, SnapshotCapable};
pub use command::{Command, CommandHandler, CommandResult, ErrorOf, EventOf};
pub use error::DomainError;
pub use issue::{
    CloseIssue, Comment, CommentIssue, Issue, IssueClosed, IssueCommented, IssueError,
    IssueEvent, IssueOpened, IssueService, IssueState, OpenIssue,
};
pub use repository::{EventSourcedRepository, Repository};
