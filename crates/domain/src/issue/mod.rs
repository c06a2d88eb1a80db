//! Issue aggregate and related types.

mod aggregate;
mod comment;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::Issue;
pub use comment::Comment;
pub use commands::{CloseIssue, CommentIssue, OpenIssue};
pub use events::{IssueClosed, IssueCommented, IssueEvent, IssueOpened};
pub use service::IssueService;
pub use state::IssueState;

use thiserror::Error;

/// Errors that can occur during issue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    /// An issue cannot be opened without a title.
    #[error("Issue title is required")]
    TitleRequired,

    #[error("Issue already opened")]
    AlreadyOpened,

    /// Closed issues accept no further comments.
    #[error("Issue is closed")]
    Closed,
}
