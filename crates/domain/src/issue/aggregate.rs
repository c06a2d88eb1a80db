//! Issue aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, CommentId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, Entity, PendingEvents, SnapshotCapable};

use super::{Comment, IssueError, IssueEvent, IssueState};

/// Issue aggregate root.
///
/// Holds the comments left on an issue. State only changes when an
/// [`IssueEvent`] is applied, either through [`Aggregate::execute`] or while
/// replaying history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    id: AggregateId,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    title: Option<String>,

    opened_at: Option<DateTime<Utc>>,

    state: IssueState,

    /// Comments in the order they were made, unique by id.
    comments: Vec<Comment>,

    #[serde(skip)]
    pending: PendingEvents<IssueEvent>,
}

impl Issue {
    /// Creates an issue with a fresh identity and no history.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Entity for Issue {
    type Id = AggregateId;

    fn id(&self) -> AggregateId {
        self.id
    }
}

impl Aggregate for Issue {
    type Event = IssueEvent;
    type Error = IssueError;

    fn aggregate_type() -> &'static str {
        "Issue"
    }

    fn with_id(id: AggregateId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn pending_events(&self) -> &PendingEvents<IssueEvent> {
        &self.pending
    }

    fn pending_events_mut(&mut self) -> &mut PendingEvents<IssueEvent> {
        &mut self.pending
    }
}

impl SnapshotCapable for Issue {
    fn snapshot_interval() -> u64 {
        50
    }
}

// Query methods
impl Issue {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn state(&self) -> IssueState {
        self.state
    }

    /// Comments in the order they were made.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id() == id)
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Returns true once an `IssueOpened` event has been applied.
    pub fn is_opened(&self) -> bool {
        self.title.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }
}

// Mutators used by event application
impl Issue {
    pub(super) fn open(&mut self, title: String, opened_at: DateTime<Utc>) {
        self.title = Some(title);
        self.opened_at = Some(opened_at);
        self.state = IssueState::Open;
    }

    pub(super) fn add_comment(&mut self, comment: Comment) {
        if self.comment(comment.id()).is_none() {
            self.comments.push(comment);
        }
    }

    pub(super) fn set_state(&mut self, state: IssueState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;
    use crate::issue::{CloseIssue, CommentIssue, OpenIssue};

    #[test]
    fn test_new_issue_is_clean() {
        let issue = Issue::new();

        assert_eq!(issue.version(), Version::initial());
        assert_eq!(issue.state(), IssueState::Open);
        assert!(issue.comments().is_empty());
        assert!(!issue.is_opened());
        assert!(!issue.has_uncommitted_events());
    }

    #[test]
    fn test_new_issues_get_distinct_ids() {
        assert_ne!(Issue::new().id(), Issue::new().id());
    }

    #[test]
    fn test_full_issue_lifecycle() {
        let mut issue = Issue::new();
        let id = issue.id();

        issue.execute(&OpenIssue::new(id, "Export drops rows")).unwrap();
        issue.execute(&CommentIssue::new(id, "Only for CSV")).unwrap();
        issue
            .execute(&CloseIssue::new(id, Some("fixed in 1.4".to_string())))
            .unwrap();

        assert_eq!(issue.title(), Some("Export drops rows"));
        assert!(issue.opened_at().is_some());
        assert_eq!(issue.comment_count(), 1);
        assert!(issue.is_closed());

        let events = issue.commit();
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, ["IssueOpened", "IssueCommented", "IssueClosed"]);
    }

    #[test]
    fn test_comment_lookup_by_id() {
        let mut issue = Issue::new();
        let comment_id = CommentId::new();
        issue.add_comment(Comment::new(comment_id, "First!"));

        assert_eq!(issue.comment(comment_id).map(Comment::message), Some("First!"));
        assert!(issue.comment(CommentId::new()).is_none());
    }

    #[test]
    fn test_serialization_skips_pending_events() {
        let mut issue = Issue::new();
        issue
            .execute(&CommentIssue::new(issue.id(), "Still pending"))
            .unwrap();

        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("pending").is_none());

        let restored: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(restored.id(), issue.id());
        assert_eq!(restored.comment_count(), 1);
        assert!(!restored.has_uncommitted_events());
    }
}
