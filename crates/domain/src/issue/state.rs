//! Issue lifecycle.

use serde::{Deserialize, Serialize};

/// Whether an issue still accepts comments.
///
/// ```text
/// Open ──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IssueState {
    #[default]
    Open,

    /// Terminal state.
    Closed,
}

impl IssueState {
    pub fn can_comment(&self) -> bool {
        matches!(self, IssueState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "Open",
            IssueState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_open() {
        assert_eq!(IssueState::default(), IssueState::Open);
    }

    #[test]
    fn test_only_open_issues_take_comments() {
        assert!(IssueState::Open.can_comment());
        assert!(!IssueState::Closed.can_comment());
    }

    #[test]
    fn test_display() {
        assert_eq!(IssueState::Open.to_string(), "Open");
        assert_eq!(IssueState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&IssueState::Closed).unwrap();
        assert_eq!(json, "\"Closed\"");
        let state: IssueState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, IssueState::Closed);
    }
}
