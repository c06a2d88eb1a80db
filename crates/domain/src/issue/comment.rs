use common::CommentId;
use serde::{Deserialize, Serialize};

use crate::aggregate::Entity;

/// A message left on an issue.
///
/// Comments are identified by their [`CommentId`] and never change after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    id: CommentId,
    message: String,
}

impl Comment {
    pub fn new(id: CommentId, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.id
    }
}
