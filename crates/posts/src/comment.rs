//! Comment model and input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use penboard_core::validation::required;
use penboard_core::{CommentId, Entity, Owned, PostId, UserId, ValidationErrors};

/// A persisted comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub user_id: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

/// Comment creation input. The parent post comes from the route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateComment {
    pub text: Option<String>,
}

/// A comment row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    pub user_id: UserId,
    pub post_id: PostId,
}

impl CreateComment {
    pub fn validate(self, user_id: UserId, post_id: PostId) -> Result<NewComment, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let text = required(&mut errors, "text", self.text);

        match text {
            Some(text) => Ok(NewComment { text, user_id, post_id }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentChanges {
    pub text: Option<String>,
}

impl CommentPatch {
    pub fn validate(self) -> Result<CommentChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let text = self.text.and_then(|v| required(&mut errors, "text", Some(v)));
        errors.finish(|| CommentChanges { text })
    }
}

/// Error reported when a comment targets a post that does not exist.
pub fn missing_post_error(post_id: PostId) -> ValidationErrors {
    ValidationErrors::non_field(format!("There's no any post with given id {post_id}"))
}
