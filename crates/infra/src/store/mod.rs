//! Blog storage boundary.
//!
//! One trait covers users, posts and comments. Implementations own id
//! assignment, uniqueness of user identifiers and cascading deletes
//! (user → posts/comments, post → comments).

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;

use penboard_core::{CommentId, PostId, UserId};
use penboard_posts::{Comment, CommentChanges, NewComment, NewPost, Post, PostChanges};
use penboard_users::{NewUser, User, UserChanges};

pub use in_memory::InMemoryBlogStore;
pub use postgres::PostgresBlogStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique user attributes already taken, in column order.
    #[error("duplicate value for {}", fields.join(", "))]
    Duplicate { fields: Vec<&'static str> },

    #[error("row not found")]
    NotFound,

    /// A foreign key points at a row that does not exist.
    #[error("referenced row does not exist: {0}")]
    MissingReference(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait BlogStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// All users, ordered by id.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Apply `changes` and bump `updated_at`. `NotFound` if the row is gone.
    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<User>;
    /// Delete a user with all of their posts and comments.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>>;
    async fn list_posts(&self) -> StoreResult<Vec<Post>>;
    async fn update_post(&self, id: PostId, changes: PostChanges) -> StoreResult<Post>;
    /// Delete a post with its comments.
    async fn delete_post(&self, id: PostId) -> StoreResult<()>;

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;
    /// A comment only resolves under the post it belongs to.
    async fn get_comment(&self, post_id: PostId, id: CommentId) -> StoreResult<Option<Comment>>;
    async fn list_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>>;
    async fn update_comment(&self, post_id: PostId, id: CommentId, changes: CommentChanges) -> StoreResult<Comment>;
    async fn delete_comment(&self, post_id: PostId, id: CommentId) -> StoreResult<()>;
}

/// Shared handle used by the application layer.
pub type DynBlogStore = Arc<dyn BlogStore>;
