//! Posts domain module (posts and their comments).
//!
//! Content rules only: title screening, the minimum posting age and
//! required-field checks. Persistence and permissions live elsewhere.

pub mod comment;
pub mod eligibility;
pub mod post;
pub mod validators;

pub use comment::{Comment, CommentChanges, CommentPatch, CreateComment, NewComment, missing_post_error};
pub use eligibility::{MINIMUM_POSTING_AGE, ensure_can_post};
pub use post::{CreatePost, NewPost, Post, PostChanges, PostPatch, ValidatedPost};
pub use validators::{FORBIDDEN_TITLE_WORDS, validate_title};
