//! `penboard-core`: shared domain building blocks.
//!
//! Typed identifiers, the domain error model and field-keyed validation
//! errors. No storage or HTTP concerns live here.

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;

pub use entity::{Entity, Owned};
pub use error::DomainError;
pub use id::{CommentId, PostId, UserId};
pub use validation::{NON_FIELD_ERRORS, REQUIRED_FIELD, ValidationErrors};
