//! Strongly-typed identifiers used across the domain.
//!
//! Rows are keyed by database-assigned serial integers; the newtypes keep a
//! post id from being passed where a user id is expected.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a registered user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a post.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(i64);

/// Identifier of a comment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .parse::<i64>()
                    .map_err(|e| DomainError::InvalidId {
                        entity: $name,
                        reason: e.to_string(),
                    })?;
                if value <= 0 {
                    return Err(DomainError::InvalidId {
                        entity: $name,
                        reason: "must be positive".to_string(),
                    });
                }
                Ok(Self(value))
            }
        }
    };
}

impl_serial_newtype!(UserId, "user");
impl_serial_newtype!(PostId, "post");
impl_serial_newtype!(CommentId, "comment");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_integers() {
        assert_eq!("42".parse::<PostId>().unwrap(), PostId::new(42));
    }

    #[test]
    fn rejects_non_numeric_and_non_positive() {
        assert!("abc".parse::<UserId>().is_err());
        assert!("0".parse::<CommentId>().is_err());
        assert!("-3".parse::<PostId>().is_err());
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
