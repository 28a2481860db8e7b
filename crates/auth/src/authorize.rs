//! Ownership-based authorization.
//!
//! Every mutation follows one rule: the resource owner may change it, and so
//! may staff. Reads are public.

use thiserror::Error;

use penboard_core::Owned;

use crate::principal::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// Why an authorization check passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Owner,
    Staff,
}

impl Grant {
    pub fn as_str(self) -> &'static str {
        match self {
            Grant::Owner => "owner",
            Grant::Staff => "staff",
        }
    }
}

/// Allow `principal` to mutate `resource` if it owns it or is staff.
pub fn authorize_owner_or_staff<R: Owned>(principal: &Principal, resource: &R) -> Result<Grant, AuthzError> {
    if principal.is(resource.owner_id()) {
        Ok(Grant::Owner)
    } else if principal.is_staff {
        Ok(Grant::Staff)
    } else {
        Err(AuthzError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ))
    }
}

/// Staff-only operations (e.g. changing privilege flags).
pub fn require_staff(principal: &Principal, action: &str) -> Result<Grant, AuthzError> {
    if principal.is_staff {
        Ok(Grant::Staff)
    } else {
        Err(AuthzError::Forbidden(format!("only staff may {action}")))
    }
}
