//! API-side authorization guards.
//!
//! Handlers call these after loading the target row and before validating
//! or persisting anything.

use penboard_auth::{AuthzError, authorize_owner_or_staff, require_staff};
use penboard_core::Owned;

use crate::context::PrincipalContext;

/// Owner-or-staff check for mutating `resource`.
pub fn ensure_owner_or_staff<R: Owned>(principal: &PrincipalContext, resource: &R) -> Result<(), AuthzError> {
    let grant = authorize_owner_or_staff(principal.principal(), resource).inspect_err(|_| {
        tracing::warn!(
            user_id = %principal.user_id(),
            resource_id = %resource.id(),
            "mutation denied"
        );
    })?;

    tracing::debug!(
        user_id = %principal.user_id(),
        resource_id = %resource.id(),
        grant = grant.as_str(),
        "mutation allowed"
    );
    Ok(())
}

/// Staff-only actions, such as changing account flags.
pub fn ensure_staff(principal: &PrincipalContext, action: &str) -> Result<(), AuthzError> {
    require_staff(principal.principal(), action).map(|_| ())
}
