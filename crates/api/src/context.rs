use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use penboard_auth::Principal;
use penboard_core::UserId;

use crate::app::errors::ApiError;

/// Authenticated caller, inserted into request extensions by the auth middleware.
///
/// As an extractor it rejects with 401 when the request carried no bearer
/// token, which makes a route authenticated simply by naming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for PrincipalContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .cloned()
            .ok_or_else(|| ApiError::unauthenticated("Authentication credentials were not provided."))
    }
}
