use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{self, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::Level;

use penboard_auth::{JwtValidator, Principal};
use penboard_infra::DynBlogStore;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

const INVALID_TOKEN: &str = "Given token not valid for any token type";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: DynBlogStore,
}

/// Resolve an optional bearer token into a [`PrincipalContext`].
///
/// Requests without a bearer `Authorization` header pass through anonymously;
/// open routes serve them and authenticated routes reject them via the
/// extractor. A malformed bearer header is rejected here with 401, as is a
/// token whose user has been deleted or deactivated since it was issued.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(None) => return next.run(req).await,
        Ok(Some(token)) => token,
        Err(e) => return e.into_response(),
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "rejected bearer token");
            return ApiError::unauthenticated(INVALID_TOKEN).into_response();
        }
    };

    let user = match state.store.get_user(claims.sub).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            tracing::warn!(user_id = %claims.sub, "token subject missing or inactive");
            return ApiError::unauthenticated("User not found or inactive.").into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    req.extensions_mut()
        .insert(PrincipalContext::new(Principal::new(user.id, user.is_staff)));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| ApiError::unauthenticated("Invalid Authorization header."))?;

    let mut parts = header.split_whitespace();
    // Other schemes belong to other authenticators; the caller stays anonymous.
    if parts.next() != Some("Bearer") {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(Some(token)),
        _ => Err(ApiError::unauthenticated(
            "Authorization header must contain two space-delimited values",
        )),
    }
}

/// Add HTTP trace logging (method, path, status, latency).
pub fn add_tracing(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().path().to_string();
                tracing::span!(Level::INFO, "http", %method, %uri)
            })
            .on_response(|res: &http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                tracing::info!(status = %res.status(), elapsed_ms = latency.as_millis() as u64, "response");
            }),
    )
}
