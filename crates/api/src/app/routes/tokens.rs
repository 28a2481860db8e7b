use std::sync::Arc;

use axum::{extract::Extension, routing::post, Json, Router};

use penboard_auth::TokenPair;

use crate::app::dto::{AccessTokenResponse, JsonBody, TokenObtainRequest, TokenRefreshRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/token/", post(obtain_token))
        .route("/token/refresh/", post(refresh_token))
}

pub async fn obtain_token(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<TokenObtainRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    Ok(Json(services.obtain_tokens(body).await?))
}

pub async fn refresh_token(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<TokenRefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let access = services.refresh_access(body).await?;
    Ok(Json(AccessTokenResponse { access }))
}
