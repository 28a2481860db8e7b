use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use penboard_users::{RegisterUser, UserPatch};

use crate::app::dto::{self, JsonBody, UserView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/register/", post(register))
        .route("/profiles/", get(list_users).post(register))
        .route(
            "/profile/:user_id/",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
        .route("/profile/:user_id/update/", put(update_user).patch(update_user))
        .route("/profile/:user_id/delete/", delete(delete_user))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<RegisterUser>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let user = services.register(body).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(dto::views(services.list_users().await?)))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let user = services.get_user(dto::parse_id(&user_id)?).await?;
    Ok(Json(user.into()))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(user_id): Path<String>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserView>, ApiError> {
    let user = services.user_for_update(&principal, dto::parse_id(&user_id)?).await?;
    let JsonBody(patch) = dto::json_body(body)?;

    let updated = services.update_user(&principal, user, patch).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.delete_user(&principal, dto::parse_id(&user_id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
