use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use penboard_posts::{CreatePost, PostPatch};

use crate::app::dto::{self, JsonBody, PostView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/create/", post(create_post))
        .route(
            "/posts/:post_id/",
            get(get_post).put(update_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/:post_id/update/", put(update_post).patch(update_post))
        .route("/posts/:post_id/delete/", delete(delete_post))
}

pub async fn list_posts(Extension(services): Extension<Arc<AppServices>>) -> Result<Json<Vec<PostView>>, ApiError> {
    Ok(Json(dto::views(services.list_posts().await?)))
}

pub async fn create_post(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    JsonBody(body): JsonBody<CreatePost>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let post = services.create_post(&principal, body).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn get_post(
    Extension(services): Extension<Arc<AppServices>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostView>, ApiError> {
    let post = services.get_post(dto::parse_id(&post_id)?).await?;
    Ok(Json(post.into()))
}

pub async fn update_post(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(post_id): Path<String>,
    body: Result<Json<PostPatch>, JsonRejection>,
) -> Result<Json<PostView>, ApiError> {
    let post = services.post_for_update(&principal, dto::parse_id(&post_id)?).await?;
    let JsonBody(patch) = dto::json_body(body)?;

    let updated = services.update_post(post, patch).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_post(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.delete_post(&principal, dto::parse_id(&post_id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
