//! Comments are always addressed through their parent post.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use penboard_core::{CommentId, PostId};
use penboard_posts::{CommentPatch, CreateComment};

use crate::app::dto::{self, CommentView, JsonBody};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/posts/:post_id/comments/", get(list_comments).post(create_comment))
        .route("/posts/:post_id/comments/create/", post(create_comment))
        .route(
            "/posts/:post_id/comments/:comment_id/",
            get(get_comment)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route(
            "/posts/:post_id/comments/:comment_id/update/",
            put(update_comment).patch(update_comment),
        )
        .route("/posts/:post_id/comments/:comment_id/delete/", delete(delete_comment))
}

fn parse_ids(post_id: &str, comment_id: &str) -> Result<(PostId, CommentId), ApiError> {
    Ok((dto::parse_id(post_id)?, dto::parse_id(comment_id)?))
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let comments = services.list_comments(dto::parse_id(&post_id)?).await?;
    Ok(Json(dto::views(comments)))
}

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(post_id): Path<String>,
    JsonBody(body): JsonBody<CreateComment>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let comment = services
        .create_comment(&principal, dto::parse_id(&post_id)?, body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn get_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<CommentView>, ApiError> {
    let (post_id, comment_id) = parse_ids(&post_id, &comment_id)?;
    Ok(Json(services.get_comment(post_id, comment_id).await?.into()))
}

pub async fn update_comment(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path((post_id, comment_id)): Path<(String, String)>,
    body: Result<Json<CommentPatch>, JsonRejection>,
) -> Result<Json<CommentView>, ApiError> {
    let (post_id, comment_id) = parse_ids(&post_id, &comment_id)?;
    let comment = services.comment_for_update(&principal, post_id, comment_id).await?;
    let JsonBody(patch) = dto::json_body(body)?;

    let updated = services.update_comment(comment, patch).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (post_id, comment_id) = parse_ids(&post_id, &comment_id)?;
    services.delete_comment(&principal, post_id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
