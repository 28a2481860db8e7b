use axum::Router;

pub mod comments;
pub mod posts;
pub mod system;
pub mod tokens;
pub mod users;

/// Router for every resource endpoint. Authentication is optional at this
/// level; handlers that need a caller extract [`crate::context::PrincipalContext`].
pub fn router() -> Router {
    Router::new()
        .merge(tokens::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(comments::router())
}
