use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use penboard_core::DomainError;
use penboard_posts::{Comment, Post};
use penboard_users::User;

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TokenObtainRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh: Option<String>,
}

/// JSON body extractor whose rejections use the API error shape.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        json_body(Json::<T>::from_request(req, state).await)
    }
}

/// Convert a deferred body extraction into the payload or a 400.
///
/// Update handlers take the body as `Result<Json<T>, JsonRejection>` so that
/// lookup and permission checks run before the body is judged.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<JsonBody<T>, ApiError> {
    body.map(|Json(v)| JsonBody(v))
        .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))
}

/// Parse a path segment into a typed id; anything non-numeric is a 404.
pub fn parse_id<I>(raw: &str) -> Result<I, ApiError>
where
    I: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<I>().map_err(ApiError::from)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: NaiveDate,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id.get(),
            username: u.username,
            email: u.email,
            phone_number: u.phone_number,
            birth_date: u.birth_date,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub user: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(p: Post) -> Self {
        Self {
            id: p.id.get(),
            title: p.title,
            text: p.text,
            image: p.image,
            user: p.user_id.get(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub user: i64,
    pub post: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id.get(),
            text: c.text,
            user: c.user_id.get(),
            post: c.post_id.get(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

pub fn views<T, V: From<T>>(rows: Vec<T>) -> Vec<V> {
    rows.into_iter().map(V::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use penboard_core::{PostId, UserId};

    #[test]
    fn non_numeric_ids_are_not_found() {
        assert!(matches!(parse_id::<PostId>("abc"), Err(ApiError::NotFound(_))));
        assert!(matches!(parse_id::<PostId>("0"), Err(ApiError::NotFound(_))));
        assert_eq!(parse_id::<PostId>("42").unwrap(), PostId::new(42));
    }

    #[test]
    fn user_view_has_no_password_hash() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(1),
            username: "testuser".into(),
            email: "testuser@mail.ru".into(),
            phone_number: "1234567890".into(),
            birth_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            password_hash: "$argon2id$secret".into(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserView::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["birth_date"], "2000-01-01");
    }

    #[test]
    fn foreign_keys_serialize_as_ids() {
        let now = Utc::now();
        let comment = Comment {
            id: penboard_core::CommentId::new(3),
            text: "hi".into(),
            user_id: UserId::new(1),
            post_id: PostId::new(2),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(CommentView::from(comment)).unwrap();
        assert_eq!(json["user"], 1);
        assert_eq!(json["post"], 2);
    }
}
