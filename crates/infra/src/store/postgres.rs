//! Postgres-backed blog store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique violation) | `Duplicate { fields }` | username/email/phone taken by a concurrent write; field from constraint name |
//! | `23503` (foreign key violation) | `MissingReference` | parent user/post deleted concurrently |
//! | any other / pool errors | `Backend` | connection failures, etc. |
//!
//! User writes first look up every unique column already taken so the caller
//! sees all clashes at once; the constraints still catch concurrent writers.
//!
//! Partial updates use `COALESCE($n, column)` so a single statement applies
//! whatever subset of columns the caller supplied.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use penboard_core::{CommentId, PostId, UserId};
use penboard_posts::{Comment, CommentChanges, NewComment, NewPost, Post, PostChanges};
use penboard_users::{NewUser, User, UserChanges};

use super::{BlogStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_blog_schema.sql");

const USER_COLUMNS: &str = "id, username, email, phone_number, birth_date, password_hash, \
     is_staff, is_superuser, is_active, created_at, updated_at";
const POST_COLUMNS: &str = "id, title, text, image, user_id, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, text, user_id, post_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresBlogStore {
    pool: Arc<PgPool>,
}

impl PostgresBlogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Unique user columns whose value is already held by a row other than `except`.
    async fn taken_fields(
        &self,
        except: Option<UserId>,
        username: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<&'static str>> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(BOOL_OR(username = $2), FALSE)     AS username,
                COALESCE(BOOL_OR(email = $3), FALSE)        AS email,
                COALESCE(BOOL_OR(phone_number = $4), FALSE) AS phone_number
            FROM users
            WHERE id IS DISTINCT FROM $1
            "#,
        )
        .bind(except.map(|id| id.get()))
        .bind(username)
        .bind(email)
        .bind(phone_number)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("taken_fields", e))?;

        let mut fields = Vec::new();
        for field in ["username", "email", "phone_number"] {
            if row.try_get::<bool, _>(field).map_err(|e| map_sqlx_error("taken_fields", e))? {
                fields.push(field);
            }
        }
        Ok(fields)
    }
}

#[async_trait::async_trait]
impl BlogStore for PostgresBlogStore {
    #[instrument(skip(self, user), fields(username = %user.username), err)]
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let fields = self
            .taken_fields(None, Some(&user.username), Some(&user.email), Some(&user.phone_number))
            .await?;
        if !fields.is_empty() {
            return Err(StoreError::Duplicate { fields });
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (
                username, email, phone_number, birth_date, password_hash,
                is_staff, is_superuser, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.birth_date)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.is_active)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        user_from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_user", e))
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_username", e))
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter()
            .map(user_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<User> {
        let fields = self
            .taken_fields(
                Some(id),
                changes.username.as_deref(),
                changes.email.as_deref(),
                changes.phone_number.as_deref(),
            )
            .await?;
        if !fields.is_empty() {
            return Err(StoreError::Duplicate { fields });
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                username      = COALESCE($2, username),
                email         = COALESCE($3, email),
                phone_number  = COALESCE($4, phone_number),
                birth_date    = COALESCE($5, birth_date),
                password_hash = COALESCE($6, password_hash),
                is_staff      = COALESCE($7, is_staff),
                is_active     = COALESCE($8, is_active),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.phone_number)
        .bind(changes.birth_date)
        .bind(changes.password_hash)
        .bind(changes.is_staff)
        .bind(changes.is_active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?
        .ok_or(StoreError::NotFound)?;

        user_from_row(&row).map_err(|e| map_sqlx_error("update_user", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, post), fields(user_id = %post.user_id), err)]
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO posts (title, text, image, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.text)
        .bind(&post.image)
        .bind(post.user_id.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_post", e))?;

        post_from_row(&row).map_err(|e| map_sqlx_error("insert_post", e))
    }

    #[instrument(skip(self), fields(post_id = %id), err)]
    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_post", e))?;

        row.as_ref()
            .map(post_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_post", e))
    }

    #[instrument(skip(self), err)]
    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_posts", e))?;

        rows.iter()
            .map(post_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_posts", e))
    }

    #[instrument(skip(self, changes), fields(post_id = %id), err)]
    async fn update_post(&self, id: PostId, changes: PostChanges) -> StoreResult<Post> {
        // `image` can be cleared, so it needs an explicit "was supplied" flag.
        let (set_image, image) = match changes.image {
            Some(image) => (true, image),
            None => (false, None),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE posts SET
                title      = COALESCE($2, title),
                text       = COALESCE($3, text),
                image      = CASE WHEN $4 THEN $5 ELSE image END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(changes.title)
        .bind(changes.text)
        .bind(set_image)
        .bind(image)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_post", e))?
        .ok_or(StoreError::NotFound)?;

        post_from_row(&row).map_err(|e| map_sqlx_error("update_post", e))
    }

    #[instrument(skip(self), fields(post_id = %id), err)]
    async fn delete_post(&self, id: PostId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_post", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, comment), fields(post_id = %comment.post_id, user_id = %comment.user_id), err)]
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO comments (text, user_id, post_id)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(&comment.text)
        .bind(comment.user_id.get())
        .bind(comment.post_id.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_comment", e))?;

        comment_from_row(&row).map_err(|e| map_sqlx_error("insert_comment", e))
    }

    #[instrument(skip(self), fields(post_id = %post_id, comment_id = %id), err)]
    async fn get_comment(&self, post_id: PostId, id: CommentId) -> StoreResult<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND post_id = $2"
        ))
        .bind(id.get())
        .bind(post_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_comment", e))?;

        row.as_ref()
            .map(comment_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_comment", e))
    }

    #[instrument(skip(self), fields(post_id = %post_id), err)]
    async fn list_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY id"
        ))
        .bind(post_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_comments", e))?;

        rows.iter()
            .map(comment_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_comments", e))
    }

    #[instrument(skip(self, changes), fields(post_id = %post_id, comment_id = %id), err)]
    async fn update_comment(&self, post_id: PostId, id: CommentId, changes: CommentChanges) -> StoreResult<Comment> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE comments SET
                text       = COALESCE($3, text),
                updated_at = NOW()
            WHERE id = $1 AND post_id = $2
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(post_id.get())
        .bind(changes.text)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_comment", e))?
        .ok_or(StoreError::NotFound)?;

        comment_from_row(&row).map_err(|e| map_sqlx_error("update_comment", e))
    }

    #[instrument(skip(self), fields(post_id = %post_id, comment_id = %id), err)]
    async fn delete_comment(&self, post_id: PostId, id: CommentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2")
            .bind(id.get())
            .bind(post_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        birth_date: row.try_get("birth_date")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: PostId::new(row.try_get("id")?),
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        image: row.try_get("image")?,
        user_id: UserId::new(row.try_get("user_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: CommentId::new(row.try_get("id")?),
        text: row.try_get("text")?,
        user_id: UserId::new(row.try_get("user_id")?),
        post_id: PostId::new(row.try_get("post_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Field carried by a unique constraint from the schema.
fn constraint_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "users_username_key" => Some("username"),
        "users_email_key" => Some("email"),
        "users_phone_number_key" => Some("phone_number"),
        _ => None,
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("23505") => match db_err.constraint().and_then(constraint_field) {
                    Some(field) => StoreError::Duplicate { fields: vec![field] },
                    None => StoreError::Backend(msg),
                },
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
