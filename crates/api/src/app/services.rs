//! Application services: the operations behind every route.
//!
//! Each mutation on an existing row follows the same order: load (404),
//! authorize (403), validate (400), persist. Handlers split the first two
//! from the rest so a body is only judged once the caller may act on the row.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use penboard_auth::{Hs256TokenService, TokenKind, TokenPair, hash_password, verify_password};
use penboard_core::validation::required;
use penboard_core::{CommentId, PostId, REQUIRED_FIELD, UserId, ValidationErrors};
use penboard_infra::{AppConfig, DynBlogStore, InMemoryBlogStore, PostgresBlogStore, StoreError, db};
use penboard_posts::{
    Comment, CommentPatch, CreateComment, CreatePost, Post, PostPatch, ensure_can_post, missing_post_error,
};
use penboard_users::{RegisterUser, User, UserPatch};

use crate::app::dto::{TokenObtainRequest, TokenRefreshRequest};
use crate::app::errors::ApiError;
use crate::authz::{ensure_owner_or_staff, ensure_staff};
use crate::context::PrincipalContext;

const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";
const INVALID_REFRESH: &str = "Token is invalid or expired";

pub struct AppServices {
    store: DynBlogStore,
    tokens: Arc<Hs256TokenService>,
}

impl AppServices {
    pub fn new(store: DynBlogStore, tokens: Arc<Hs256TokenService>) -> Self {
        Self { store, tokens }
    }

    /// In-memory wiring with default token lifetimes (dev + tests).
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self::new(
            Arc::new(InMemoryBlogStore::new()),
            Arc::new(Hs256TokenService::new(
                jwt_secret.as_bytes(),
                chrono::Duration::seconds(penboard_infra::config::DEFAULT_ACCESS_TOKEN_TTL_SECS),
                chrono::Duration::seconds(penboard_infra::config::DEFAULT_REFRESH_TOKEN_TTL_SECS),
            )),
        )
    }

    /// Wire services from configuration: PostgreSQL when `DATABASE_URL` is
    /// set (schema applied on connect), otherwise the in-memory store.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: DynBlogStore = match &config.database {
            Some(database) => {
                let pool = db::connect(database).await?;
                let store = PostgresBlogStore::new(pool);
                store.migrate().await?;
                info!("connected to PostgreSQL");
                Arc::new(store)
            }
            None => Arc::new(InMemoryBlogStore::new()),
        };

        let tokens = Arc::new(Hs256TokenService::new(
            config.jwt_secret.as_bytes(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));

        Ok(Self::new(store, tokens))
    }

    pub fn store(&self) -> &DynBlogStore {
        &self.store
    }

    pub fn tokens(&self) -> Arc<Hs256TokenService> {
        self.tokens.clone()
    }

    // -------------------------
    // Users + tokens
    // -------------------------

    #[instrument(skip(self, input), err)]
    pub async fn register(&self, input: RegisterUser) -> Result<User, ApiError> {
        let validated = input.validate()?;
        let password_hash = hash_blocking(validated.password.clone()).await?;

        let user = self.store.insert_user(validated.into_new_user(password_hash)).await?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, input), err)]
    pub async fn obtain_tokens(&self, input: TokenObtainRequest) -> Result<TokenPair, ApiError> {
        let mut errors = ValidationErrors::new();
        let username = required(&mut errors, "username", input.username);
        let password = match input.password {
            Some(p) if !p.is_empty() => Some(p),
            _ => {
                errors.add("password", REQUIRED_FIELD);
                None
            }
        };
        let (Some(username), Some(password)) = (username, password) else {
            return Err(errors.into());
        };

        let user = match self.store.find_user_by_username(&username).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::warn!(%username, "token request for unknown or inactive account");
                return Err(ApiError::unauthenticated(NO_ACTIVE_ACCOUNT));
            }
        };

        if !verify_blocking(password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "token request with wrong password");
            return Err(ApiError::unauthenticated(NO_ACTIVE_ACCOUNT));
        }

        Ok(self.tokens.issue_pair(user.id, Utc::now())?)
    }

    #[instrument(skip(self, input), err)]
    pub async fn refresh_access(&self, input: TokenRefreshRequest) -> Result<String, ApiError> {
        let mut errors = ValidationErrors::new();
        let Some(refresh) = required(&mut errors, "refresh", input.refresh) else {
            return Err(errors.into());
        };

        let now = Utc::now();
        let user_id = self.tokens.verify_refresh(&refresh, now).map_err(|e| {
            tracing::warn!(error = %e, "rejected refresh token");
            ApiError::unauthenticated(INVALID_REFRESH)
        })?;

        match self.store.get_user(user_id).await? {
            Some(user) if user.is_active => Ok(self.tokens.issue(user.id, TokenKind::Access, now)?),
            _ => Err(ApiError::unauthenticated(NO_ACTIVE_ACCOUNT)),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.store.list_users().await?)
    }

    #[instrument(skip(self), err)]
    pub async fn get_user(&self, id: UserId) -> Result<User, ApiError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found("user"))
    }

    /// Load a user the principal may modify (404, then 403).
    pub async fn user_for_update(&self, principal: &PrincipalContext, id: UserId) -> Result<User, ApiError> {
        let user = self.get_user(id).await?;
        ensure_owner_or_staff(principal, &user)?;
        Ok(user)
    }

    #[instrument(skip(self, principal, user, patch), fields(user_id = %user.id, by = %principal.user_id()), err)]
    pub async fn update_user(&self, principal: &PrincipalContext, user: User, patch: UserPatch) -> Result<User, ApiError> {
        if patch.changes_privileges() {
            ensure_staff(principal, "change is_staff or is_active")?;
        }

        let patch = patch.validate()?;
        let password_hash = match &patch.password {
            Some(password) => Some(hash_blocking(password.clone()).await?),
            None => None,
        };

        let updated = self.store.update_user(user.id, patch.into_changes(password_hash)).await?;
        info!(user_id = %updated.id, "user updated");
        Ok(updated)
    }

    #[instrument(skip(self, principal), fields(by = %principal.user_id()), err)]
    pub async fn delete_user(&self, principal: &PrincipalContext, id: UserId) -> Result<(), ApiError> {
        let user = self.user_for_update(principal, id).await?;
        self.store.delete_user(user.id).await?;
        info!(user_id = %user.id, "user deleted with their posts and comments");
        Ok(())
    }

    // -------------------------
    // Posts
    // -------------------------

    #[instrument(skip(self, principal, input), fields(user_id = %principal.user_id()), err)]
    pub async fn create_post(&self, principal: &PrincipalContext, input: CreatePost) -> Result<Post, ApiError> {
        let validated = input.validate()?;

        let author = self
            .store
            .get_user(principal.user_id())
            .await?
            .ok_or_else(|| ApiError::unauthenticated(NO_ACTIVE_ACCOUNT))?;
        ensure_can_post(author.birth_date, Utc::now().date_naive())?;

        let post = self.store.insert_post(validated.authored_by(author.id)).await?;
        info!(post_id = %post.id, user_id = %author.id, "post created");
        Ok(post)
    }

    #[instrument(skip(self), err)]
    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        Ok(self.store.list_posts().await?)
    }

    #[instrument(skip(self), err)]
    pub async fn get_post(&self, id: PostId) -> Result<Post, ApiError> {
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| ApiError::not_found("post"))
    }

    pub async fn post_for_update(&self, principal: &PrincipalContext, id: PostId) -> Result<Post, ApiError> {
        let post = self.get_post(id).await?;
        ensure_owner_or_staff(principal, &post)?;
        Ok(post)
    }

    #[instrument(skip(self, post, patch), fields(post_id = %post.id), err)]
    pub async fn update_post(&self, post: Post, patch: PostPatch) -> Result<Post, ApiError> {
        let changes = patch.validate()?;
        let updated = self.store.update_post(post.id, changes).await?;
        info!(post_id = %updated.id, "post updated");
        Ok(updated)
    }

    #[instrument(skip(self, principal), fields(by = %principal.user_id()), err)]
    pub async fn delete_post(&self, principal: &PrincipalContext, id: PostId) -> Result<(), ApiError> {
        let post = self.post_for_update(principal, id).await?;
        self.store.delete_post(post.id).await?;
        info!(post_id = %post.id, "post deleted with its comments");
        Ok(())
    }

    // -------------------------
    // Comments
    // -------------------------

    #[instrument(skip(self, principal, input), fields(user_id = %principal.user_id()), err)]
    pub async fn create_comment(
        &self,
        principal: &PrincipalContext,
        post_id: PostId,
        input: CreateComment,
    ) -> Result<Comment, ApiError> {
        let new_comment = input.validate(principal.user_id(), post_id)?;

        if self.store.get_post(post_id).await?.is_none() {
            return Err(missing_post_error(post_id).into());
        }

        let comment = match self.store.insert_comment(new_comment).await {
            Ok(comment) => comment,
            // The post was deleted between the check and the insert.
            Err(StoreError::MissingReference(_)) => return Err(missing_post_error(post_id).into()),
            Err(e) => return Err(e.into()),
        };
        info!(comment_id = %comment.id, post_id = %post_id, "comment created");
        Ok(comment)
    }

    #[instrument(skip(self), err)]
    pub async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, ApiError> {
        self.get_post(post_id).await?;
        Ok(self.store.list_comments(post_id).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn get_comment(&self, post_id: PostId, id: CommentId) -> Result<Comment, ApiError> {
        self.store
            .get_comment(post_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("comment"))
    }

    pub async fn comment_for_update(
        &self,
        principal: &PrincipalContext,
        post_id: PostId,
        id: CommentId,
    ) -> Result<Comment, ApiError> {
        let comment = self.get_comment(post_id, id).await?;
        ensure_owner_or_staff(principal, &comment)?;
        Ok(comment)
    }

    #[instrument(skip(self, comment, patch), fields(comment_id = %comment.id), err)]
    pub async fn update_comment(&self, comment: Comment, patch: CommentPatch) -> Result<Comment, ApiError> {
        let changes = patch.validate()?;
        let updated = self
            .store
            .update_comment(comment.post_id, comment.id, changes)
            .await?;
        info!(comment_id = %updated.id, "comment updated");
        Ok(updated)
    }

    #[instrument(skip(self, principal), fields(by = %principal.user_id()), err)]
    pub async fn delete_comment(
        &self,
        principal: &PrincipalContext,
        post_id: PostId,
        id: CommentId,
    ) -> Result<(), ApiError> {
        let comment = self.comment_for_update(principal, post_id, id).await?;
        self.store.delete_comment(post_id, comment.id).await?;
        info!(comment_id = %comment.id, post_id = %post_id, "comment deleted");
        Ok(())
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn verify_blocking(password: String, stored_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use penboard_auth::Principal;
    use penboard_core::NON_FIELD_ERRORS;

    fn registration(username: &str, birth_date: &str) -> RegisterUser {
        RegisterUser {
            username: Some(username.into()),
            email: Some(format!("{username}@mail.ru")),
            password: Some("password123".into()),
            birth_date: Some(birth_date.into()),
            phone_number: Some(format!("+7{}", username.len() * 1111)),
        }
    }

    fn ctx(user: &User) -> PrincipalContext {
        PrincipalContext::new(Principal::new(user.id, user.is_staff))
    }

    fn draft(title: &str) -> CreatePost {
        CreatePost {
            title: Some(title.into()),
            text: Some("This is a test post.".into()),
            image: None,
        }
    }

    #[tokio::test]
    async fn registered_user_can_obtain_and_refresh_tokens() {
        let svc = AppServices::in_memory("test-secret");
        svc.register(registration("alice", "1990-05-05")).await.unwrap();

        let pair = svc
            .obtain_tokens(TokenObtainRequest {
                username: Some("alice".into()),
                password: Some("password123".into()),
            })
            .await
            .unwrap();
        let access = svc
            .refresh_access(TokenRefreshRequest {
                refresh: Some(pair.refresh.clone()),
            })
            .await
            .unwrap();
        assert!(!access.is_empty());

        let wrong = svc
            .obtain_tokens(TokenObtainRequest {
                username: Some("alice".into()),
                password: Some("password124".into()),
            })
            .await;
        assert!(matches!(wrong, Err(ApiError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn underage_author_is_rejected_after_field_checks() {
        let svc = AppServices::in_memory("test-secret");
        let kid = svc.register(registration("kiddo", "2015-02-23")).await.unwrap();

        let err = svc.create_post(&ctx(&kid), draft("Test Post")).await.unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains(NON_FIELD_ERRORS)),
            other => panic!("unexpected {other:?}"),
        }

        // A bad title is reported before the age rule.
        let err = svc.create_post(&ctx(&kid), draft("чепуха")).await.unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.contains("title"));
                assert!(!errors.contains(NON_FIELD_ERRORS));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_owner_cannot_touch_a_post_but_staff_can() {
        let svc = AppServices::in_memory("test-secret");
        let alice = svc.register(registration("alice", "1990-05-05")).await.unwrap();
        let bob = svc.register(registration("bob", "1990-05-05")).await.unwrap();
        let post = svc.create_post(&ctx(&alice), draft("Test Post")).await.unwrap();

        assert!(matches!(
            svc.post_for_update(&ctx(&bob), post.id).await,
            Err(ApiError::Forbidden(_))
        ));

        let staff = PrincipalContext::new(Principal::new(bob.id, true));
        svc.delete_post(&staff, post.id).await.unwrap();
        assert!(matches!(svc.get_post(post.id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_staff_may_change_account_flags() {
        let svc = AppServices::in_memory("test-secret");
        let alice = svc.register(registration("alice", "1990-05-05")).await.unwrap();

        let patch = UserPatch {
            is_staff: Some(true),
            ..Default::default()
        };
        let err = svc.update_user(&ctx(&alice), alice.clone(), patch).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn comment_on_missing_post_names_the_id() {
        let svc = AppServices::in_memory("test-secret");
        let alice = svc.register(registration("alice", "1990-05-05")).await.unwrap();

        let err = svc
            .create_comment(
                &ctx(&alice),
                PostId::new(100),
                CreateComment {
                    text: Some("This is a test comment.".into()),
                },
            )
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(
                errors.messages(NON_FIELD_ERRORS),
                ["There's no any post with given id 100"]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }
}
