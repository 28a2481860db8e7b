use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use penboard_core::{CommentId, PostId, UserId};
use penboard_posts::{Comment, CommentChanges, NewComment, NewPost, Post, PostChanges};
use penboard_users::{NewUser, User, UserChanges};

use super::{BlogStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    last_user_id: i64,
    last_post_id: i64,
    last_comment_id: i64,
}

impl Tables {
    /// Reject usernames/emails/phones already held by another user, naming every clash.
    fn check_unique(
        &self,
        except: Option<UserId>,
        username: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<()> {
        let others = || self.users.values().filter(move |u| Some(u.id) != except);
        let taken = |value: Option<&str>, column: fn(&User) -> &str| {
            value.is_some_and(|v| others().any(|u| column(u) == v))
        };

        let fields: Vec<&'static str> = [
            ("username", taken(username, |u| &u.username)),
            ("email", taken(email, |u| &u.email)),
            ("phone_number", taken(phone_number, |u| &u.phone_number)),
        ]
        .into_iter()
        .filter_map(|(field, clash)| clash.then_some(field))
        .collect();

        if fields.is_empty() { Ok(()) } else { Err(StoreError::Duplicate { fields }) }
    }
}

/// In-memory blog store for tests/dev.
///
/// All tables sit behind one lock, so every operation (including cascades)
/// is atomic.
#[derive(Debug, Default)]
pub struct InMemoryBlogStore {
    inner: RwLock<Tables>,
}

impl InMemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl BlogStore for InMemoryBlogStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.write()?;
        tables.check_unique(
            None,
            Some(&user.username),
            Some(&user.email),
            Some(&user.phone_number),
        )?;

        tables.last_user_id += 1;
        let now = Utc::now();
        let row = User {
            id: UserId::new(tables.last_user_id),
            username: user.username,
            email: user.email,
            phone_number: user.phone_number,
            birth_date: user.birth_date,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<User> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        tables.check_unique(
            Some(id),
            changes.username.as_deref(),
            changes.email.as_deref(),
            changes.phone_number.as_deref(),
        )?;

        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(phone_number) = changes.phone_number {
            user.phone_number = phone_number;
        }
        if let Some(birth_date) = changes.birth_date {
            user.birth_date = birth_date;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(is_staff) = changes.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }

        tables.posts.retain(|_, p| p.user_id != id);
        let Tables { posts, comments, .. } = &mut *tables;
        comments.retain(|_, c| c.user_id != id && posts.contains_key(&c.post_id));
        Ok(())
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&post.user_id) {
            return Err(StoreError::MissingReference(format!("user {}", post.user_id)));
        }

        tables.last_post_id += 1;
        let now = Utc::now();
        let row = Post {
            id: PostId::new(tables.last_post_id),
            title: post.title,
            text: post.text,
            image: post.image,
            user_id: post.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.read()?.posts.values().cloned().collect())
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> StoreResult<Post> {
        let mut tables = self.write()?;
        let post = tables.posts.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(text) = changes.text {
            post.text = text;
        }
        if let Some(image) = changes.image {
            post.image = image;
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.posts.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&comment.user_id) {
            return Err(StoreError::MissingReference(format!("user {}", comment.user_id)));
        }
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StoreError::MissingReference(format!("post {}", comment.post_id)));
        }

        tables.last_comment_id += 1;
        let now = Utc::now();
        let row = Comment {
            id: CommentId::new(tables.last_comment_id),
            text: comment.text,
            user_id: comment.user_id,
            post_id: comment.post_id,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_comment(&self, post_id: PostId, id: CommentId) -> StoreResult<Option<Comment>> {
        Ok(self
            .read()?
            .comments
            .get(&id)
            .filter(|c| c.post_id == post_id)
            .cloned())
    }

    async fn list_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>> {
        Ok(self
            .read()?
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn update_comment(&self, post_id: PostId, id: CommentId, changes: CommentChanges) -> StoreResult<Comment> {
        let mut tables = self.write()?;
        let comment = tables
            .comments
            .get_mut(&id)
            .filter(|c| c.post_id == post_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(text) = changes.text {
            comment.text = text;
        }
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, post_id: PostId, id: CommentId) -> StoreResult<()> {
        let mut tables = self.write()?;
        let under_post = tables.comments.get(&id).is_some_and(|c| c.post_id == post_id);
        if !under_post {
            return Err(StoreError::NotFound);
        }
        tables.comments.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@mail.ru"),
            phone_number: format!("+7{}", name.bytes().map(u32::from).sum::<u32>()),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            password_hash: "hash".to_string(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
        }
    }

    fn new_post(user_id: UserId) -> NewPost {
        NewPost {
            title: "Test Post".to_string(),
            text: "This is a test post.".to_string(),
            image: None,
            user_id,
        }
    }

    fn new_comment(user_id: UserId, post_id: PostId) -> NewComment {
        NewComment {
            text: "This is a test comment.".to_string(),
            user_id,
            post_id,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially() {
        let store = InMemoryBlogStore::new();
        let a = store.insert_user(new_user("alice")).await.unwrap();
        let b = store.insert_user(new_user("bob")).await.unwrap();

        assert_eq!(a.id, UserId::new(1));
        assert_eq!(b.id, UserId::new(2));
        assert_eq!(store.list_users().await.unwrap().len(), 2);
        assert_eq!(
            store.find_user_by_username("bob").await.unwrap().map(|u| u.id),
            Some(b.id)
        );
    }

    #[tokio::test]
    async fn duplicate_user_fields_are_rejected() {
        let store = InMemoryBlogStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let mut same_name = new_user("alice");
        same_name.email = "other@mail.ru".into();
        same_name.phone_number = "+70000".into();
        assert_eq!(
            store.insert_user(same_name).await,
            Err(StoreError::Duplicate { fields: vec!["username"] })
        );

        let mut same_email = new_user("carol");
        same_email.email = "alice@mail.ru".into();
        assert_eq!(
            store.insert_user(same_email).await,
            Err(StoreError::Duplicate { fields: vec!["email"] })
        );

        let alice_phone = new_user("alice").phone_number;
        let mut same_phone = new_user("dave");
        same_phone.phone_number = alice_phone;
        assert_eq!(
            store.insert_user(same_phone).await,
            Err(StoreError::Duplicate { fields: vec!["phone_number"] })
        );
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn every_clashing_field_is_reported() {
        let store = InMemoryBlogStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        assert_eq!(
            store.insert_user(new_user("alice")).await,
            Err(StoreError::Duplicate { fields: vec!["username", "email", "phone_number"] })
        );
    }

    #[tokio::test]
    async fn update_user_may_keep_its_own_values() {
        let store = InMemoryBlogStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();

        let unchanged = UserChanges {
            username: Some("alice".into()),
            ..Default::default()
        };
        assert!(store.update_user(alice.id, unchanged).await.is_ok());

        let steal = UserChanges {
            email: Some("alice@mail.ru".into()),
            ..Default::default()
        };
        assert_eq!(
            store.update_user(bob.id, steal).await,
            Err(StoreError::Duplicate { fields: vec!["email"] })
        );
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let store = InMemoryBlogStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let post = store.insert_post(new_post(alice.id)).await.unwrap();
        let other = store.insert_post(new_post(alice.id)).await.unwrap();
        store.insert_comment(new_comment(alice.id, post.id)).await.unwrap();
        store.insert_comment(new_comment(alice.id, other.id)).await.unwrap();

        store.delete_post(post.id).await.unwrap();

        assert!(store.list_comments(post.id).await.unwrap().is_empty());
        assert_eq!(store.list_comments(other.id).await.unwrap().len(), 1);
        assert_eq!(store.delete_post(post.id).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = InMemoryBlogStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();
        let alices_post = store.insert_post(new_post(alice.id)).await.unwrap();
        let bobs_post = store.insert_post(new_post(bob.id)).await.unwrap();
        // Bob's comment on Alice's post goes with the post.
        store.insert_comment(new_comment(bob.id, alices_post.id)).await.unwrap();
        // Alice's comment on Bob's post goes with Alice.
        store.insert_comment(new_comment(alice.id, bobs_post.id)).await.unwrap();
        store.insert_comment(new_comment(bob.id, bobs_post.id)).await.unwrap();

        store.delete_user(alice.id).await.unwrap();

        assert_eq!(store.list_posts().await.unwrap(), vec![bobs_post.clone()]);
        let remaining = store.list_comments(bobs_post.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, bob.id);
    }

    #[tokio::test]
    async fn comments_resolve_only_under_their_post() {
        let store = InMemoryBlogStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let first = store.insert_post(new_post(alice.id)).await.unwrap();
        let second = store.insert_post(new_post(alice.id)).await.unwrap();
        let comment = store.insert_comment(new_comment(alice.id, first.id)).await.unwrap();

        assert!(store.get_comment(first.id, comment.id).await.unwrap().is_some());
        assert!(store.get_comment(second.id, comment.id).await.unwrap().is_none());
        assert_eq!(
            store.delete_comment(second.id, comment.id).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_a_missing_reference() {
        let store = InMemoryBlogStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();

        assert!(matches!(
            store.insert_comment(new_comment(alice.id, PostId::new(100))).await,
            Err(StoreError::MissingReference(_))
        ));
    }

    #[tokio::test]
    async fn post_patch_can_clear_image() {
        let store = InMemoryBlogStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let mut draft = new_post(alice.id);
        draft.image = Some("posts/cover.png".into());
        let post = store.insert_post(draft).await.unwrap();

        let updated = store
            .update_post(
                post.id,
                PostChanges {
                    image: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.image, None);
        assert_eq!(updated.title, "Test Post");
        assert!(updated.updated_at >= post.updated_at);
    }
}
