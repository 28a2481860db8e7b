//! Post model and input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use penboard_core::validation::required;
use penboard_core::{Entity, Owned, PostId, UserId, ValidationErrors};

use crate::validators::validate_title;

/// A persisted post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Post {
    type Id = PostId;

    fn id(&self) -> PostId {
        self.id
    }
}

impl Owned for Post {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

/// Post creation input as received.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreatePost {
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_title")
    )]
    pub title: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPost {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
}

/// A post row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub user_id: UserId,
}

impl CreatePost {
    pub fn validate(self) -> Result<ValidatedPost, ValidationErrors> {
        let checked = Validate::validate(&self);
        let mut errors = ValidationErrors::new();

        let title = required(&mut errors, "title", self.title);
        let text = required(&mut errors, "text", self.text);
        let image = normalize_image(self.image);
        errors.absorb(checked);

        match (title, text) {
            (Some(title), Some(text)) if errors.is_empty() => Ok(ValidatedPost { title, text, image }),
            _ => Err(errors),
        }
    }
}

impl ValidatedPost {
    pub fn authored_by(self, user_id: UserId) -> NewPost {
        NewPost {
            title: self.title,
            text: self.text,
            image: self.image,
            user_id,
        }
    }
}

/// Partial post update.
///
/// `image` distinguishes "absent" (`None`) from an explicit `null`
/// (`Some(None)`), which clears the stored reference.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostPatch {
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_title")
    )]
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

/// Column changes applied by the store; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub text: Option<String>,
    pub image: Option<Option<String>>,
}

impl PostPatch {
    pub fn validate(self) -> Result<PostChanges, ValidationErrors> {
        let checked = Validate::validate(&self);
        let mut errors = ValidationErrors::new();

        let title = self.title.and_then(|v| required(&mut errors, "title", Some(v)));
        let text = self.text.and_then(|v| required(&mut errors, "text", Some(v)));
        let image = self.image.map(normalize_image);
        errors.absorb(checked);

        errors.finish(|| PostChanges { title, text, image })
    }
}

fn normalize_image(image: Option<String>) -> Option<String> {
    image.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Deserialize a field that is present in the payload, even when it is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use penboard_core::REQUIRED_FIELD;

    #[test]
    fn valid_post_passes() {
        let post = CreatePost {
            title: Some("Test Post".into()),
            text: Some("This is a test post.".into()),
            image: Some("  ".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(post.title, "Test Post");
        assert_eq!(post.image, None);
        assert_eq!(post.authored_by(UserId::new(3)).user_id, UserId::new(3));
    }

    #[test]
    fn missing_title_is_reported() {
        let errors = CreatePost {
            text: Some("This is a test post.".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.messages("title"), [REQUIRED_FIELD]);
    }

    #[test]
    fn forbidden_title_is_reported() {
        let errors = CreatePost {
            title: Some("ерунда".into()),
            text: Some("This is a test post.".into()),
            image: None,
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("title"));
        assert!(!errors.contains("text"));
    }

    #[test]
    fn patch_distinguishes_absent_and_null_image() {
        let absent: PostPatch = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(absent.validate().unwrap().image, None);

        let cleared: PostPatch = serde_json::from_str(r#"{"image":null}"#).unwrap();
        assert_eq!(cleared.validate().unwrap().image, Some(None));

        let set: PostPatch = serde_json::from_str(r#"{"image":"posts/a.png"}"#).unwrap();
        assert_eq!(set.validate().unwrap().image, Some(Some("posts/a.png".into())));
    }

    #[test]
    fn patch_screens_title() {
        let errors = PostPatch {
            title: Some("Полная чепуха".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("title"));
    }

    #[test]
    fn overlong_title_is_reported() {
        let errors = CreatePost {
            title: Some("я".repeat(256)),
            text: Some("text".into()),
            image: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.messages("title"),
            ["Ensure this field has no more than 255 characters."]
        );

        let post = CreatePost {
            title: Some("я".repeat(255)),
            text: Some("text".into()),
            image: None,
        };
        assert!(post.validate().is_ok());
    }

    #[test]
    fn empty_patch_changes_nothing() {
        assert_eq!(PostPatch::default().validate().unwrap(), PostChanges::default());
    }
}
