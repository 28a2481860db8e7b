//! User account model and its input validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use penboard_core::validation::required;
use penboard_core::{Entity, Owned, REQUIRED_FIELD, UserId, ValidationErrors};

use crate::validators::{
    parse_birth_date, validate_birth_date, validate_email_domain, validate_password, validate_username,
};

/// A persisted user account.
///
/// `password_hash` is a PHC string; it never leaves the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: NaiveDate,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// A profile is owned by the account it describes.
impl Owned for User {
    fn owner_id(&self) -> UserId {
        self.id
    }
}

/// Registration input as received; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        custom(function = "validate_email_domain")
    )]
    pub email: Option<String>,
    #[validate(custom(function = "validate_password"))]
    pub password: Option<String>,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<String>,
    #[validate(length(max = 17, message = "Ensure this field has no more than 17 characters."))]
    pub phone_number: Option<String>,
}

/// Registration input that passed every field check. The password is still plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub birth_date: NaiveDate,
    pub phone_number: String,
}

/// A user row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: NaiveDate,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl RegisterUser {
    pub fn validate(self) -> Result<ValidatedRegistration, ValidationErrors> {
        let checked = Validate::validate(&self);
        let mut errors = ValidationErrors::new();

        let username = required(&mut errors, "username", self.username);
        let email = required(&mut errors, "email", self.email);
        let phone_number = required(&mut errors, "phone_number", self.phone_number);
        let birth_date = required(&mut errors, "birth_date", self.birth_date);

        // Passwords are not trimmed: surrounding whitespace is part of the secret.
        let password = self.password.filter(|p| !p.is_empty());
        if password.is_none() {
            errors.add("password", REQUIRED_FIELD);
        }

        errors.absorb(checked);
        let birth_date = birth_date.as_deref().and_then(parse_birth_date);

        match (username, email, password, birth_date, phone_number) {
            (Some(username), Some(email), Some(password), Some(birth_date), Some(phone_number))
                if errors.is_empty() =>
            {
                Ok(ValidatedRegistration {
                    username,
                    email,
                    password,
                    birth_date,
                    phone_number,
                })
            }
            _ => Err(errors),
        }
    }
}

impl ValidatedRegistration {
    /// Registration always yields an active, unprivileged account.
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username,
            email: self.email,
            phone_number: self.phone_number,
            birth_date: self.birth_date,
            password_hash,
            is_staff: false,
            is_superuser: false,
            is_active: true,
        }
    }
}

/// Partial profile update as received.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        custom(function = "validate_email_domain")
    )]
    pub email: Option<String>,
    #[validate(custom(function = "validate_password"))]
    pub password: Option<String>,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<String>,
    #[validate(length(max = 17, message = "Ensure this field has no more than 17 characters."))]
    pub phone_number: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
}

/// Partial update that passed field checks. The password, if any, is plaintext.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidUserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
}

/// Column changes applied by the store; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password_hash: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    /// Whether the patch touches account flags only staff may change.
    pub fn changes_privileges(&self) -> bool {
        self.is_staff.is_some() || self.is_active.is_some()
    }

    pub fn validate(self) -> Result<ValidUserPatch, ValidationErrors> {
        let checked = Validate::validate(&self);
        let mut errors = ValidationErrors::new();

        // Present-but-blank is an error; absent leaves the column alone.
        let username = self.username.and_then(|v| required(&mut errors, "username", Some(v)));
        let email = self.email.and_then(|v| required(&mut errors, "email", Some(v)));
        let phone_number = self
            .phone_number
            .and_then(|v| required(&mut errors, "phone_number", Some(v)));
        let birth_date = self.birth_date.as_deref().and_then(parse_birth_date);

        errors.absorb(checked);
        errors.finish(|| ValidUserPatch {
            username,
            email,
            password: self.password,
            birth_date,
            phone_number,
            is_staff: self.is_staff,
            is_active: self.is_active,
        })
    }
}

impl ValidUserPatch {
    pub fn into_changes(self, password_hash: Option<String>) -> UserChanges {
        UserChanges {
            username: self.username,
            email: self.email,
            phone_number: self.phone_number,
            birth_date: self.birth_date,
            password_hash,
            is_staff: self.is_staff,
            is_active: self.is_active,
        }
    }
}
