//! Field validators for user accounts.
//!
//! Custom `validator` functions for the rules the derive attributes cannot
//! express. Each failure carries the message reported under its field.

use std::borrow::Cow;

use chrono::NaiveDate;
use validator::ValidationError;

/// Email domains accepted at registration and on profile update.
pub const ALLOWED_EMAIL_DOMAINS: [&str; 2] = ["mail.ru", "yandex.ru"];

pub const PASSWORD_MIN_LENGTH: usize = 8;

const EMAIL_DOMAIN_MESSAGE: &str = r#"Only "mail.ru" and "yandex.ru" domains allowed"#;
const PASSWORD_MESSAGE: &str = "The password must be at least 8 characters and must include numbers";
const USERNAME_MESSAGE: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const DATE_FORMAT_MESSAGE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Only addresses ending in `@mail.ru` or `@yandex.ru` are accepted.
pub fn validate_email_domain(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let allowed = ALLOWED_EMAIL_DOMAINS
        .iter()
        .any(|domain| email.strip_suffix(domain).is_some_and(|local| local.ends_with('@') && local.len() > 1));

    if allowed { Ok(()) } else { Err(invalid("email_domain", EMAIL_DOMAIN_MESSAGE)) }
}

/// At least eight characters, at least one of them a digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= PASSWORD_MIN_LENGTH;
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_digit { Ok(()) } else { Err(invalid("password_strength", PASSWORD_MESSAGE)) }
}

/// Letters, digits and `@ . + - _`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid { Ok(()) } else { Err(invalid("username_charset", USERNAME_MESSAGE)) }
}

pub fn validate_birth_date(raw: &str) -> Result<(), ValidationError> {
    parse_birth_date(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("date_format", DATE_FORMAT_MESSAGE))
}

/// Parse an ISO `YYYY-MM-DD` calendar date.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
