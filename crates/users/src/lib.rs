//! Users domain module.
//!
//! Account model plus the registration and profile-update rules, implemented
//! as deterministic validation (no IO, no HTTP, no storage).

pub mod age;
pub mod user;
pub mod validators;

pub use age::{age_on, is_adult};
pub use user::{NewUser, RegisterUser, User, UserChanges, UserPatch, ValidUserPatch, ValidatedRegistration};
pub use validators::{
    ALLOWED_EMAIL_DOMAINS, PASSWORD_MIN_LENGTH, parse_birth_date, validate_birth_date, validate_email_domain,
    validate_password, validate_username,
};
