//! `penboard-auth`: authentication and authorization boundary.
//!
//! Password hashing, bearer token issuance/validation and the owner-or-staff
//! rule. This crate is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod token;

pub use authorize::{AuthzError, Grant, authorize_owner_or_staff, require_staff};
pub use claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};
pub use password::{PasswordError, hash_password, verify_password};
pub use principal::Principal;
pub use token::{Hs256TokenService, JwtValidator, TokenError, TokenPair};
