//! HS256 bearer tokens: an access/refresh pair per login.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use penboard_core::UserId;

use crate::claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Freshly issued token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Validates access tokens presented on API requests.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Symmetric-key token service: issues, refreshes and validates tokens.
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue a single token of the given kind for `user_id`.
    pub fn issue(&self, user_id: UserId, kind: TokenKind, now: DateTime<Utc>) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = JwtClaims {
            sub: user_id,
            token_type: kind,
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn issue_pair(&self, user_id: UserId, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            refresh: self.issue(user_id, TokenKind::Refresh, now)?,
            access: self.issue(user_id, TokenKind::Access, now)?,
        })
    }

    /// Verify signature and claims of a token expected to be of `kind`.
    pub fn verify(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, TokenValidationError> {
        // Time checks are done by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|_| TokenValidationError::Invalid)?;
        validate_claims(&data.claims, kind, now)?;
        Ok(data.claims)
    }

    /// Resolve the subject of a valid refresh token.
    ///
    /// The caller re-checks the account before minting a new access token.
    pub fn verify_refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<UserId, TokenValidationError> {
        Ok(self.verify(refresh_token, TokenKind::Refresh, now)?.sub)
    }
}

impl JwtValidator for Hs256TokenService {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        self.verify(token, TokenKind::Access, now)
    }
}
