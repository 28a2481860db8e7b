use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use penboard_core::UserId;

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims model (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    pub token_type: TokenKind,

    /// Unique token id.
    pub jti: Uuid,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiration, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token is malformed or its signature is invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("expected a {expected} token, got a {actual} token")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

/// Deterministically validate decoded claims against `now`.
///
/// Signature verification happens before this, in [`crate::token`].
pub fn validate_claims(
    claims: &JwtClaims,
    expected: TokenKind,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.token_type != expected {
        return Err(TokenValidationError::WrongKind {
            expected,
            actual: claims.token_type,
        });
    }
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims(kind: TokenKind, iat: i64, exp: i64) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(1),
            token_type: kind,
            jti: Uuid::now_v7(),
            iat,
            exp,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn accepts_within_window() {
        let c = claims(TokenKind::Access, 1_000, 1_300);
        assert_eq!(validate_claims(&c, TokenKind::Access, at(1_000)), Ok(()));
        assert_eq!(validate_claims(&c, TokenKind::Access, at(1_299)), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future() {
        let c = claims(TokenKind::Access, 1_000, 1_300);
        assert_eq!(
            validate_claims(&c, TokenKind::Access, at(1_300)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&c, TokenKind::Access, at(999)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let c = claims(TokenKind::Access, 1_300, 1_300);
        assert_eq!(
            validate_claims(&c, TokenKind::Access, at(1_300)),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn rejects_wrong_kind() {
        let c = claims(TokenKind::Refresh, 1_000, 2_000);
        assert!(matches!(
            validate_claims(&c, TokenKind::Access, at(1_500)),
            Err(TokenValidationError::WrongKind { .. })
        ));
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&TokenKind::Refresh).unwrap();
        assert_eq!(json, "\"refresh\"");
    }
}
