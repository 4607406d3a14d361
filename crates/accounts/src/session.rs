//! Signed session tokens
//!
//! A session is an HS256 JWT carrying the account id. The same token is
//! returned in the response body and set as the `token` cookie.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Lifetime of the signed token
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Lifetime of the cookie carrying it; shorter than the token itself
pub const COOKIE_TTL_DAYS: i64 = 4;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not authorized, no token")]
    Missing,

    #[error("Not authorized, token expired")]
    Expired,

    #[error("Not authorized, token failed")]
    Invalid,

    #[error("Failed to sign session token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account record key
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `user_id`, valid for [`TOKEN_TTL_DAYS`] from `now`
    pub fn issue(&self, user_id: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = Claims {
            id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let keys = SessionKeys::new("test-secret");
        let now = Utc::now();
        let token = keys.issue("abc123", now).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.id, "abc123");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = SessionKeys::new("one").issue("abc", Utc::now()).unwrap();
        let err = SessionKeys::new("two").verify(&token).unwrap_err();
        assert!(matches!(err, SessionError::Invalid));
    }

    #[test]
    fn test_expired() {
        let keys = SessionKeys::new("test-secret");
        let token = keys
            .issue("abc", Utc::now() - Duration::days(TOKEN_TTL_DAYS + 1))
            .unwrap();

        assert!(matches!(keys.verify(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let keys = SessionKeys::new("test-secret");
        assert!(matches!(keys.verify("not.a.jwt"), Err(SessionError::Invalid)));
        assert!(matches!(keys.verify(""), Err(SessionError::Invalid)));
    }
}
