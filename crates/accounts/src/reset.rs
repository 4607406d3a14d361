//! One-time password reset tokens
//!
//! Only the SHA-256 digest of a token is stored; the raw value exists solely
//! in the email sent to the user.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::mailer::Email;

/// How long a reset token stays valid
pub const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// A freshly generated reset token
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Hex of 32 random bytes, sent to the user
    pub raw: String,
    /// Hex SHA-256 of `raw`, stored on the account
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let raw = hex::encode(bytes);

        Self {
            hash: hash_token(&raw),
            raw,
            expires_at: now + Duration::seconds(RESET_TOKEN_TTL_SECS),
        }
    }

    /// Frontend link carrying the raw token
    pub fn url(&self, frontend_url: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            frontend_url.trim_end_matches('/'),
            self.raw
        )
    }

    /// The reset email addressed to `to`
    pub fn email(&self, to: &str, frontend_url: &str) -> Email {
        let url = self.url(frontend_url);
        let html = format!(
            r#"
      <h1>Password Reset Request</h1>
      <p>You requested a password reset. Click the link below to reset your password:</p>
      <a href="{url}" target="_blank">Reset Password</a>
      <p>This link will expire in 1 hour.</p>
      <p>If you didn't request this, please ignore this email.</p>
    "#
        );

        Email {
            to: to.to_string(),
            subject: "Password Reset Request".to_string(),
            html,
        }
    }
}

pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
