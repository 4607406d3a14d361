//! Database store for accounts

use anyhow::{Context, Result};
use thiserror::Error;
use chrono::{DateTime, Utc};
use db::Database;
use tracing::debug;

use crate::password::{hash_password_async, verify_password_async};
use crate::reset::{hash_token, ResetToken};
use crate::user::{normalize_email, Registration, User};

/// Signup lost to an existing account with the same email
#[derive(Debug, Error)]
#[error("An account with this email already exists")]
pub struct EmailTaken;

/// Database store for accounts
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Create a new store with the given database connection
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database connection
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create an account from an already validated registration
    pub async fn create_user(&self, registration: Registration) -> Result<User> {
        let password_hash = hash_password_async(registration.password).await?;
        let user = User::new(
            registration.email,
            password_hash,
            registration.name,
            Utc::now(),
        );

        let created: Option<User> = self
            .db
            .client()
            .create("account")
            .content(user)
            .await
            .map_err(|e| {
                // The account_email index catches signups that race past the lookup
                if e.to_string().contains("account_email") {
                    anyhow::Error::new(EmailTaken)
                } else {
                    anyhow::Error::new(e).context("Failed to create account")
                }
            })?;

        created.context("Account creation returned no result")
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user: Option<User> = self
            .db
            .client()
            .select(("account", id))
            .await
            .context("Failed to get account")?;

        Ok(user)
    }

    /// Look up an account by email, case and surrounding whitespace ignored
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM account WHERE email = $email LIMIT 1")
            .bind(("email", normalize_email(email)))
            .await
            .context("Failed to query account by email")?;

        let users: Vec<User> = response.take(0).context("Failed to parse account")?;
        Ok(users.into_iter().next())
    }

    /// The account matching both email and password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        let matches =
            verify_password_async(password.to_string(), user.password_hash.clone()).await;
        Ok(matches.then_some(user))
    }

    /// Generate and store a reset token, returning it with the raw value
    pub async fn begin_reset(&self, user: &User) -> Result<ResetToken> {
        let token = ResetToken::generate(Utc::now());

        let mut updated = user.clone();
        updated.set_reset(token.hash.clone(), token.expires_at);
        self.save(updated).await?;

        Ok(token)
    }

    /// Drop any pending reset, e.g. after the email failed to go out
    pub async fn cancel_reset(&self, user: &User) -> Result<()> {
        let mut updated = user.clone();
        updated.clear_reset();
        self.save(updated).await?;
        Ok(())
    }

    /// Account holding an unexpired reset for the raw token
    pub async fn find_by_reset_token(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM account WHERE reset_password_token = $token_hash LIMIT 1")
            .bind(("token_hash", hash_token(raw_token)))
            .await
            .context("Failed to query account by reset token")?;

        let users: Vec<User> = response.take(0).context("Failed to parse account")?;
        Ok(users.into_iter().find(|u| u.reset_valid_at(now)))
    }

    /// Set a new password and consume the pending reset
    pub async fn complete_reset(&self, user: &User, new_password: &str) -> Result<User> {
        let mut updated = user.clone();
        updated.password_hash = hash_password_async(new_password.to_string()).await?;
        updated.clear_reset();
        self.save(updated).await
    }

    async fn save(&self, mut user: User) -> Result<User> {
        let id = user
            .id_str()
            .context("Cannot save an account without a record id")?;
        user.id = None;
        user.updated_at = Utc::now();

        let saved: Option<User> = self
            .db
            .client()
            .update(("account", id.as_str()))
            .content(user)
            .await
            .context("Failed to update account")?;

        debug!("Saved account {}", id);
        saved.context("Account update returned no result")
    }
}
