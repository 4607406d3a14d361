//! User records and signup validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use thiserror::Error;

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email is required")]
    MissingEmail,

    #[error("Please provide a valid email")]
    InvalidEmail,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Name is required")]
    MissingName,
}

/// A stored account
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    /// Record id (set by database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    /// Lowercased, trimmed
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub name: String,
    /// SHA-256 hex of the outstanding reset token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("reset_pending", &self.reset_password_token.is_some())
            .finish_non_exhaustive()
    }
}

impl User {
    pub fn new(email: String, password_hash: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            email,
            password_hash,
            name,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Raw record key, without the table prefix
    pub fn id_str(&self) -> Option<String> {
        self.id.as_ref().map(|t| t.id.to_raw())
    }

    /// Store a pending reset; token and expiry are always set together
    pub fn set_reset(&mut self, token_hash: String, expires_at: DateTime<Utc>) {
        self.reset_password_token = Some(token_hash);
        self.reset_password_expires = Some(expires_at);
    }

    pub fn clear_reset(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expires = None;
    }

    /// Whether a stored reset is still usable at `now`
    pub fn reset_valid_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            (&self.reset_password_token, self.reset_password_expires),
            (Some(_), Some(expires)) if expires > now
        )
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id_str().unwrap_or_default(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }

    pub fn profile(&self) -> ProfileView {
        ProfileView {
            id: self.id_str().unwrap_or_default(),
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User summary returned by signup, login and reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// User as returned by the profile endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup input
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Registration {
    /// Normalize email and name, then check every field
    pub fn validated(self) -> Result<Self, ValidationError> {
        let email = normalize_email(&self.email);
        validate_email(&email)?;
        validate_password(&self.password)?;

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        Ok(Self {
            email,
            password: self.password,
            name,
        })
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accepts `local@domain.tld` with no whitespace anywhere
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    let has_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());

    if local.is_empty() || !has_dot {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn registration(email: &str, password: &str, name: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_registration_normalizes() {
        let reg = registration("  Alice@Example.COM ", "secret1", "  Alice ")
            .validated()
            .unwrap();
        assert_eq!(reg.email, "alice@example.com");
        assert_eq!(reg.name, "Alice");
    }

    #[test]
    fn test_registration_rejects() {
        assert_eq!(
            registration("", "secret1", "A").validated().unwrap_err(),
            ValidationError::MissingEmail
        );
        assert_eq!(
            registration("alice@example.com", "short", "A").validated().unwrap_err(),
            ValidationError::PasswordTooShort
        );
        assert_eq!(
            registration("alice@example.com", "secret1", "   ").validated().unwrap_err(),
            ValidationError::MissingName
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("first.last@mail.example.org").is_ok());

        for bad in ["plain", "@b.co", "a@b", "a@.co", "a@b.", "a b@c.de"] {
            assert_eq!(validate_email(bad), Err(ValidationError::InvalidEmail), "{bad}");
        }
    }

    #[test]
    fn test_reset_fields_move_together() {
        let now = Utc::now();
        let mut user = User::new("a@b.co".into(), "hash".into(), "A".into(), now);
        assert!(!user.reset_valid_at(now));

        user.set_reset("digest".into(), now + Duration::hours(1));
        assert!(user.reset_valid_at(now));
        assert!(!user.reset_valid_at(now + Duration::hours(2)));

        user.clear_reset();
        assert!(user.reset_password_token.is_none());
        assert!(user.reset_password_expires.is_none());
    }

    #[test]
    fn test_profile_hides_secrets() {
        let mut user = User::new("a@b.co".into(), "hash".into(), "A".into(), Utc::now());
        user.id = Some(Thing::from(("account", "abc")));
        user.set_reset("digest".into(), Utc::now());

        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["_id"], "abc");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("reset_password_token").is_none());

        let public = user.public();
        assert_eq!(public.id, "abc");
        assert_eq!(public.email, "a@b.co");
    }

    #[test]
    fn test_debug_omits_hash() {
        let user = User::new("a@b.co".into(), "$argon2id$secret".into(), "A".into(), Utc::now());
        assert!(!format!("{user:?}").contains("argon2id"));
    }
}
