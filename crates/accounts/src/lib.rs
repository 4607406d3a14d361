//! Accounts for taskdeck
//!
//! User records, password hashing, one-time password reset tokens, signed
//! session tokens and outbound mail.

pub mod mailer;
pub mod password;
pub mod reset;
pub mod session;
pub mod store;
pub mod user;

pub use mailer::{Email, Mailer, Outbox, SmtpSettings};
pub use reset::ResetToken;
pub use session::{Claims, SessionError, SessionKeys, COOKIE_TTL_DAYS, SESSION_COOKIE, TOKEN_TTL_DAYS};
pub use store::{EmailTaken, Store};
pub use user::{ProfileView, PublicUser, Registration, User, ValidationError};
