//! Session gate for protected routes

use accounts::{SessionError, User, COOKIE_TTL_DAYS, SESSION_COOKIE};
use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use surrealdb::sql::Thing;
use time::OffsetDateTime;

use super::error::ApiError;
use super::AppState;

/// The authenticated account, inserted into request extensions
#[derive(Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Record id used as the owner of this user's tasks
    pub fn owner(&self) -> Result<Thing, ApiError> {
        self.0
            .id
            .clone()
            .context("Authenticated account has no record id")
            .map_err(ApiError::internal("Auth middleware error"))
    }
}

/// Id of the authenticated account, attached to the response for the
/// error log
#[derive(Clone)]
pub struct SessionUserId(pub String);

/// Reject requests without a valid session; cookie first, then bearer header
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(&request))
        .ok_or(SessionError::Missing)?;

    let claims = state.sessions.verify(&token)?;

    let user = state
        .accounts
        .get_user(&claims.id)
        .await
        .map_err(ApiError::internal("Auth middleware error"))?
        .ok_or_else(|| ApiError::Unauthorized("User not found or unauthorized".to_string()))?;

    request.extensions_mut().insert(CurrentUser(user));

    let mut response = next.run(request).await;
    response.extensions_mut().insert(SessionUserId(claims.id));
    Ok(response)
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Sign a session token for `user`
pub fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let id = user
        .id_str()
        .context("Account has no record id")
        .map_err(ApiError::internal("Session signing error"))?;

    Ok(state.sessions.issue(&id, Utc::now())?)
}

/// The `token` cookie; cross-site in production
pub fn session_cookie(token: String, production: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(token, production);
    cookie.set_expires(OffsetDateTime::now_utc() + time::Duration::days(COOKIE_TTL_DAYS));
    cookie
}

/// Removal cookie matching [`session_cookie`]
pub fn cleared_cookie(production: bool) -> Cookie<'static> {
    base_cookie(String::new(), production)
}

/// Attributes shared by setting and clearing the session cookie
fn base_cookie(value: String, production: bool) -> Cookie<'static> {
    let same_site = if production {
        SameSite::None
    } else {
        SameSite::Lax
    };

    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(same_site)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_cookie() {
        let cookie = session_cookie("abc".to_string(), false);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_production_cookie() {
        let cookie = session_cookie("abc".to_string(), true);
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[test]
    fn test_cleared_cookie_matches_session_attributes() {
        for production in [false, true] {
            let set = session_cookie("abc".to_string(), production);
            let cleared = cleared_cookie(production);
            assert_eq!(cleared.name(), set.name());
            assert_eq!(cleared.value(), "");
            assert_eq!(cleared.path(), set.path());
            assert_eq!(cleared.secure(), set.secure());
            assert_eq!(cleared.same_site(), set.same_site());
            assert_eq!(cleared.http_only(), set.http_only());
        }
    }

    #[test]
    fn test_cookie_expires_after_four_days() {
        let cookie = session_cookie("abc".to_string(), false);
        let expires = cookie.expires_datetime().unwrap();
        let days = (expires - OffsetDateTime::now_utc()).whole_hours() as f64 / 24.0;
        assert!((days - COOKIE_TTL_DAYS as f64).abs() < 0.1);
    }
}
