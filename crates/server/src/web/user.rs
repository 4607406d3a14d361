use accounts::user::validate_password;
use accounts::{EmailTaken, ProfileView, PublicUser, Registration};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::auth::{cleared_cookie, issue_token, session_cookie, CurrentUser};
use super::error::{ApiError, JsonBody};
use super::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    token: Option<String>,
    new_password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    token: String,
    user: PublicUser,
}

#[derive(Serialize)]
pub struct MessageResponse {
    success: bool,
    message: &'static str,
}

impl MessageResponse {
    fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

#[derive(Serialize)]
pub struct ProfileResponse {
    success: bool,
    user: ProfileView,
}

fn user_exists() -> ApiError {
    ApiError::Validation("User already exists".to_string())
}

fn signup_failure(err: anyhow::Error) -> ApiError {
    if err.is::<EmailTaken>() {
        user_exists()
    } else {
        ApiError::internal("Signup error")(err)
    }
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let registration = Registration {
        email: body.email.unwrap_or_default(),
        password: body.password.unwrap_or_default(),
        name: body.name.unwrap_or_default(),
    }
    .validated()?;

    let existing = state
        .accounts
        .find_by_email(&registration.email)
        .await
        .map_err(ApiError::internal("Signup error"))?;
    if existing.is_some() {
        return Err(user_exists());
    }

    let user = state
        .accounts
        .create_user(registration)
        .await
        .map_err(signup_failure)?;
    let token = issue_token(&state, &user)?;

    info!("New account {}", user.id_str().unwrap_or_default());

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: None,
            token,
            user: user.public(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let email = body.email.unwrap_or_default();
    let password = body.password.unwrap_or_default();

    let user = state
        .accounts
        .authenticate(&email, &password)
        .await
        .map_err(ApiError::internal("Login error"))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let token = issue_token(&state, &user)?;
    let jar = jar.add(session_cookie(token.clone(), state.settings.production));

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: None,
            token,
            user: user.public(),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(cleared_cookie(state.settings.production));
    (jar, MessageResponse::ok("Logged out successfully"))
}

pub async fn profile(Extension(current): Extension<CurrentUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: current.0.profile(),
    })
}

pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = body
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".to_string()))?;

    let Some(user) = state
        .accounts
        .find_by_email(&email)
        .await
        .map_err(ApiError::internal("Forgot password error"))?
    else {
        return Ok(MessageResponse::ok(
            "If the email exists, a reset link has been sent",
        ));
    };

    let token = state
        .accounts
        .begin_reset(&user)
        .await
        .map_err(ApiError::internal("Forgot password error"))?;

    let email = token.email(&user.email, &state.settings.frontend_url);

    if let Err(e) = state.mailer.send(email).await {
        if let Err(clear_err) = state.accounts.cancel_reset(&user).await {
            error!("Failed to clear reset token after email failure: {:#}", clear_err);
        }
        return Err(ApiError::internal_with(
            "Email sending failed",
            "Email could not be sent. Please try again later.",
        )(e));
    }

    Ok(MessageResponse::ok("Reset email sent successfully"))
}

pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(token), Some(new_password)) = (
        body.token.filter(|t| !t.is_empty()),
        body.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation(
            "Token and new password are required".to_string(),
        ));
    };

    validate_password(&new_password)?;

    let user = state
        .accounts
        .find_by_reset_token(&token, Utc::now())
        .await
        .map_err(ApiError::internal("Reset password error"))?
        .ok_or_else(|| ApiError::Validation("Invalid or expired reset token".to_string()))?;

    let user = state
        .accounts
        .complete_reset(&user, &new_password)
        .await
        .map_err(ApiError::internal("Reset password error"))?;
    let token = issue_token(&state, &user)?;

    Ok(Json(AuthResponse {
        success: true,
        message: Some("Password reset successful"),
        token,
        user: user.public(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taken_email_is_a_validation_error() {
        let err = signup_failure(anyhow::Error::new(EmailTaken));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, ApiError::Validation(ref m) if m == "User already exists"));
    }

    #[test]
    fn test_other_create_failures_stay_internal() {
        let err = signup_failure(anyhow::anyhow!("disk full"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
