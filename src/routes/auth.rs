use std::{num::NonZeroU32, time::Duration};

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Extension, Json, Router,
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::logging::{LoggableUuid, SanitizedEmail, SanitizedUsername, SecurityEvent};
use crate::models::user::{
    NewUser, User, ensure_valid_email, ensure_valid_password, ensure_valid_username,
};
use crate::security::auth::{CurrentUser, expired_session_cookie, session_cookie};
use crate::security::json::ValidatedJson;
use crate::security::rate_limit::{RateLimiterState, enforce_rate_limit};
use crate::state::AppState;

const REGISTER_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(10).unwrap();

pub fn router() -> Router {
    Router::new()
        .route(
            "/auth/register",
            post(register).layer(middleware::from_fn_with_state(
                RateLimiterState::new(REGISTER_BURST, Duration::from_secs(5 * 60)),
                enforce_rate_limit,
            )),
        )
        .route(
            "/auth/login",
            post(login).layer(middleware::from_fn_with_state(
                RateLimiterState::new(LOGIN_BURST, Duration::from_secs(60)),
                enforce_rate_limit,
            )),
        )
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

impl RegisterRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        self.username = self.username.trim().to_string();
        ensure_valid_username(&self.username)?;

        self.email = self.email.trim().to_lowercase();
        ensure_valid_email(&self.email)?;

        ensure_valid_password(&self.password)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    email: String,
    password: String,
}

impl LoginRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        self.email = self.email.trim().to_lowercase();
        ensure_valid_email(&self.email)?;

        if self.password.trim().is_empty() {
            return Err(AppError::Validation("password must not be empty".to_string()));
        }
        if self.password.chars().count() > 256 {
            return Err(AppError::Validation(
                "password must not exceed 256 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

/// Token in the body for API clients, and as a cookie for page views.
fn session_response(
    state: &AppState,
    status: StatusCode,
    user: User,
) -> Result<Response, AppError> {
    let token = state.tokens.issue(user.id)?;
    let cookie = session_cookie(&token, state.tokens.ttl_seconds())?;

    let mut response = (status, Json(AuthResponse { token, user })).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

#[tracing::instrument(name = "register_user", skip_all, fields(username, email, user_id))]
pub async fn register(
    Extension(state): Extension<AppState>,
    ValidatedJson(mut payload): ValidatedJson<RegisterRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let RegisterRequest {
        username,
        email,
        password,
    } = payload;

    let span = tracing::Span::current();
    span.record("username", tracing::field::display(SanitizedUsername::new(&username)));
    span.record("email", tracing::field::display(SanitizedEmail::new(&email)));
    tracing::debug!("Processing registration request");

    let password_hash = tokio::task::spawn_blocking(move || -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    })
    .await
    .map_err(|err| AppError::Internal(err.to_string()))??;

    let mut new_user = NewUser {
        username: username.clone(),
        email: email.clone(),
        password_hash,
    };
    new_user.validate()?;

    let user = state.store.create_user(new_user).await.inspect_err(|err| {
        crate::log_security_event!(
            SecurityEvent::RegistrationFailure,
            username = %SanitizedUsername::new(&username),
            email = %SanitizedEmail::new(&email),
            error = %err,
            "User registration failed"
        );
    })?;

    span.record("user_id", tracing::field::display(LoggableUuid(user.id)));
    crate::log_security_event!(
        SecurityEvent::RegistrationSuccess,
        user_id = %LoggableUuid(user.id),
        username = %SanitizedUsername::new(&user.username),
        "User registered successfully"
    );

    session_response(&state, StatusCode::CREATED, user)
}

#[tracing::instrument(name = "login_user", skip_all, fields(email, user_id))]
pub async fn login(
    Extension(state): Extension<AppState>,
    ValidatedJson(mut payload): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let LoginRequest { email, password } = payload;
    let span = tracing::Span::current();
    span.record("email", tracing::field::display(SanitizedEmail::new(&email)));
    tracing::debug!("Processing login request");

    let Some(user) = state.store.user_by_email(&email).await? else {
        crate::log_security_event!(
            SecurityEvent::LoginFailure,
            email = %SanitizedEmail::new(&email),
            reason = "user_not_found",
            "Login failed: user not found"
        );
        return Err(AppError::InvalidCredentials);
    };
    span.record("user_id", tracing::field::display(LoggableUuid(user.id)));

    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || {
        PasswordHash::new(&stored_hash)
            .map(|hash| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &hash)
                    .is_ok()
            })
            .map_err(|_| "invalid_password_hash")
    })
    .await
    .map_err(|err| AppError::Internal(err.to_string()))?;

    match verified {
        Ok(true) => {}
        outcome => {
            let reason = match outcome {
                Err(reason) => reason,
                _ => "incorrect_password",
            };
            crate::log_security_event!(
                SecurityEvent::LoginFailure,
                user_id = %LoggableUuid(user.id),
                email = %SanitizedEmail::new(&email),
                reason,
                "Login failed"
            );
            return Err(AppError::InvalidCredentials);
        }
    }

    crate::log_security_event!(
        SecurityEvent::LoginSuccess,
        user_id = %LoggableUuid(user.id),
        "User logged in successfully"
    );

    session_response(&state, StatusCode::OK, user)
}

#[tracing::instrument(name = "logout_user", skip_all)]
pub async fn logout(CurrentUser(current): CurrentUser) -> impl IntoResponse {
    if let Some(user) = current {
        crate::log_security_event!(
            SecurityEvent::Logout,
            user_id = %LoggableUuid(user.id),
            "User logged out"
        );
    }

    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, expired_session_cookie())],
    )
}
