use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::logging::{LoggableUuid, SecurityEvent};
use crate::models::user::User;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// HS256 signing material plus the lifetime of issued tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: ChronoDuration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: ChronoDuration::try_hours(ttl_hours).unwrap_or(ChronoDuration::MAX),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::TokenEncoding("token expiry is out of range".to_string()))?;
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .map_err(|err| AppError::TokenEncoding(err.to_string()))
}

pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Finds the request's token: a bearer header wins over the session cookie.
fn request_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(|raw| raw.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::InvalidAuthHeader)?;
        return Ok(Some(token));
    }

    let cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value);

    Ok(cookie)
}

async fn resolve_user(parts: &Parts) -> Result<Option<User>, AppError> {
    let state = parts
        .extensions
        .get::<AppState>()
        .ok_or_else(|| AppError::Internal("application state is not installed".to_string()))?;

    let Some(token) = request_token(&parts.headers)? else {
        return Ok(None);
    };

    let claims = state.tokens.decode(token)?;
    let user = state.store.user_by_id(claims.sub).await?;
    if user.is_none() {
        crate::log_security_event!(
            SecurityEvent::SessionRejected,
            user_id = %LoggableUuid(claims.sub),
            "Token refers to a user that no longer exists"
        );
        return Err(AppError::InvalidToken);
    }
    Ok(user)
}

/// The signed-in user; rejects the request with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_user(parts)
            .await?
            .map(AuthenticatedUser)
            .ok_or(AppError::Unauthenticated)
    }
}

/// The signed-in user if any. Bad credentials make the request anonymous
/// instead of failing it, which is what page views want.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match resolve_user(parts).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(err @ (AppError::InvalidToken | AppError::InvalidAuthHeader)) => {
                crate::log_security_event!(
                    SecurityEvent::SessionRejected,
                    error = %err,
                    "Ignoring invalid credentials on page request"
                );
                Ok(CurrentUser(None))
            }
            Err(err) => Err(err),
        }
    }
}
