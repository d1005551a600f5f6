use axum::{Extension, Router, extract::DefaultBodyLimit, middleware};

use crate::security::{headers::set_security_headers, json::MAX_BODY_SIZE_BYTES};
use crate::state::AppState;

pub mod auth;
pub mod notebooks;
pub mod pages;

pub fn create_router(state: AppState) -> Router {
    tracing::debug!("Creating application router");
    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(notebooks::router())
        .layer(middleware::from_fn(set_security_headers))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(Extension(state))
}
