use std::sync::Arc;

use crate::config::Config;
use crate::security::auth::TokenKeys;
use crate::store::NotebookStore;

/// Shared handles every request can reach through `Extension<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotebookStore>,
    pub tokens: TokenKeys,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn NotebookStore>) -> Self {
        Self {
            tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl_hours),
            store,
            config: Arc::new(config),
        }
    }
}
