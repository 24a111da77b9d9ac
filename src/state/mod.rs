//! Application state shared across handlers

use axum::extract::FromRef;
use std::sync::Arc;

use crate::auth::{AuthEngines, TokenService};
use crate::db::Database;
use crate::users::UserStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engines: AuthEngines,
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserStore>,
    /// `None` when running on in-memory stores
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        engines: AuthEngines,
        tokens: Arc<TokenService>,
        users: Arc<dyn UserStore>,
        database: Option<Database>,
    ) -> Self {
        Self {
            engines,
            tokens,
            users,
            database,
        }
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AuthEngines {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.engines.clone()
    }
}
