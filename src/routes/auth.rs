//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/:method/challenge", post(auth::request_challenge))
        .route("/auth/:method/login", post(auth::login))
        .route("/auth/:method/attach", post(auth::attach))
        .route("/auth/:method/unattach", post(auth::unattach))
}
