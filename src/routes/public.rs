use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Liveness probe for load balancers and uptime checks.
        .route("/", get(handlers::health))
        .nest("/api/auth", auth_routes())
}

/// Account endpoints, mounted under `/api/auth`.
fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/register
        // Creates an account and returns it with a token.
        .route("/register", post(handlers::register))
        // POST /api/auth/login
        // Exchanges credentials for a token.
        .route("/login", post(handlers::login))
}
