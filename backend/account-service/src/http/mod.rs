/// HTTP API for account management
///
/// Public routes:
/// - `GET /health`
/// - `POST /auth/register`, `POST /auth/login`
///
/// Routes under `/users` require `Authorization: Bearer <token>`; the
/// middleware resolves it into an `AuthContext` request extension.
mod handlers;

pub use handlers::{AuthResponse, LoginRequest, RegisterRequest};

use crate::security::authenticate_bearer;
use crate::services::AccountService;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use crypto_core::TokenAuthority;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Shared HTTP server state
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub authority: Arc<TokenAuthority>,
    pub request_timeout: Duration,
}

/// Build the HTTP router with all account endpoints
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint (no auth required)
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Authentication middleware - validates the bearer token
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match authenticate_bearer(&state.authority, header) {
        Ok(auth) => {
            request.extensions_mut().insert(auth);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
