use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use gada_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    email::{request_verification, verify_email},
    health::{healthz, readyz},
    password::{perform_reset, request_reset},
    token::{login, logout, refresh},
    user::{approve_user, get_me, register},
};
use crate::state::AppState;

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Registration
        .route("/auth/register", post(register))
        // Token
        .route("/auth/token", post(login).patch(refresh).delete(logout))
        // Email verification
        .route("/auth/email/verification", post(request_verification))
        .route("/auth/email/verify", post(verify_email))
        // Password reset
        .route("/auth/password/reset-request", post(request_reset))
        .route("/auth/password/reset", post(perform_reset))
        // Users
        .route("/users/me", get(get_me))
        .route("/admin/users/{id}/approve", post(approve_user))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::SERVICE_UNAVAILABLE,
                    request_timeout,
                )),
        )
        .with_state(state)
}
