use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use shopfront_core::health::healthz;
use shopfront_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    challenge::issue_challenge,
    health::readyz,
    session::{check_session, clear_session, verify_code},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Challenge issuance
        .route("/mfa/challenge", post(issue_challenge))
        // Verification
        .route("/mfa/verify", post(verify_code))
        .route("/mfa/session", get(check_session).delete(clear_session))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
