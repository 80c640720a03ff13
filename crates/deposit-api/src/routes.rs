//! # Routes
//!
//! Axum router for the store mirror. Every data route lives under
//! `/api`, the same surface the browser client consumes.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET    /api/health - Health check (also the fallback probe target)
/// - GET    /api/dorms - List dorm catalog
/// - GET    /api/dorms/{id} - Get dorm by id
/// - POST   /api/users/register - Create account
/// - POST   /api/users/login - Mint a bearer session
/// - GET    /api/requests - List caller's requests (bearer required)
/// - POST   /api/requests - Create request (bearer optional)
/// - DELETE /api/requests - Debug wipe
/// - DELETE /api/requests/{id} - Delete owned request
/// - POST   /api/requests/{id}/payment - Attach payment id
/// - GET    /api/payments - List caller's payments (bearer required)
/// - POST   /api/payments - Create payment record (bearer optional)
/// - DELETE /api/payments - Debug wipe
/// - POST   /api/payments/{id}/status - Status transition (refund)
pub fn create_router(state: AppState) -> Router {
    // Single-origin prototype; the browser client may be served from
    // anywhere, so CORS stays wide open
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/dorms", get(handlers::list_dorms))
        .route("/dorms/{dorm_id}", get(handlers::get_dorm))
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route(
            "/requests",
            get(handlers::list_requests)
                .post(handlers::create_request)
                .delete(handlers::clear_requests),
        )
        .route("/requests/{request_id}", delete(handlers::delete_request))
        .route(
            "/requests/{request_id}/payment",
            post(handlers::attach_payment),
        )
        .route(
            "/payments",
            get(handlers::list_payments)
                .post(handlers::create_payment)
                .delete(handlers::clear_payments),
        )
        .route(
            "/payments/{payment_id}/status",
            post(handlers::set_payment_status),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
}
