use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{self, accounts, bookings};
use crate::middleware::auth::auth_middleware;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/accounts", post(accounts::register))
        .route("/sessions", post(accounts::login));

    // Account routes (requires auth; driver-only operations are checked by the service)
    let account_routes = Router::new()
        .route("/me", get(accounts::me))
        .route("/me/availability", patch(accounts::update_availability))
        .route("/me/location", patch(accounts::update_location))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Booking routes (requires auth)
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking).get(bookings::list_bookings))
        .route("/{id}/accept", patch(bookings::accept_booking))
        .route("/{id}/status", patch(bookings::update_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes)
        .nest("/api/accounts", account_routes)
        .nest("/api/bookings", booking_routes)
        .with_state(state)
}
