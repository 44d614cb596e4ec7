use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, bookings, events, health, users};
use crate::layers::{create_cors_layer, set_security_headers};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:event_id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/:event_id/bookings",
            post(bookings::create_booking),
        )
        .route(
            "/events/:event_id/bookings/:booking_id",
            get(bookings::get_booking).delete(bookings::cancel_booking),
        )
        .route("/users/me", get(users::me))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::map_response(set_security_headers))
        .layer(create_cors_layer())
        .with_state(state)
}
