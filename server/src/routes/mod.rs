use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, security_headers, Config};
use crate::handlers::{attendance, events, health_check, profiles, ratings};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/event-attendances",
            get(attendance::list_attendances).post(attendance::create_attendance),
        )
        .route(
            "/api/event-attendances/checked-in",
            get(attendance::get_checked_in),
        )
        .route(
            "/api/event-attendances/:id",
            get(attendance::get_attendance)
                .put(attendance::update_attendance)
                .delete(attendance::delete_attendance),
        )
        .route(
            "/api/ratings",
            get(ratings::list_ratings).post(ratings::create_rating),
        )
        .route(
            "/api/ratings/:id",
            get(ratings::get_rating).delete(ratings::delete_rating),
        )
        .route("/api/profiles", get(profiles::find_profile))
        .route(
            "/api/profiles/:id",
            get(profiles::get_profile).put(profiles::update_profile),
        )
        .with_state(state);

    security_headers(config.production)
        .into_iter()
        .fold(router, |router, layer| router.layer(layer))
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(&config.allowed_origins))
}
