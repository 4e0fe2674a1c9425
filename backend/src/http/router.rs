//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Mobile and web clients call from arbitrary origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/upload", post(handlers::upload_timetable))
        .route(
            "/timetable/{user_id}",
            get(handlers::list_timetables).delete(handlers::purge_timetables),
        )
        .route("/group/{user_id}/{group}", get(handlers::timetables_by_group))
        .route("/{user_id}/{id}", get(handlers::get_timetable));

    Router::new()
        .route("/", get(handlers::landing))
        .route("/health", get(handlers::health_check))
        .route("/_ah/warmup", get(handlers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
