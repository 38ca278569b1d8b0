use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recommendations
        .route(
            "/users/:user_id/recommendations",
            get(handlers::get_recommendations),
        )
        .route(
            "/users/:user_id/recommendations/refresh",
            post(handlers::refresh_recommendations),
        )
        // Profile
        .route("/users/:user_id/profile", get(handlers::get_profile))
        .route("/users/:user_id/favorites", post(handlers::add_favorite))
        .route(
            "/users/:user_id/favorites/:media_kind/:id",
            delete(handlers::remove_favorite),
        )
        .route("/users/:user_id/history", post(handlers::record_watch))
        // Catalog
        .route("/trending", get(handlers::trending))
        .route("/genres/:media_kind", get(handlers::genres))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
}
