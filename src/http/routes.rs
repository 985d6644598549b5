use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Create the HTTP router with all routes
///
/// When `static_dir` is given, unmatched paths are served from it.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session surfaces
        .route("/session", get(handlers::get_session))
        .route("/session/stats", get(handlers::get_stats))
        // Controls
        .route("/session/display", post(handlers::acquire_display))
        .route("/session/record", post(handlers::begin_recording))
        .route("/session/stop", post(handlers::stop_recording))
        // Artifacts
        .route("/downloads/:filename", get(handlers::download));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
