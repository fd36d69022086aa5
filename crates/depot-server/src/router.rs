use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Depot endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_size);

    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/owners/:owner/packages",
            get(handler::list_packages).post(handler::create_package),
        )
        .route("/owners/:owner/packages/:reference", get(handler::get_package))
        .route(
            "/owners/:owner/packages/:reference/versions",
            get(handler::list_versions).post(handler::create_version),
        )
        .route(
            "/owners/:owner/packages/:reference/versions/:version",
            get(handler::get_version),
        )
        .route(
            "/owners/:owner/packages/:reference/versions/:version/file",
            get(handler::download_version),
        )
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
