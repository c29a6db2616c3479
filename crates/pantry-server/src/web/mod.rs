pub mod api;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new().nest("/api", api::build_api_routes(state.clone()));

    // Uploaded media is served read-only from the media root
    let media_prefix = state.config.media.url_prefix.trim_end_matches('/');
    if media_prefix.starts_with('/') {
        router = router.nest_service(media_prefix, ServeDir::new(state.media.root()));
    } else {
        tracing::warn!(
            "media.url_prefix '{}' is not an absolute path, media will not be served",
            state.config.media.url_prefix
        );
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}
