//! Router configuration for the file service.

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{delete_file, get_file, no_action, post_file, AppState};
use super::middleware::security_headers;

/// Create the main router.
///
/// `/` and `/*name` share one method router; the handlers resolve the raw
/// request path themselves so percent-decoding and traversal checks happen
/// in one place.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let file_methods = get(get_file)
        .post(post_file)
        .delete(delete_file)
        .fallback(no_action);

    Router::new()
        .route("/", file_methods.clone())
        .route("/*name", file_methods)
        // Upload size is enforced while streaming, not by the extractor limit
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}
