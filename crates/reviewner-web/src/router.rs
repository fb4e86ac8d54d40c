//! Axum router — maps URL paths to handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::{AppState, SharedState};

/// GET / — the entity visualization
async fn page(State(state): State<SharedState>) -> Html<String> {
    Html(state.page.clone())
}

/// GET /api/doc — the annotated document
async fn api_doc(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.doc.clone())
}

async fn health() -> &'static str {
    "ok"
}

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/", get(page))
        .route("/api/doc", get(api_doc))
        .route("/health", get(health))
        // Any other path shows the page too
        .fallback(page)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
