//! Shared application state for the web server.

use std::sync::Arc;

use reviewner_ner::AnnotatedDoc;

/// Shared state injected into every Axum handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub doc: AnnotatedDoc,
    /// Pre-rendered visualization page.
    pub page: String,
}

impl AppState {
    pub fn new(doc: AnnotatedDoc, page: String) -> Self {
        Self { doc, page }
    }
}

pub type SharedState = Arc<AppState>;
