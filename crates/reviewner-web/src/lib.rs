//! reviewner-web — serves one annotated document as an entity visualization.
//!   - `/`          highlighted text
//!   - `/api/doc`   the document as JSON
//!   - `/health`    liveness

pub mod render;
pub mod router;
pub mod server;
pub mod state;

pub use render::{render_entities, RenderOptions};
pub use router::build_router;
pub use server::{serve, serve_on};
pub use state::{AppState, SharedState};

pub type Result<T> = std::result::Result<T, WebError>;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
