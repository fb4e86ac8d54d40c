//! Runs the visualizer until Ctrl-C.

use std::future::Future;

use reviewner_config::ServerConfig;
use reviewner_ner::AnnotatedDoc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{build_router, render_entities, AppState, RenderOptions, Result, WebError};

/// Render `doc` and serve it on `config.host:config.port`. Blocks until Ctrl-C.
pub async fn serve(doc: AnnotatedDoc, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| WebError::Bind { addr: addr.clone(), source })?;

    serve_on(listener, doc, &RenderOptions::from(config), shutdown_signal()).await?;
    info!("Shutting down server on port {}", config.port);
    Ok(())
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(
    listener: TcpListener,
    doc: AnnotatedDoc,
    options: &RenderOptions,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let page = render_entities(&doc, options)?;
    let app = build_router(AppState::new(doc, page));

    let local = listener.local_addr().map_err(WebError::Serve)?;
    info!("Using the 'ent' visualizer");
    info!("Serving on http://{} ...", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(WebError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let doc = AnnotatedDoc::new("Lovely stay in Lisbon", Vec::new());
        let server = tokio::spawn(async move {
            serve_on(listener, doc, &RenderOptions::default(), async {
                let _ = stop_rx.await;
            })
            .await
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("ok"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: taken.local_addr().unwrap().port(),
            ..Default::default()
        };
        let err = serve(AnnotatedDoc::new("x", Vec::new()), &config).await.unwrap_err();
        assert!(matches!(err, WebError::Bind { .. }));
    }
}
