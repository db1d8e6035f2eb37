//! Server lifecycle: bind, serve until ctrl-c.

use crate::api::{router, ApiContext};
use crate::config::ServerConfig;
use crate::error::Pdf2QuizError;
use tokio::net::TcpListener;
use tracing::info;

/// Run the proxy on `config.bind` until ctrl-c.
pub async fn serve(config: &ServerConfig) -> Result<(), Pdf2QuizError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| Pdf2QuizError::InvalidConfig(format!("Cannot bind {}: {}", config.bind, e)))?;
    serve_on(listener, ApiContext::from_config(config), shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    ctx: ApiContext,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Pdf2QuizError> {
    let addr = listener
        .local_addr()
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to get server address: {e}")))?;
    info!("Extraction proxy listening on http://{}", addr);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Pdf2QuizError::Internal(format!("Server error: {e}")))?;

    info!("Extraction proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}
