use axum::Router;
use axum_server::Handle;
use std::{net::SocketAddr, time::Duration};

/// Serve `app` over HTTP until Ctrl-C, then drain in-flight requests.
pub(crate) async fn serve_until_shutdown(port: u16, app: Router) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let handle = Handle::new();

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutting down");
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
}
