use anyhow::{Context, Result};
use axum::Router;
use std::{future::IntoFuture, net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serve `app` until `shutdown` resolves, then give in-flight requests at most
/// `grace` to finish before the listener and remaining connections are dropped.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    grace: Duration,
) -> Result<()>
where
    F: std::future::Future<Output = ()>,
{
    let draining = CancellationToken::new();
    let drain_signal = draining.clone();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { drain_signal.cancelled().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => return res.context("HTTP server failed"),
        _ = shutdown => {}
    }

    tracing::info!("Received shutdown signal, draining in-flight requests");
    draining.cancel();

    match tokio::time::timeout(grace, &mut server).await {
        Ok(res) => {
            res.context("HTTP server failed during shutdown")?;
            tracing::info!("Server gracefully stopped");
        }
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs_f64(),
                "Shutdown grace period elapsed, forcing close"
            );
        }
    }

    Ok(())
}

/// Bind `0.0.0.0:port` and serve until SIGINT or SIGTERM.
pub async fn run(port: u16, app: Router, grace: Duration) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not listen on {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    serve_until(listener, app, shutdown_signal(), grace).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
