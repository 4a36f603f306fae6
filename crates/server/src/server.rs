//! HTTP listener and graceful shutdown.

use std::io;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A bound HTTP listener.
pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Bind to the given address.
    ///
    /// Port 0 picks a free port; use [`HttpServer::local_addr`] to find it.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is in use or cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, io::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.listener.local_addr()
    }

    /// Serve requests until `shutdown` is cancelled.
    ///
    /// In-flight requests are allowed to finish once shutdown starts.
    pub async fn serve(self, router: Router, shutdown: CancellationToken) -> Result<(), io::Error> {
        let addr = self.listener.local_addr()?;
        tracing::info!("Listening on http://{}", addr);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Cancel `token` on SIGINT or SIGTERM.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
        _ = token.cancelled() => return,
    }

    token.cancel();
}
