//! Hosting adapters around [`server::router`](crate::server::router).
//!
//! - [`listen`]: binds a TCP port and serves until Ctrl-C or SIGTERM.
//! - [`EmbeddedHandler`]: binds nothing; a host runtime (for example a
//!   serverless platform) passes each request in and gets the response back.
//!
//! `server.hosting` selects the adapter once, in [`serve`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use crate::config::{Config, HostingMode};
use crate::server::{router, AppState};
use crate::store::pool::StorePool;

/// Runs `router` with the adapter chosen by `server.hosting`.
pub async fn serve(config: &Config, router: Router) -> Result<()> {
    match config.server.hosting {
        HostingMode::Listen => listen(&config.bind_addr(), router).await,
        HostingMode::Embedded => bail!(
            "server.hosting is 'embedded': no port is bound in this mode; \
             drive requests through docdrop::hosting::EmbeddedHandler from the host runtime"
        ),
    }
}

/// Binds `addr` and serves `router` until a shutdown signal arrives.
pub async fn listen(addr: &str, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %listener.local_addr()?, "upload service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("upload service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Request handler for runtimes that own the network listener.
#[derive(Clone)]
pub struct EmbeddedHandler {
    router: Router,
}

impl EmbeddedHandler {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Builds the handler from configuration, connecting the store pool the
    /// same way the listening server does.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = Arc::new(StorePool::from_config(&config.store)?);
        // The reconnect task, if any, runs detached for the life of the host.
        let _ = pool
            .start(Duration::from_secs(config.store.retry_interval_secs))
            .await;
        Ok(Self::new(router(AppState::new(config.clone(), pool))))
    }

    /// Handles one request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.store.uri = Some("memory:".to_string());
        config
    }

    #[tokio::test]
    async fn test_embedded_handler_serves_root() {
        let handler = EmbeddedHandler::from_config(&memory_config()).await.unwrap();
        let response = handler
            .handle(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_embedded_handler_requires_store_uri() {
        let err = EmbeddedHandler::from_config(&Config::default())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("store.uri"));
    }

    #[tokio::test]
    async fn test_serve_refuses_embedded_mode() {
        let mut config = memory_config();
        config.server.hosting = HostingMode::Embedded;
        let err = serve(&config, Router::new()).await.unwrap_err();
        assert!(err.to_string().contains("embedded"));
    }
}
