//! HTTP API
//!
//! Exposes the coordinator over JSON:
//! - `GET /` health check
//! - `POST /api/v1/crawl` and `POST /api/v1/extract` for single URLs
//! - `POST /api/v1/crawl/batch` to submit a batch job
//! - `GET` / `DELETE /api/v1/crawl/batch/:job_id` to poll or cancel it

mod error;
mod handlers;
mod routes;
pub mod schemas;

pub use error::{ApiError, ApiJson, ApiResult};
pub use routes::create_routes;

use crate::config::ServerConfig;
use crate::crawler::Coordinator;
use crate::CrawlError;
use std::future::Future;
use tokio::net::TcpListener;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

/// Serves the API until `shutdown` resolves
///
/// Unfinished jobs are cancelled once shutdown begins; requests already in
/// flight are allowed to complete.
pub async fn serve<F>(
    config: &ServerConfig,
    coordinator: Coordinator,
    shutdown: F,
) -> Result<(), CrawlError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_routes(AppState::new(coordinator.clone()), config.allow_any_origin);

    let listener = TcpListener::bind(config.bind_address.as_str()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutting down, cancelling unfinished jobs");
            coordinator.cancel_all();
        })
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Received shutdown signal");
}
