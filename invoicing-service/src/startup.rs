//! Application startup and lifecycle management.

use axum::Router;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::InvoicingConfig;
use crate::services::{
    init_metrics, Database, EmailProvider, InvoicingStore, SmtpEmailProvider,
};
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect to PostgreSQL, run migrations and bind the HTTP listener.
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let email = SmtpEmailProvider::new(config.smtp.clone()).map_err(|e| {
            tracing::error!(error = %e, "Failed to configure SMTP transport");
            AppError::from(e)
        })?;

        Self::build_with_store(config, Arc::new(db), Arc::new(email)).await
    }

    /// Bind the HTTP listener over an already constructed store and mail transport.
    pub async fn build_with_store(
        config: InvoicingConfig,
        store: Arc<dyn InvoicingStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let port = config.common.port;
        let state = AppState::new(config, store, email)?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Invoicing service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = self.router();

        tracing::info!(
            service = %self.state.config.service_name,
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
