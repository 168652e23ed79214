//! Settlement Service - Partner debt settlement over outstanding invoices.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use config::Config;
use error::AppError;
use services::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        services::init_metrics();

        let state = AppState {
            db,
            config: config.clone(),
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            .route(
                "/partners/:partner_id/settlements",
                post(handlers::settlements::settle_partner_debt),
            )
            .route(
                "/partners/:partner_id/invoices/outstanding",
                get(handlers::settlements::list_outstanding_invoices),
            )
            .route(
                "/settlements/:settlement_id",
                get(handlers::settlements::get_settlement),
            )
            .layer(from_fn(middleware::track_requests))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        actor_id = tracing::field::Empty,
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random free port, used by the integration tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router)
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Server error: {}", e)))?;
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
