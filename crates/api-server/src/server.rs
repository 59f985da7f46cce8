//! API server: HTTP REST surface plus the Prometheus exporter.

use crate::registry::ReportRegistry;
use crate::rest::{self, AppState};
use adlens_core::config::AppConfig;
use adlens_reporting::ReportService;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the REST router with its middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Report definitions and runs
        .route(
            "/api/reports",
            get(rest::list_reports).post(rest::create_report),
        )
        .route(
            "/api/reports/:id",
            get(rest::get_report).delete(rest::delete_report),
        )
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    registry: Arc<ReportRegistry>,
    service: Arc<ReportService>,
}

impl ApiServer {
    pub fn new(config: AppConfig, service: Arc<ReportService>) -> Self {
        let registry = Arc::new(ReportRegistry::new(config.report.default_kpi.clone()));
        Self {
            config,
            registry,
            service,
        }
    }

    pub fn registry(&self) -> Arc<ReportRegistry> {
        self.registry.clone()
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(AppState {
            registry: self.registry.clone(),
            service: self.service.clone(),
            start_time: Instant::now(),
        });

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Install the Prometheus recorder and its scrape listener.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
