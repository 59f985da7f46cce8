//! AdLens: ad performance reporting service.
//!
//! Loads configuration, picks the insights source and serves the REST API.

use adlens_api::{ApiServer, NewReportDefinition};
use adlens_core::config::AppConfig;
use adlens_core::InsightsSource;
use adlens_integrations::{MetaGraphClient, StaticSource};
use adlens_reporting::ReportService;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "adlens")]
#[command(about = "Ad performance reporting: campaign hierarchy rollups and KPI ranking")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "ADLENS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "ADLENS__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Graph API version, e.g. v19.0 (overrides config)
    #[arg(long, env = "ADLENS__META__API_VERSION")]
    graph_version: Option<String>,

    /// Serve built-in demo data instead of calling the ads platform
    #[arg(long, env = "ADLENS__SEED_DEMO", default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adlens=info,adlens_api=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("AdLens starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(version) = cli.graph_version {
        config.meta.api_version = version;
    }

    info!(
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        graph_version = %config.meta.api_version,
        seed_demo = cli.seed_demo,
        "Configuration loaded"
    );

    let source: Arc<dyn InsightsSource> = if cli.seed_demo {
        Arc::new(StaticSource::demo())
    } else {
        if config.meta.usable_token().is_none() {
            warn!("No server-wide ads platform token configured; reports need a per-report token");
        }
        Arc::new(MetaGraphClient::new(config.meta.clone())?)
    };

    let service = Arc::new(ReportService::new(source, config.report.clone()));
    let api_server = ApiServer::new(config.clone(), service);

    if cli.seed_demo {
        let demo = api_server.registry().create(NewReportDefinition {
            client_name: "Demo Client".to_string(),
            ad_account_id: "act_1000000001".to_string(),
            kpi: None,
            access_token: None,
        })?;
        info!(report_id = %demo.id, "Seeded demo report definition");
    }

    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("AdLens is ready to serve traffic");

    api_server.start_http().await?;

    Ok(())
}
