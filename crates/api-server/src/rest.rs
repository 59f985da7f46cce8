//! REST API handlers for report definitions, report runs and operational
//! endpoints.

use crate::registry::{NewReportDefinition, ReportRegistry};
use adlens_core::types::{ReportDefinition, ReportFilters};
use adlens_core::{ReportError, ReportResult};
use adlens_reporting::{Report, ReportService};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ReportRegistry>,
    pub service: Arc<ReportService>,
    pub start_time: Instant,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler error: a `ReportError` rendered as status plus `ErrorResponse`.
#[derive(Debug)]
pub struct ApiError(ReportError);

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ReportError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ReportError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ReportError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ReportError::NotFound(_) => StatusCode::NOT_FOUND,
            ReportError::Validation(_) => StatusCode::BAD_REQUEST,
            ReportError::Config(_) | ReportError::Serialization(_) | ReportError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
            "Internal processing error".to_string()
        } else {
            if self.0.is_upstream() {
                warn!(error = %self.0, "Upstream failure surfaced to client");
            }
            self.0.to_string()
        };

        metrics::counter!("api.errors", "code" => self.0.code()).increment(1);
        (
            status,
            Json(ErrorResponse {
                error: self.0.code().to_string(),
                message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Query string of `GET /api/reports/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub since: Option<String>,
    pub until: Option<String>,
    pub date_preset: Option<String>,
    /// Comma-separated effective statuses.
    pub status: Option<String>,
    pub kpi: Option<String>,
}

impl ReportQuery {
    pub fn filters(&self) -> ReportResult<ReportFilters> {
        let statuses = self
            .status
            .as_deref()
            .map(|s| s.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        ReportFilters::from_parts(
            parse_date("since", self.since.as_deref())?,
            parse_date("until", self.until.as_deref())?,
            self.date_preset.as_deref(),
            statuses,
        )
    }
}

fn parse_date(field: &str, raw: Option<&str>) -> ReportResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
            ReportError::Validation(format!("'{field}' must be a date in YYYY-MM-DD format"))
        }),
    }
}

/// Unparseable ids cannot name a stored report.
fn parse_id(raw: &str) -> ReportResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ReportError::NotFound(format!("report {raw} not found")))
}

/// POST /api/reports: Create a report definition.
pub async fn create_report(
    State(state): State<AppState>,
    payload: Result<Json<NewReportDefinition>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReportDefinition>)> {
    let Json(request) = payload.map_err(|e| ReportError::Validation(e.body_text()))?;
    let definition = state.registry.create(request).map_err(|e| {
        warn!(error = %e, "Report definition rejected");
        e
    })?;

    metrics::counter!("api.report_definitions.created").increment(1);
    info!(
        report_id = %definition.id,
        account_id = %definition.ad_account_id,
        kpi = %definition.kpi,
        "Report definition created"
    );
    Ok((StatusCode::CREATED, Json(definition)))
}

/// GET /api/reports: List report definitions, newest first.
pub async fn list_reports(State(state): State<AppState>) -> Json<Vec<ReportDefinition>> {
    Json(state.registry.list())
}

/// GET /api/reports/:id: Run the report for a definition.
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Report>> {
    let definition = state.registry.get(&parse_id(&id)?)?;
    let filters = query.filters()?;
    let report = state
        .service
        .generate(&definition, filters, query.kpi.as_deref())
        .await?;
    Ok(Json(report))
}

/// DELETE /api/reports/:id
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.registry.delete(&id)?;
    info!(report_id = %id, "Report definition deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        source: state.service.source_name().to_string(),
        report_definitions: state.registry.len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness check.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live: Liveness check.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub source: String,
    pub report_definitions: usize,
    pub uptime_secs: u64,
}
