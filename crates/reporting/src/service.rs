//! Report service: fetches ads and the daily trend concurrently, then runs
//! the assembly pipeline. Every call builds fresh state; nothing is cached.

use crate::assembler::{build_report, Report, ReportInputs};
use crate::ranking::Kpi;
use adlens_core::config::ReportConfig;
use adlens_core::types::{ReportDefinition, ReportFilters};
use adlens_core::{InsightsSource, ReportResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub struct ReportService {
    source: Arc<dyn InsightsSource>,
    config: ReportConfig,
}

impl ReportService {
    pub fn new(source: Arc<dyn InsightsSource>, config: ReportConfig) -> Self {
        Self { source, config }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// KPI for a run: explicit override, then the definition's KPI, then the
    /// configured default.
    pub fn resolve_kpi(&self, definition: &ReportDefinition, kpi_override: Option<&str>) -> Kpi {
        let requested = kpi_override
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or_else(|| Some(definition.kpi.trim()).filter(|k| !k.is_empty()))
            .unwrap_or(self.config.default_kpi.as_str());
        Kpi::resolve(requested)
    }

    /// Status filter for a run: the request's, or the configured default.
    pub fn effective_filters(&self, mut filters: ReportFilters) -> ReportFilters {
        if filters.statuses.is_empty() {
            filters.statuses = self.config.default_status_filter.clone();
        }
        filters
    }

    /// Generate the report for a definition. Either fetch failing fails the
    /// whole report; there is no partial result.
    pub async fn generate(
        &self,
        definition: &ReportDefinition,
        filters: ReportFilters,
        kpi_override: Option<&str>,
    ) -> ReportResult<Report> {
        let start = Instant::now();
        let account = definition.account()?;
        let kpi = self.resolve_kpi(definition, kpi_override);
        let filters = self.effective_filters(filters);

        let fetched = tokio::try_join!(
            self.source.fetch_ad_records(&account, &filters),
            self.source.fetch_account_trend(&account, &filters),
        );

        let (ads, daily) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                error!(
                    report_id = %definition.id,
                    account_id = %account.account_id,
                    source = self.source.name(),
                    error = %e,
                    "Report fetch failed"
                );
                metrics::counter!("reports.failed").increment(1);
                return Err(e);
            }
        };

        let report = build_report(ReportInputs {
            client: &definition.client_name,
            kpi: &kpi,
            filters: &filters,
            ads: &ads,
            daily: &daily,
            unknown_label: &self.config.unknown_label,
        });

        let elapsed_ms = start.elapsed().as_millis() as u64;
        metrics::counter!("reports.generated").increment(1);
        metrics::histogram!("reports.latency_ms").record(elapsed_ms as f64);
        if report.is_empty() {
            metrics::counter!("reports.empty").increment(1);
        }

        info!(
            report_id = %definition.id,
            account_id = %account.account_id,
            kpi = %kpi.label,
            ads = ads.len(),
            days = daily.len(),
            elapsed_ms,
            "Report generated"
        );

        Ok(report)
    }
}
