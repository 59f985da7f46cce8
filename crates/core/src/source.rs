//! Upstream insights source: the boundary between the report pipeline and
//! the ads platform.
//!
//! The pipeline holds an `Arc<dyn InsightsSource>`; the Graph API client and
//! the in-memory fixture source both live in `adlens-integrations`.

use crate::error::ReportResult;
use crate::types::{AccountRef, RawAdRecord, RawDailyRecord, ReportFilters};
use async_trait::async_trait;

#[async_trait]
pub trait InsightsSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Every ad of the account with its insight block for the filtered period.
    async fn fetch_ad_records(
        &self,
        account: &AccountRef,
        filters: &ReportFilters,
    ) -> ReportResult<Vec<RawAdRecord>>;

    /// Account-level insights at daily granularity for the filtered period.
    async fn fetch_account_trend(
        &self,
        account: &AccountRef,
        filters: &ReportFilters,
    ) -> ReportResult<Vec<RawDailyRecord>>;
}
