//! Ad performance reporting. Per-ad insights are rolled up into a
//! campaign → ad set → ad hierarchy and ranked by the report KPI.

pub mod aggregator;
pub mod assembler;
pub mod money;
pub mod normalizer;
pub mod ranking;
pub mod service;
pub mod trend;

pub use aggregator::{AdReport, AdSetReport, CampaignReport, FinalizedMetrics};
pub use assembler::{build_report, Report, ReportInputs};
pub use money::Money;
pub use normalizer::{NormalizedAd, NormalizedMetrics};
pub use ranking::{Kpi, RankingStrategy};
pub use service::ReportService;
pub use trend::TrendPoint;
